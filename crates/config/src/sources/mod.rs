//! Built-in property sources

mod args;
mod env;
mod lookup;
mod map;

pub use args::ArgsSource;
pub use env::EnvSource;
pub use lookup::LookupSource;
pub use map::{MapChange, MapSource};
