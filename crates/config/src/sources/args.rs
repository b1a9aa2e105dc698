//! Command-line argument source

use crate::core::{ARGS_ORDINAL, ConfigResult, Properties, PropertySource};

/// Property source parsed from command-line arguments
///
/// Recognised forms are `--key=value`, `--key value` and a bare `--flag`,
/// which maps to `"true"`. Positional arguments are ignored, and parsing
/// stops at a lone `--`.
#[derive(Debug, Clone)]
pub struct ArgsSource {
    name: String,
    ordinal: Option<i32>,
    properties: Properties,
}

impl ArgsSource {
    /// Parse the arguments of the current process, skipping the binary name
    pub fn from_env() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    /// Parse the given arguments
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut properties = Properties::new();
        let mut args = args.into_iter().map(Into::into).peekable();

        while let Some(arg) = args.next() {
            if arg == "--" {
                break;
            }
            let Some(body) = arg.strip_prefix("--") else {
                continue;
            };

            if let Some((key, value)) = body.split_once('=') {
                if !key.is_empty() {
                    properties.insert(key.to_string(), value.to_string());
                }
                continue;
            }
            if body.is_empty() {
                continue;
            }

            let value = match args.peek() {
                Some(next) if !next.starts_with("--") => args.next().unwrap_or_default(),
                _ => "true".to_string(),
            };
            properties.insert(body.to_string(), value);
        }

        Self {
            name: "args".to_string(),
            ordinal: None,
            properties,
        }
    }

    /// Set an explicit ordinal
    #[must_use = "builder methods must be chained or built"]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }
}

impl PropertySource for ArgsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn explicit_ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    fn default_ordinal(&self) -> i32 {
        ARGS_ORDINAL
    }

    fn properties(&self) -> ConfigResult<Properties> {
        Ok(self.properties.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_all_forms() {
        let source = ArgsSource::parse([
            "serve",
            "--port=8080",
            "--host",
            "example.org",
            "--verbose",
            "--name=",
            "--",
            "--ignored=1",
        ]);
        let props = source.properties().unwrap();

        assert_eq!(props.len(), 4);
        assert_eq!(props["port"], "8080");
        assert_eq!(props["host"], "example.org");
        assert_eq!(props["verbose"], "true");
        assert_eq!(props["name"], "");
        assert_eq!(source.ordinal(), ARGS_ORDINAL);
    }

    #[test]
    fn flag_followed_by_option_stays_boolean() {
        let props = ArgsSource::parse(["--debug", "--level=3"]).properties().unwrap();
        assert_eq!(props["debug"], "true");
        assert_eq!(props["level"], "3");
    }
}
