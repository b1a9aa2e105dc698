//! File-backed provider and format parsers

use crate::core::{ConfigError, ConfigResult, ConfigResultExt, PropertySource, PropertySourceProvider};
use crate::sources::MapSource;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Turns file contents into flat key/value pairs
pub trait FormatParser: Send + Sync {
    /// Parse `text`; `origin` names the file in errors
    fn parse(&self, text: &str, origin: &str) -> ConfigResult<BTreeMap<String, String>>;
}

/// Parser for `key=value` lines
///
/// Blank lines and lines starting with `#` or `!` are ignored. Keys and
/// values are trimmed; `:` is accepted as a separator too.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueParser;

impl FormatParser for KeyValueParser {
    fn parse(&self, text: &str, origin: &str) -> ConfigResult<BTreeMap<String, String>> {
        let mut pairs = BTreeMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some(split) = line.find(['=', ':']) else {
                return Err(ConfigError::parse(
                    origin,
                    format!("line {}: expected 'key=value'", index + 1),
                ));
            };
            let key = line[..split].trim();
            if key.is_empty() {
                return Err(ConfigError::parse(origin, format!("line {}: empty key", index + 1)));
            }
            pairs.insert(key.to_string(), line[split + 1..].trim().to_string());
        }
        Ok(pairs)
    }
}

/// Parser for TOML documents, flattened to dotted keys
///
/// `[db] url = "x"` becomes `db.url = x`; array elements are indexed as
/// `list.0`, `list.1`.
#[cfg(feature = "toml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlParser;

#[cfg(feature = "toml")]
impl FormatParser for TomlParser {
    fn parse(&self, text: &str, origin: &str) -> ConfigResult<BTreeMap<String, String>> {
        let table: toml::Table =
            toml::from_str(text).map_err(|e| ConfigError::parse(origin, e.to_string()))?;
        let mut pairs = BTreeMap::new();
        for (key, value) in &table {
            flatten_toml(key.clone(), value, &mut pairs);
        }
        Ok(pairs)
    }
}

#[cfg(feature = "toml")]
fn flatten_toml(prefix: String, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        toml::Value::Table(table) => {
            for (key, nested) in table {
                flatten_toml(format!("{prefix}.{key}"), nested, out);
            }
        }
        toml::Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_toml(format!("{prefix}.{index}"), item, out);
            }
        }
        other => {
            out.insert(prefix, other.to_string());
        }
    }
}

/// One source per file in a directory whose name matches a pattern
///
/// Files are read and parsed on every [`property_sources`] call, so the
/// provider picks up edits on reload. Each source is named after its path.
/// A file that cannot be read or parsed is logged and skipped.
///
/// [`property_sources`]: PropertySourceProvider::property_sources
#[derive(Clone)]
pub struct FileProvider {
    name: String,
    dir: PathBuf,
    pattern: Regex,
    parser: Arc<dyn FormatParser>,
    ordinal: Option<i32>,
}

impl FileProvider {
    /// Watch `dir` for files whose name matches `pattern`
    pub fn new(
        dir: impl Into<PathBuf>,
        pattern: &str,
        parser: impl FormatParser + 'static,
    ) -> ConfigResult<Self> {
        let dir = dir.into();
        let pattern = Regex::new(pattern)
            .map_err(|e| ConfigError::parse(format!("file pattern '{pattern}'"), e.to_string()))?;
        Ok(Self {
            name: format!("files:{}", dir.display()),
            dir,
            pattern,
            parser: Arc::new(parser),
            ordinal: None,
        })
    }

    /// Provide exactly one file
    pub fn file(path: impl AsRef<Path>, parser: impl FormatParser + 'static) -> ConfigResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ConfigError::parse(path.display().to_string(), "not a file path"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::new(dir, &format!("^{}$", regex::escape(file_name)), parser)
    }

    /// Give every produced source this explicit ordinal
    #[must_use = "builder methods must be chained or built"]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Directory being scanned
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths of the files currently matching, sorted
    pub fn matching_files(&self) -> ConfigResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| ConfigError::io(&self.dir, &e))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.pattern.is_match(name))
            })
            .map(|entry| entry.path())
            .collect();
        files.sort();
        Ok(files)
    }

    fn load_file(&self, path: &Path) -> ConfigResult<MapSource> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, &e))?;
        let origin = path.display().to_string();
        let pairs = self.parser.parse(&text, &origin)?;
        let source = MapSource::from_pairs(origin, pairs);
        Ok(match self.ordinal {
            Some(ordinal) => source.with_ordinal(ordinal),
            None => source,
        })
    }
}

impl PropertySourceProvider for FileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn property_sources(&self) -> ConfigResult<Vec<Arc<dyn PropertySource>>> {
        let files = self.matching_files()?;
        Ok(files
            .iter()
            .filter_map(|path| {
                self.load_file(path)
                    .skip_logged("load_file", &path.display().to_string())
            })
            .map(|source| Arc::new(source) as Arc<dyn PropertySource>)
            .collect())
    }
}

impl std::fmt::Debug for FileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProvider")
            .field("dir", &self.dir)
            .field("pattern", &self.pattern.as_str())
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}
