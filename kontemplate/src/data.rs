//! Structured data is read from YAML and JSON files on the file system.

use std::{fs, path::Path};

use eyre::{Result, WrapErr};
use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::{Bindings, Error, Value};

/// File names that hold default values for a resource set, in order of
/// preference. These files are never rendered as templates.
pub const DEFAULT_FILENAMES: &[&str] = &["default.yaml", "default.yml", "default.json"];

/// The structured data formats we know how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Detects the format of the given file from its extension.
    pub fn detect(path: &Path) -> Result<Self, Error> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yml") | Some("yaml") => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFileType(path.to_path_buf())),
        }
    }

    /// Parses the given content according to this format.
    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T, Error> {
        Ok(match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        })
    }
}

/// Load and deserialize the given YAML or JSON file into `T`.
pub fn load_file<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let fmt = Format::detect(path)?;
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("while trying to read from {}", path.display()), e))?;
    let value = fmt
        .parse(&content)
        .wrap_err_with(|| Error::LoadFromFile(path.to_path_buf()))?;
    debug!("Loaded {:?} data from {}", fmt, path.display());
    Ok(value)
}

/// Load arbitrary structured data from the given file.
pub fn load_data<P: AsRef<Path>>(path: P) -> Result<Value> {
    load_file(path)
}

/// Load a flat set of variables from the given file. The file's top level
/// must be a mapping, although a document that is just `null` yields no
/// variables.
pub fn load_bindings<P: AsRef<Path>>(path: P) -> Result<Bindings> {
    let path = path.as_ref();
    match load_data(path)? {
        Value::Object(bindings) => Ok(bindings),
        Value::Null => Ok(Bindings::new()),
        _ => Err(Error::NotAMapping(path.to_path_buf()).into()),
    }
}

/// Load the default values for the resource set located at `path`.
///
/// Candidates from [`DEFAULT_FILENAMES`] are tried in order and the first one
/// that exists and loads successfully is used. A candidate that fails to load
/// is skipped with a warning. Missing default values are normal and produce
/// an empty set of bindings.
pub fn load_default_values<P: AsRef<Path>>(path: P) -> Bindings {
    let path = path.as_ref();
    for filename in DEFAULT_FILENAMES {
        let candidate = path.join(filename);
        if !candidate.is_file() {
            continue;
        }
        debug!("Loading default values from {}", candidate.display());
        match load_bindings(&candidate) {
            Ok(bindings) => return bindings,
            Err(e) => warn!("Skipping default values in {}: {:#}", candidate.display(), e),
        }
    }
    Bindings::new()
}
