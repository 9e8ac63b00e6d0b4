use std::path::PathBuf;

use thiserror::Error;

/// The primary error type that can be produced by kontemplate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("context loading failed on file {0}")]
    ContextLoad(PathBuf),
    #[error("failed to load data from file {0}")]
    LoadFromFile(PathBuf),
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(PathBuf),
    #[error("expected a mapping at the top level of {0}")]
    NotAMapping(PathBuf),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid explicit variable provided ({0}), name and value should be separated with '='")]
    InvalidExplicitVariable(String),
    #[error("resource set collection \"{0}\" includes \"{1}\", which is itself a collection; collections cannot be nested")]
    NestedCollection(String, String),
    #[error("resource set \"{0}\" is declared more than once")]
    DuplicateResourceSet(String),
    #[error("no valid resource sets included")]
    NoResourceSetsIncluded,
    #[error("could not load template {0}: {1}")]
    TemplateLoad(PathBuf, std::io::Error),
    #[error("error while templating {0}: {1}")]
    TemplateRender(PathBuf, handlebars::RenderError),
    #[error("failed to run {0}: {1}")]
    CommandSpawn(String, std::io::Error),
    #[error("{0} exited with {1} while processing resource set \"{2}\"")]
    CommandFailed(String, std::process::ExitStatus, String),
    #[error("pass lookup of \"{0}\" failed: {1}")]
    PassLookup(String, String),
    #[error("failed to determine git HEAD in {0}: {1}")]
    GitHead(PathBuf, String),
    #[error("IP address lookup of \"{0}\" failed: {1}")]
    DnsLookup(String, std::io::Error),
}
