//! File system-related utilities.

use std::path::{Path, PathBuf};

use eyre::Result;

/// Canonicalize the given path if it exists. If it does not exist, returns
/// `Ok(None)`.
pub fn maybe_canonicalize<P>(path: P) -> Result<Option<PathBuf>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(path.canonicalize()?))
    } else {
        Ok(None)
    }
}

/// Computes the working path of a resource set.
///
/// Without an explicit path, the resource set's name doubles as its path.
/// Relative paths are joined onto `base`, which is either the context's base
/// directory or, for sets nested in a collection, the collection's resolved
/// path. Absolute paths are used verbatim.
pub fn resolve_path<P>(base: P, name: &str, explicit: Option<&Path>) -> PathBuf
where
    P: AsRef<Path>,
{
    let path = explicit.unwrap_or_else(|| Path::new(name));
    // `join` replaces the base entirely when `path` is absolute.
    base.as_ref().join(path)
}
