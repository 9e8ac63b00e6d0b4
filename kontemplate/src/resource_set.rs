//! Resource sets and the flattening of resource set collections.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::fs::resolve_path;
use crate::merge::merge;
use crate::{Bindings, Error};

/// Separates the name of a collection from the names of the resource sets
/// nested within it.
pub const NAME_SEPARATOR: char = '/';

/// A resource set as authored in a context file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSetDeclaration {
    /// Name of the resource set. This can be used in include/exclude
    /// statements.
    pub name: String,
    /// Path to the folder (or single file) containing the templates for this
    /// resource set. Defaults to the name of the resource set.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Values to use when rendering the templates of this resource set.
    #[serde(default)]
    pub values: Bindings,
    /// Nested resource sets. A declaration with nested resource sets is a
    /// collection and is not rendered itself.
    #[serde(default)]
    pub include: Vec<ResourceSetDeclaration>,
    /// Extra arguments passed through to kubectl for this resource set.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ResourceSetDeclaration {
    pub fn is_collection(&self) -> bool {
        !self.include.is_empty()
    }
}

/// A flattened resource set, ready to have its templates rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSet {
    /// Unique name of the resource set. Sets nested in a collection are named
    /// `collection/nested`.
    pub name: String,
    /// Resolved path on disk.
    pub path: PathBuf,
    /// Name of the collection this set was declared in, if any.
    pub parent: Option<String>,
    /// Variables bound to this set's templates. After context loading these
    /// are the fully resolved bindings.
    pub values: Bindings,
    pub args: Vec<String>,
}

impl ResourceSet {
    /// Whether or not the given include/exclude term addresses this resource
    /// set, either directly by name or through the collection it belongs to.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.strip_suffix(NAME_SEPARATOR).unwrap_or(term);
        term == self.name || self.parent.as_deref() == Some(term)
    }
}

/// Flattens the given declarations into an ordered list of resource sets.
///
/// Collections are replaced by the resource sets they include, in declared
/// order. Nested sets inherit the collection's values (which they may
/// override) and resolve their paths relative to the collection's path.
/// Collections may not contain other collections, and every flattened
/// resource set must have a unique name.
pub fn flatten<P>(base_dir: P, declarations: &[ResourceSetDeclaration]) -> Result<Vec<ResourceSet>>
where
    P: AsRef<Path>,
{
    let base_dir = base_dir.as_ref();
    let mut flattened = Vec::new();

    for decl in declarations {
        let path = resolve_path(base_dir, &decl.name, decl.path.as_deref());

        if !decl.is_collection() {
            flattened.push(ResourceSet {
                name: decl.name.clone(),
                path,
                parent: None,
                values: decl.values.clone(),
                args: decl.args.clone(),
            });
            continue;
        }

        for nested in &decl.include {
            if nested.is_collection() {
                return Err(
                    Error::NestedCollection(decl.name.clone(), nested.name.clone()).into(),
                );
            }
            let name = format!("{}{}{}", decl.name, NAME_SEPARATOR, nested.name);
            debug!("Flattening {} from collection {}", name, decl.name);
            flattened.push(ResourceSet {
                path: resolve_path(&path, &nested.name, nested.path.as_deref()),
                parent: Some(decl.name.clone()),
                values: merge(Cow::Borrowed(&decl.values), Cow::Borrowed(&nested.values))
                    .into_owned(),
                args: decl.args.iter().chain(&nested.args).cloned().collect(),
                name,
            });
        }
    }

    let mut names = BTreeSet::new();
    for rs in &flattened {
        if !names.insert(rs.name.as_str()) {
            return Err(Error::DuplicateResourceSet(rs.name.clone()).into());
        }
    }
    Ok(flattened)
}
