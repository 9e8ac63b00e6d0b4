//! Cluster contexts and the resolution of the variables bound to each of
//! their resource sets.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use log::debug;
use serde::Deserialize;

use crate::data::{load_bindings, load_default_values, load_file};
use crate::fs::maybe_canonicalize;
use crate::merge::{merge, merge_all};
use crate::resource_set::{flatten, ResourceSet, ResourceSetDeclaration};
use crate::{Bindings, Error, Value};

/// A context file as authored.
#[derive(Debug, Deserialize)]
struct ContextFile {
    #[serde(rename = "context")]
    name: String,
    #[serde(default)]
    global: Bindings,
    #[serde(default, rename = "import")]
    imports: Vec<PathBuf>,
    #[serde(default, rename = "include")]
    resource_sets: Vec<ResourceSetDeclaration>,
}

/// Everything needed to render the resource sets for a single cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// The name of the kubectl context.
    pub name: String,
    /// Global variables, accessible by all resource sets.
    pub global: Bindings,
    /// Files from which additional variables were imported.
    pub imports: Vec<PathBuf>,
    /// The flattened resource sets of this context, in declared order.
    pub resource_sets: Vec<ResourceSet>,
    /// Variables loaded from the imported files.
    pub imported_vars: Bindings,
    /// Variables supplied explicitly by the operator.
    pub explicit_vars: Bindings,
    base_dir: PathBuf,
}

impl Context {
    /// Load a context from the given file and resolve the variables of all of
    /// its resource sets.
    ///
    /// `explicit_vars` are `key=value` pairs supplied by the operator, which
    /// take precedence over every other source of variables.
    pub fn load<P: AsRef<Path>>(path: P, explicit_vars: &[String]) -> Result<Self> {
        Self::load_with_stdin_vars(path, explicit_vars, Bindings::new())
    }

    /// Like [`Context::load`], but with an additional set of variables (read
    /// from standard input by the CLI) that is treated as if it were the last
    /// imported file.
    pub fn load_with_stdin_vars<P: AsRef<Path>>(
        path: P,
        explicit_vars: &[String],
        stdin_vars: Bindings,
    ) -> Result<Self> {
        let explicit_vars = parse_explicit_vars(explicit_vars)?;

        let path = path.as_ref();
        let path = maybe_canonicalize(path)?.ok_or_else(|| {
            Error::Io(
                format!("while trying to read from {}", path.display()),
                std::io::ErrorKind::NotFound.into(),
            )
        })?;
        debug!("Loading context from {}", path.display());
        let file: ContextFile =
            load_file(&path).wrap_err_with(|| Error::ContextLoad(path.clone()))?;
        let base_dir = base_dir_of(&path)?;

        let resource_sets = flatten(&base_dir, &file.resource_sets)
            .wrap_err_with(|| Error::ContextLoad(path.clone()))?;

        let mut imported = Cow::Owned(Bindings::new());
        for import in &file.imports {
            let import_path = base_dir.join(import);
            let vars = load_bindings(&import_path)
                .wrap_err_with(|| Error::ContextLoad(import_path.clone()))?;
            imported = merge(imported, Cow::Owned(vars));
        }
        let imported_vars = merge(imported, Cow::Owned(stdin_vars)).into_owned();

        let mut ctx = Self {
            name: file.name,
            global: file.global,
            imports: file.imports,
            resource_sets,
            imported_vars,
            explicit_vars,
            base_dir,
        };
        ctx.resolve();
        Ok(ctx)
    }

    /// The directory containing the context file. All relative paths are
    /// resolved against it.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Replaces the values of every resource set with its final bindings.
    ///
    /// Layers are merged from lowest to highest precedence:
    ///
    /// 1. the resource set's default values file,
    /// 2. imported variables,
    /// 3. global variables,
    /// 4. the resource set's own values,
    /// 5. explicitly supplied variables.
    ///
    /// Resolving an already resolved context yields the same bindings.
    pub fn resolve(&mut self) {
        for rs in self.resource_sets.iter_mut() {
            let defaults = load_default_values(&rs.path);
            let own = std::mem::take(&mut rs.values);
            rs.values = merge_all([
                Cow::Owned(defaults),
                Cow::Borrowed(&self.imported_vars),
                Cow::Borrowed(&self.global),
                Cow::Owned(own),
                Cow::Borrowed(&self.explicit_vars),
            ])
            .into_owned();
            debug!(
                "Resolved {} variable(s) for resource set {}",
                rs.values.len(),
                rs.name
            );
        }
    }
}

fn base_dir_of(path: &Path) -> Result<PathBuf, Error> {
    path.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::ContextLoad(path.to_path_buf()))
}

/// Parses explicitly supplied variables in `key=value` form. The value is
/// always a string.
pub fn parse_explicit_vars<S: AsRef<str>>(vars: &[S]) -> Result<Bindings, Error> {
    vars.iter()
        .map(|var| {
            let var = var.as_ref();
            let mut parts = var.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Ok((key.to_string(), Value::from(value))),
                _ => Err(Error::InvalidExplicitVariable(var.to_string())),
            }
        })
        .collect()
}
