//! Run configuration.

use std::path::{Path, PathBuf};

use eyre::Result;

use crate::kubectl::{self, Mode};
use crate::render::render_resource_sets;
use crate::{Bindings, Context, RenderedResourceSet};

/// Configuration for a single kontemplate run. Constructed once, usually from
/// command line arguments, and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    includes: Vec<String>,
    excludes: Vec<String>,
    variables: Vec<String>,
    stdin_vars: Bindings,
    kubectl: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
            variables: Vec::new(),
            stdin_vars: Bindings::new(),
            kubectl: PathBuf::from("kubectl"),
        }
    }
}

impl Config {
    /// Resource sets to include explicitly.
    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }

    /// Resource sets to exclude explicitly.
    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    /// Explicit variables, as `key=value` strings.
    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = variables.into_iter().map(Into::into).collect();
        self
    }

    /// Variables read from standard input.
    pub fn with_stdin_vars(mut self, stdin_vars: Bindings) -> Self {
        self.stdin_vars = stdin_vars;
        self
    }

    /// Path to the kubectl binary.
    pub fn with_kubectl<P: AsRef<Path>>(mut self, kubectl: P) -> Self {
        self.kubectl = kubectl.as_ref().to_path_buf();
        self
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn kubectl(&self) -> &Path {
        &self.kubectl
    }

    /// Loads the given context file, binding this configuration's explicit
    /// and standard input variables.
    pub fn load_context<P: AsRef<Path>>(&self, path: P) -> Result<Context> {
        Context::load_with_stdin_vars(path, &self.variables, self.stdin_vars.clone())
    }

    /// Loads the given context file and renders the resource sets selected by
    /// this configuration.
    pub fn load_and_render<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(Context, Vec<RenderedResourceSet>)> {
        let ctx = self.load_context(path)?;
        let rendered = render_resource_sets(&ctx, &self.includes, &self.excludes)?;
        Ok((ctx, rendered))
    }

    /// Passes the rendered resource sets to kubectl.
    pub fn run_kubectl(
        &self,
        ctx: &Context,
        mode: Mode,
        resource_sets: &[RenderedResourceSet],
    ) -> Result<()> {
        kubectl::run(&self.kubectl, ctx, mode, resource_sets)
    }
}
