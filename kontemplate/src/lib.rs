//! Kontemplate renders Kubernetes resource templates for a cluster from a
//! declarative context file and, optionally, passes them to kubectl.
//!
//! A context declares named resource sets (directories of templates) and the
//! variables to render them with. Variables are merged from the resource
//! set's default values, imported files, the context's globals, the resource
//! set's own values and explicitly supplied values, in increasing order of
//! precedence.
//!
//! For kontemplate's command line interface, see the `kontemplate-cli` crate.

mod config;
mod context;
pub mod data;
mod error;
mod filter;
pub mod fs;
pub mod kubectl;
mod merge;
mod render;
mod resource_set;
pub mod template;
mod value;

pub use config::Config;
pub use context::{parse_explicit_vars, Context};
pub use error::Error;
pub use filter::apply_limits;
pub use kubectl::Mode;
pub use merge::{merge, merge_all};
pub use render::{
    render_resource_set, render_resource_sets, RenderedResource, RenderedResourceSet,
};
pub use resource_set::{flatten, ResourceSet, ResourceSetDeclaration, NAME_SEPARATOR};
pub use value::{bindings_to_json, Bindings, Map, Value};
