//! Rendering of resource sets.

use std::fs;
use std::path::Path;

use eyre::Result;
use handlebars::Handlebars;
use log::{debug, info, warn};

use crate::data::DEFAULT_FILENAMES;
use crate::filter::apply_limits;
use crate::template::registry;
use crate::value::bindings_to_json;
use crate::{Context, Error, ResourceSet, NAME_SEPARATOR};

/// Extensions of the files in a resource set directory that are rendered.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// A single rendered template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResource {
    /// File name of the template, without its directory.
    pub filename: String,
    pub rendered: String,
}

/// All of the rendered templates of a resource set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResourceSet {
    pub name: String,
    pub resources: Vec<RenderedResource>,
    /// Extra kubectl arguments declared for this resource set.
    pub args: Vec<String>,
}

impl RenderedResourceSet {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The name of the file the given resource is written to when rendering
    /// into a directory. Nested resource set names are flattened, so
    /// `collection/nested` becomes `collection-nested-<filename>`.
    pub fn output_filename(&self, resource: &RenderedResource) -> String {
        format!(
            "{}-{}",
            self.name.replace(NAME_SEPARATOR, "-"),
            resource.filename
        )
    }
}

/// Renders every resource set of the context that survives the given
/// include/exclude limits.
///
/// Fails if no resource set survives, or if any template fails to render.
pub fn render_resource_sets<S: AsRef<str>>(
    ctx: &Context,
    include: &[S],
    exclude: &[S],
) -> Result<Vec<RenderedResourceSet>> {
    let limited = apply_limits(&ctx.resource_sets, include, exclude);
    if limited.is_empty() {
        return Err(Error::NoResourceSetsIncluded.into());
    }
    limited
        .iter()
        .map(|rs| render_resource_set(ctx, rs))
        .collect()
}

/// Renders all of the templates of a single resource set.
///
/// A resource set whose path does not exist, or that contains no templates,
/// renders to nothing and produces a warning.
pub fn render_resource_set(ctx: &Context, rs: &ResourceSet) -> Result<RenderedResourceSet> {
    info!("Loading resources for {}", rs.name);
    let hb = registry(ctx, rs);

    let resources = if rs.path.is_file() {
        vec![render_file(&hb, rs, &rs.path)?]
    } else {
        template_files(&rs.path)
            .iter()
            .map(|path| render_file(&hb, rs, path))
            .collect::<Result<Vec<_>>>()?
    };

    if resources.is_empty() {
        warn!(
            "Resource set '{}' does not exist or contains no valid templates",
            rs.name
        );
    }
    Ok(RenderedResourceSet {
        name: rs.name.clone(),
        resources,
        args: rs.args.clone(),
    })
}

// Lists the template files in the given directory, ordered by file name. A
// directory that cannot be read is treated as empty.
fn template_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read resource set directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let mut files = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_resource_file(path))
        .collect::<Vec<_>>();
    files.sort();
    files
}

/// Whether the given file is a template (i.e. is YAML or JSON) rather than a
/// default values file.
pub fn is_resource_file(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(f) => f,
        None => return false,
    };
    if DEFAULT_FILENAMES.contains(&filename) {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn render_file(hb: &Handlebars, rs: &ResourceSet, path: &Path) -> Result<RenderedResource> {
    let template =
        fs::read_to_string(path).map_err(|e| Error::TemplateLoad(path.to_path_buf(), e))?;
    let rendered = hb
        .render_template(&template, &bindings_to_json(&rs.values))
        .map_err(|e| Error::TemplateRender(path.to_path_buf(), e))?;
    debug!("Rendered {}", path.display());
    Ok(RenderedResource {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        rendered,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn testdata(file: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("testdata")
            .join(file)
    }

    const NONE: &[&str] = &[];

    #[test]
    fn resource_file_detection() {
        assert!(is_resource_file(Path::new("/cfg/api/deployment.yaml")));
        assert!(is_resource_file(Path::new("/cfg/api/service.yml")));
        assert!(is_resource_file(Path::new("/cfg/api/configmap.json")));
        assert!(!is_resource_file(Path::new("/cfg/api/default.yaml")));
        assert!(!is_resource_file(Path::new("/cfg/api/default.json")));
        assert!(!is_resource_file(Path::new("/cfg/api/README.md")));
        assert!(!is_resource_file(Path::new("/cfg/api/yaml")));
    }

    #[test]
    fn output_filenames_flatten_nested_names() {
        let resource = RenderedResource {
            filename: "deployment.yaml".to_string(),
            rendered: String::new(),
        };
        let nested = RenderedResourceSet {
            name: "collection/nested".to_string(),
            resources: vec![resource.clone()],
            args: Vec::new(),
        };
        let top_level = RenderedResourceSet {
            name: "some-api".to_string(),
            ..nested.clone()
        };

        assert_eq!(
            nested.output_filename(&resource),
            "collection-nested-deployment.yaml"
        );
        assert_eq!(
            top_level.output_filename(&resource),
            "some-api-deployment.yaml"
        );
    }

    #[test]
    fn render_context_resource_sets() {
        let ctx = Context::load(testdata("render-test.yaml"), &["replicas=3".to_string()]).unwrap();

        let rendered = render_resource_sets(&ctx, NONE, NONE).unwrap();
        let names = rendered.iter().map(|rs| rs.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["api", "single", "missing", "services/empty"]);

        // Directory resource sets render every template, in file name order,
        // and skip default values and non-template files.
        let api = &rendered[0];
        let filenames = api
            .resources
            .iter()
            .map(|r| r.filename.as_str())
            .collect::<Vec<_>>();
        assert_eq!(filenames, vec!["deployment.yaml", "service.yaml"]);
        assert_eq!(
            api.resources[0].rendered,
            "kind: Deployment\nname: api\nreplicas: 3\nport: 8080\n"
        );
        assert_eq!(api.resources[1].rendered, "kind: Service\nport: 8080\ntimeout: 30\n");
        assert_eq!(api.args, vec!["--prune"]);

        // Single-file resource sets render just that file.
        let single = &rendered[1];
        assert_eq!(single.resources.len(), 1);
        assert_eq!(single.resources[0].filename, "namespace.yaml");
        assert_eq!(single.resources[0].rendered, "kind: Namespace\nname: lizards\n");

        // Missing and empty resource sets are not an error.
        assert!(rendered[2].is_empty());
        assert!(rendered[3].is_empty());
    }

    #[test]
    fn render_with_limits() {
        let ctx = Context::load(testdata("render-test.yaml"), &["replicas=3".to_string()]).unwrap();

        let rendered = render_resource_sets(&ctx, &["services"], NONE).unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].name, "services/empty");

        let err = render_resource_sets(&ctx, &["nothing-matches"], NONE).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoResourceSetsIncluded)
        ));
    }

    #[test]
    fn missing_variable_fails_the_render() {
        let ctx = Context::load(testdata("render-test.yaml"), &[]).unwrap();

        let err = render_resource_sets(&ctx, &["api"], NONE).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::TemplateRender(path, _)) => assert!(path.ends_with("deployment.yaml")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
