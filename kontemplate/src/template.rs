//! Template engine setup and the helpers available to every template.
//!
//! Templates are rendered with [Handlebars](https://handlebarsjs.com/) in
//! strict mode, so referencing a variable that is not bound is an error
//! rather than silently producing an empty string.

use std::fs;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::process::Command;

use handlebars::{
    no_escape, Context as HbContext, Handlebars, Helper, HelperDef, RenderContext, RenderError,
    ScopedJson,
};
use log::info;
use serde_json::Value as JsonValue;

use crate::value::bindings_to_json;
use crate::{Context, Error, ResourceSet};

/// Builds a template registry for rendering the templates of the given
/// resource set.
pub fn registry(ctx: &Context, rs: &ResourceSet) -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    // Output is YAML or JSON, not HTML.
    hb.register_escape_fn(no_escape);
    hb.register_helper("json", Box::new(ToJson));
    hb.register_helper("passLookup", Box::new(PassLookup));
    hb.register_helper("lookupIPAddr", Box::new(LookupIpAddr));
    hb.register_helper(
        "insertFile",
        Box::new(InsertFile {
            base: rs.path.clone(),
        }),
    );
    hb.register_helper(
        "default",
        Box::new(DefaultValue {
            values: bindings_to_json(&rs.values),
        }),
    );
    hb.register_helper(
        "gitHEAD",
        Box::new(GitHead {
            base_dir: ctx.base_dir().to_path_buf(),
        }),
    );
    hb
}

fn str_param<'a>(h: &'a Helper, idx: usize, helper: &str) -> Result<&'a str, RenderError> {
    h.param(idx)
        .and_then(|p| p.value().as_str())
        .ok_or_else(|| {
            RenderError::new(format!(
                "{} expects a string as parameter {}",
                helper,
                idx + 1
            ))
        })
}

fn helper_error(e: Error) -> RenderError {
    RenderError::new(e.to_string())
}

/// Serializes a value as JSON.
///
/// ```handlebars
/// {{ json someList }}
/// ```
struct ToJson;

impl HelperDef for ToJson {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc HbContext,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let value = h
            .param(0)
            .map(|p| p.value().clone())
            .ok_or_else(|| RenderError::new("json expects a value to serialize"))?;
        let serialized = serde_json::to_string(&value)
            .map_err(|e| RenderError::new(format!("failed to serialize value: {}", e)))?;
        Ok(ScopedJson::Derived(JsonValue::String(serialized)))
    }
}

/// Looks up a secret in `pass`, the standard UNIX password manager.
///
/// ```handlebars
/// {{ passLookup "my/secret/key" }}
/// ```
struct PassLookup;

impl HelperDef for PassLookup {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc HbContext,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let key = str_param(h, 0, "passLookup")?;
        let secret = pass_lookup(key).map_err(helper_error)?;
        Ok(ScopedJson::Derived(JsonValue::String(secret)))
    }
}

pub fn pass_lookup(key: &str) -> Result<String, Error> {
    info!("Attempting to look up {} in pass", key);
    let output = Command::new("pass")
        .args(["show", key])
        .output()
        .map_err(|e| Error::PassLookup(key.to_string(), e.to_string()))?;
    if !output.status.success() {
        return Err(Error::PassLookup(
            key.to_string(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Resolves a host name to the list of its IP addresses.
///
/// ```handlebars
/// {{#each (lookupIPAddr "example.com")}}- {{this}}
/// {{/each}}
/// ```
struct LookupIpAddr;

impl HelperDef for LookupIpAddr {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc HbContext,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let host = str_param(h, 0, "lookupIPAddr")?;
        let ips = lookup_ip_addr(host).map_err(helper_error)?;
        Ok(ScopedJson::Derived(JsonValue::Array(
            ips.into_iter().map(JsonValue::String).collect(),
        )))
    }
}

pub fn lookup_ip_addr(host: &str) -> Result<Vec<String>, Error> {
    info!("Attempting to look up IP for {} in DNS", host);
    let addrs = (host, 0)
        .to_socket_addrs()
        .map_err(|e| Error::DnsLookup(host.to_string(), e))?;
    let mut ips = Vec::new();
    for addr in addrs {
        let ip = addr.ip().to_string();
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    Ok(ips)
}

/// Inserts the raw content of a file located relative to the resource set's
/// path.
///
/// ```handlebars
/// {{ insertFile "nginx.conf" }}
/// ```
struct InsertFile {
    base: PathBuf,
}

impl HelperDef for InsertFile {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc HbContext,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let file = str_param(h, 0, "insertFile")?;
        let content = insert_file(&self.base, file).map_err(helper_error)?;
        Ok(ScopedJson::Derived(JsonValue::String(content)))
    }
}

pub fn insert_file(base: &Path, file: &str) -> Result<String, Error> {
    let path = base.join(file);
    fs::read_to_string(&path)
        .map_err(|e| Error::Io(format!("while trying to insert {}", path.display()), e))
}

/// Produces the value of a variable if it is bound, or the given fallback
/// otherwise.
///
/// ```handlebars
/// {{ default "info" "logLevel" }}
/// ```
struct DefaultValue {
    values: JsonValue,
}

impl HelperDef for DefaultValue {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc HbContext,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let fallback = h
            .param(0)
            .map(|p| p.value().clone())
            .ok_or_else(|| RenderError::new("default expects a fallback value"))?;
        let name = str_param(h, 1, "default")?;
        let value = self.values.get(name).cloned().unwrap_or(fallback);
        Ok(ScopedJson::Derived(value))
    }
}

/// Produces the commit hash of the Git `HEAD` of the repository containing
/// the context file.
///
/// ```handlebars
/// {{ gitHEAD }}
/// ```
struct GitHead {
    base_dir: PathBuf,
}

impl HelperDef for GitHead {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        _: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc HbContext,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let hash = git_head(&self.base_dir).map_err(helper_error)?;
        Ok(ScopedJson::Derived(JsonValue::String(hash)))
    }
}

pub fn git_head(base_dir: &Path) -> Result<String, Error> {
    info!("Looking up git HEAD in {}", base_dir.display());
    let output = Command::new("git")
        .arg("-C")
        .arg(base_dir)
        .args(["rev-parse", "HEAD"])
        .output()
        .map_err(|e| Error::GitHead(base_dir.to_path_buf(), e.to_string()))?;
    if !output.status.success() {
        return Err(Error::GitHead(
            base_dir.to_path_buf(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
