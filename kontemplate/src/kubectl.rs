//! Passing rendered resource sets to kubectl.

use std::io::Write;
use std::path::Path;
use std::process::{ChildStdin, Command, Stdio};

use eyre::Result;
use log::{debug, info};

use crate::{Context, Error, RenderedResourceSet};

/// The kubectl operation to perform on rendered resource sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Apply { dry_run: bool },
    Replace,
    Delete,
    Create,
}

impl Mode {
    /// The kubectl arguments for this mode, before any context-specific
    /// arguments.
    pub fn args(&self) -> Vec<&'static str> {
        match self {
            Self::Apply { dry_run: false } => vec!["apply", "-f", "-"],
            Self::Apply { dry_run: true } => vec!["apply", "-f", "-", "--dry-run"],
            Self::Replace => vec!["replace", "--save-config=true", "-f", "-"],
            Self::Delete => vec!["delete", "-f", "-"],
            Self::Create => vec!["create", "--save-config=true", "-f", "-"],
        }
    }
}

/// Builds the full argument list for a single kubectl invocation.
pub fn command_args(ctx: &Context, mode: Mode, rs: &RenderedResourceSet) -> Vec<String> {
    mode.args()
        .into_iter()
        .map(ToString::to_string)
        .chain(std::iter::once(format!("--context={}", ctx.name)))
        .chain(rs.args.iter().cloned())
        .collect()
}

/// Runs kubectl once per resource set, streaming the rendered resources to
/// its standard input.
///
/// Resource sets are processed strictly in order. The first kubectl
/// invocation that fails aborts the run.
pub fn run<P: AsRef<Path>>(
    kubectl: P,
    ctx: &Context,
    mode: Mode,
    resource_sets: &[RenderedResourceSet],
) -> Result<()> {
    let kubectl = kubectl.as_ref();
    let kubectl_name = kubectl.display().to_string();

    for rs in resource_sets {
        if rs.is_empty() {
            debug!("Skipping empty resource set {}", rs.name);
            continue;
        }

        let args = command_args(ctx, mode, rs);
        debug!("Running {} {}", kubectl_name, args.join(" "));
        let mut child = Command::new(kubectl)
            .args(&args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| Error::CommandSpawn(kubectl_name.clone(), e))?;

        // kubectl may exit before consuming all of its input, in which case
        // its exit status takes precedence over the failed write.
        let written = match child.stdin.take() {
            Some(stdin) => write_resources(stdin, rs),
            None => Err(Error::CommandSpawn(kubectl_name.clone(), broken_pipe())),
        };

        let status = child
            .wait()
            .map_err(|e| Error::CommandSpawn(kubectl_name.clone(), e))?;
        if !status.success() {
            return Err(Error::CommandFailed(kubectl_name, status, rs.name.clone()).into());
        }
        written?;
    }
    Ok(())
}

// Takes ownership of the pipe so that it is closed once all resources have
// been written, or as soon as a write fails.
fn write_resources(mut stdin: ChildStdin, rs: &RenderedResourceSet) -> Result<(), Error> {
    for r in &rs.resources {
        info!("Passing file {}/{} to kubectl", rs.name, r.filename);
        writeln!(stdin, "{}", r.rendered).map_err(|e| {
            Error::Io(
                format!("while writing {}/{} to kubectl", rs.name, r.filename),
                e,
            )
        })?;
    }
    Ok(())
}

fn broken_pipe() -> std::io::Error {
    std::io::ErrorKind::BrokenPipe.into()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::RenderedResource;
    use std::fs;
    use std::path::PathBuf;

    fn rendered_set(name: &str, resources: &[&str], args: &[&str]) -> RenderedResourceSet {
        RenderedResourceSet {
            name: name.to_string(),
            resources: resources
                .iter()
                .enumerate()
                .map(|(i, r)| RenderedResource {
                    filename: format!("{}.yaml", i),
                    rendered: r.to_string(),
                })
                .collect(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    fn context(dir: &Path) -> Context {
        let path = dir.join("ctx.yaml");
        fs::write(&path, "context: k8s.test.mydomain.com\n").unwrap();
        Context::load(&path, &[]).unwrap()
    }

    #[cfg(unix)]
    fn write_script(path: &Path, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        fs::write(path, script).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    // Writes a fake kubectl that records its arguments and input.
    #[cfg(unix)]
    fn fake_kubectl(dir: &Path, exit_code: i32) -> PathBuf {
        let path = dir.join("kubectl");
        let log = dir.join("calls.log");
        write_script(
            &path,
            &format!(
                "#!/bin/sh\necho \"args: $*\" >> {log}\ncat >> {log}\nexit {code}\n",
                log = log.display(),
                code = exit_code
            ),
        );
        path
    }

    #[test]
    fn mode_arguments() {
        assert_eq!(Mode::Apply { dry_run: false }.args(), vec!["apply", "-f", "-"]);
        assert_eq!(
            Mode::Apply { dry_run: true }.args(),
            vec!["apply", "-f", "-", "--dry-run"]
        );
        assert_eq!(
            Mode::Replace.args(),
            vec!["replace", "--save-config=true", "-f", "-"]
        );
        assert_eq!(Mode::Delete.args(), vec!["delete", "-f", "-"]);
        assert_eq!(
            Mode::Create.args(),
            vec!["create", "--save-config=true", "-f", "-"]
        );
    }

    #[test]
    fn context_name_and_set_args_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let rs = rendered_set("api", &["kind: Service"], &["--prune", "-l", "app=api"]);

        assert_eq!(
            command_args(&ctx, Mode::Delete, &rs),
            vec![
                "delete",
                "-f",
                "-",
                "--context=k8s.test.mydomain.com",
                "--prune",
                "-l",
                "app=api"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn resources_are_streamed_per_set() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let kubectl = fake_kubectl(dir.path(), 0);
        let sets = vec![
            rendered_set("first", &["kind: A", "kind: B"], &[]),
            rendered_set("empty", &[], &[]),
            rendered_set("second", &["kind: C"], &[]),
        ];

        run(&kubectl, &ctx, Mode::Create, &sets).unwrap();

        let log = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        let expected = "args: create --save-config=true -f - --context=k8s.test.mydomain.com\n\
                        kind: A\nkind: B\n\
                        args: create --save-config=true -f - --context=k8s.test.mydomain.com\n\
                        kind: C\n";
        assert_eq!(log, expected);
    }

    #[cfg(unix)]
    #[test]
    fn failing_kubectl_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let kubectl = fake_kubectl(dir.path(), 1);
        let sets = vec![
            rendered_set("first", &["kind: A"], &[]),
            rendered_set("second", &["kind: B"], &[]),
        ];

        let err = run(&kubectl, &ctx, Mode::Apply { dry_run: false }, &sets).unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::CommandFailed(_, _, name)) => assert_eq!(name, "first"),
            other => panic!("unexpected error: {:?}", other),
        }
        let log = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert!(!log.contains("kind: B"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_reported_when_kubectl_stops_reading() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let kubectl = dir.path().join("kubectl");
        write_script(&kubectl, "#!/bin/sh\nexit 3\n");
        let big = "x".repeat(4 * 1024 * 1024);
        let sets = vec![rendered_set("big", &[big.as_str()], &[])];

        let err = run(&kubectl, &ctx, Mode::Apply { dry_run: false }, &sets).unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::CommandFailed(_, status, name)) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(name, "big");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_kubectl_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let sets = vec![rendered_set("first", &["kind: A"], &[])];

        let err = run(
            dir.path().join("no-such-kubectl"),
            &ctx,
            Mode::Delete,
            &sets,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::CommandSpawn(_, _))
        ));
    }
}
