use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use kontemplate::{Bindings, Config, Error, Mode, RenderedResourceSet};

#[derive(Parser, Debug)]
#[clap(name = "kontemplate", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Resource sets to include explicitly.
    #[clap(short, long = "include", global = true, multiple_occurrences = true)]
    include: Vec<String>,

    /// Resource sets to exclude explicitly.
    #[clap(short, long = "exclude", global = true, multiple_occurrences = true)]
    exclude: Vec<String>,

    /// Provide variables as key=value pairs. These take precedence over all
    /// other variable sources.
    #[clap(long = "var", global = true, multiple_occurrences = true)]
    variables: Vec<String>,

    /// Path to the kubectl binary.
    #[clap(long, global = true, default_value = "kubectl")]
    kubectl: PathBuf,

    /// Read additional variables as a YAML or JSON document from standard
    /// input.
    #[clap(long, global = true)]
    stdin_vars: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Template resource sets and print them, or write them to a directory.
    Template {
        file: PathBuf,

        /// Write rendered files to this directory instead of printing them.
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Template resources and pass them to 'kubectl apply'.
    Apply {
        file: PathBuf,

        /// Print remote operations without executing them.
        #[clap(long)]
        dry_run: bool,
    },
    /// Template resources and pass them to 'kubectl replace'.
    Replace { file: PathBuf },
    /// Template resources and pass them to 'kubectl delete'.
    Delete { file: PathBuf },
    /// Template resources and pass them to 'kubectl create'.
    Create { file: PathBuf },
    /// Show kontemplate version.
    Version,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    }) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(args) {
        log::error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = config(&args)?;
    match args.command {
        Command::Template { file, output } => template(&config, &file, output.as_deref()),
        Command::Apply { file, dry_run } => kubectl(&config, &file, Mode::Apply { dry_run }),
        Command::Replace { file } => kubectl(&config, &file, Mode::Replace),
        Command::Delete { file } => kubectl(&config, &file, Mode::Delete),
        Command::Create { file } => kubectl(&config, &file, Mode::Create),
        Command::Version => {
            version();
            Ok(())
        }
    }
}

fn config(args: &Args) -> Result<Config> {
    let stdin_vars = if args.stdin_vars && !matches!(args.command, Command::Version) {
        read_stdin_vars()?
    } else {
        Bindings::new()
    };
    Ok(Config::default()
        .with_includes(args.include.iter().cloned())
        .with_excludes(args.exclude.iter().cloned())
        .with_variables(args.variables.iter().cloned())
        .with_stdin_vars(stdin_vars)
        .with_kubectl(&args.kubectl))
}

fn read_stdin_vars() -> Result<Bindings> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| Error::Io("while reading variables from standard input".to_string(), e))?;
    if input.trim().is_empty() {
        return Ok(Bindings::new());
    }
    serde_yaml::from_str(&input)
        .map_err(Error::from)
        .wrap_err("failed to parse variables from standard input")
}

fn version() {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("KONTEMPLATE_GIT_HASH") {
        Some(hash) => println!("Kontemplate version {} (git commit: {})", version, hash),
        None => println!("Kontemplate version {} (git commit unknown)", version),
    }
}

fn template(config: &Config, file: &Path, output: Option<&Path>) -> Result<()> {
    let (_, resource_sets) = config.load_and_render(file)?;

    for rs in resource_sets.iter().filter(|rs| !rs.is_empty()) {
        match output {
            Some(dir) => template_into_directory(dir, rs)?,
            None => {
                for r in &rs.resources {
                    log::info!("Rendered file {}/{}:", rs.name, r.filename);
                    println!("{}", r.rendered);
                }
            }
        }
    }
    Ok(())
}

fn template_into_directory(dir: &Path, rs: &RenderedResourceSet) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::Io(
            format!("while creating output directory {}", dir.display()),
            e,
        )
    })?;

    for r in &rs.resources {
        let path = dir.join(rs.output_filename(r));
        log::info!("Writing file {}", path.display());
        fs::write(&path, &r.rendered)
            .map_err(|e| Error::Io(format!("while writing {}", path.display()), e))?;
    }
    Ok(())
}

fn kubectl(config: &Config, file: &Path, mode: Mode) -> Result<()> {
    let (ctx, resource_sets) = config.load_and_render(file)?;
    config.run_kubectl(&ctx, mode, &resource_sets)
}
