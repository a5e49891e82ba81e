//! TR-014: CLI subcommands.

use crate::core::configurables::{parse_env_vars, DevfileObj, PARAMETERS};
use crate::core::error::EngineError;
use crate::core::parser::{self, YamlSchema};
use crate::core::resolver::{ResolveOptions, Resolver};
use crate::core::source::FsSource;
use crate::core::types::{CommandGroupKind, Devfile, EventKind};
use crate::engine::{self, Handler};
use crate::handlers::{DryRunHandler, LocalHandler};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the parent chain and validate the result
    Validate {
        /// Path to the devfile
        #[arg(short, long, default_value = "devfile.yaml")]
        file: PathBuf,
    },

    /// Print (or write) the fully resolved devfile
    Flatten {
        #[arg(short, long, default_value = "devfile.yaml")]
        file: PathBuf,

        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,

        /// Maximum parent chain length
        #[arg(long, default_value_t = crate::core::resolver::DEFAULT_MAX_PARENT_DEPTH)]
        max_depth: usize,
    },

    /// Run a command by group kind (build, run, test, debug, deploy)
    Run {
        /// Group kind
        kind: String,

        #[arg(short, long, default_value = "devfile.yaml")]
        file: PathBuf,

        /// Command id (default command of the group when omitted)
        #[arg(short, long)]
        command: Option<String>,

        /// Record requests without running anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the commands bound to a lifecycle event
    Events {
        /// preStart, postStart, preStop or postStop
        phase: String,

        #[arg(short, long, default_value = "devfile.yaml")]
        file: PathBuf,

        #[arg(long)]
        dry_run: bool,
    },

    /// Print a kubernetes/openshift component's manifest with variables substituted
    Manifest {
        /// Component name
        component: String,

        #[arg(short, long, default_value = "devfile.yaml")]
        file: PathBuf,
    },

    /// Read or change configurable parameters in place
    Config {
        #[command(subcommand)]
        action: ConfigAction,

        #[arg(short, long, default_value = "devfile.yaml", global = true)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Set a parameter (Memory, Name, Ports)
    Set { param: String, value: String },

    /// Clear a parameter
    Unset { param: String },

    /// List parameters and their current values
    List,

    /// Add KEY=VALUE environment variables to every container
    SetEnv { vars: Vec<String> },

    /// Remove environment variables from every container
    UnsetEnv { keys: Vec<String> },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Flatten {
            file,
            output,
            json,
            max_depth,
        } => cmd_flatten(&file, output.as_deref(), json, max_depth),
        Commands::Run {
            kind,
            file,
            command,
            dry_run,
        } => cmd_run(&file, &kind, command.as_deref().unwrap_or(""), dry_run),
        Commands::Events {
            phase,
            file,
            dry_run,
        } => cmd_events(&file, &phase, dry_run),
        Commands::Manifest { component, file } => cmd_manifest(&file, &component),
        Commands::Config { action, file } => cmd_config(&file, action),
    }
}

/// Fetch and resolve a devfile from disk.
fn resolve_file(file: &Path, options: ResolveOptions) -> Result<Devfile, String> {
    let location = file.to_string_lossy();
    Resolver::new(&FsSource, &YamlSchema)
        .with_options(options)
        .resolve_uri(&location)
        .map_err(|e| e.to_string())
}

/// Resolve and validate, printing every validation error.
fn resolve_and_validate(file: &Path) -> Result<Devfile, String> {
    let devfile = resolve_file(file, ResolveOptions::default())?;
    let errors = parser::validate_devfile(&devfile);
    if errors.is_empty() {
        return Ok(devfile);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(format!("{} validation error(s)", errors.len()))
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let devfile = resolve_and_validate(file)?;
    println!(
        "OK: {} ({} components, {} commands)",
        devfile.metadata_name().unwrap_or("<unnamed>"),
        devfile.components.len(),
        devfile.commands.len()
    );
    Ok(())
}

fn cmd_flatten(
    file: &Path,
    output: Option<&Path>,
    json: bool,
    max_depth: usize,
) -> Result<(), String> {
    let options = ResolveOptions::default().with_max_parent_depth(max_depth);
    let devfile = resolve_file(file, options)?;
    match output {
        Some(path) => {
            parser::write_devfile(path, &devfile).map_err(|e| e.to_string())?;
            println!("Wrote {}", path.display());
        }
        None if json => {
            let text = serde_json::to_string_pretty(&devfile)
                .map_err(|e| format!("JSON serialize error: {}", e))?;
            println!("{}", text);
        }
        None => {
            let text = serde_yaml_ng::to_string(&devfile)
                .map_err(|e| format!("YAML serialize error: {}", e))?;
            print!("{}", text);
        }
    }
    Ok(())
}

/// Project directory for local execution: the devfile's directory.
fn project_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Run `f` with the dry-run or local handler. Dry runs print what was recorded.
fn with_handler(
    file: &Path,
    dry_run: bool,
    f: impl FnOnce(&dyn Handler) -> Result<(), EngineError>,
) -> Result<(), String> {
    if dry_run {
        let handler = DryRunHandler::new();
        let result = f(&handler);
        for request in handler.requests() {
            println!("  would {}", request);
        }
        result.map_err(|e| e.to_string())
    } else {
        f(&LocalHandler::new(project_dir(file))).map_err(|e| e.to_string())
    }
}

fn cmd_run(file: &Path, kind: &str, name: &str, dry_run: bool) -> Result<(), String> {
    let kind: CommandGroupKind = kind.parse()?;
    let devfile = resolve_and_validate(file)?;
    with_handler(file, dry_run, |handler| {
        engine::execute_command_by_name_and_kind(&devfile, name, kind, handler, false)
    })
}

fn cmd_events(file: &Path, phase: &str, dry_run: bool) -> Result<(), String> {
    let event: EventKind = phase.parse()?;
    let devfile = resolve_and_validate(file)?;
    if !engine::has_events(&devfile, event) {
        println!("No {} commands", event);
        return Ok(());
    }
    with_handler(file, dry_run, |handler| {
        engine::execute_events(&devfile, event, handler)
    })
}

fn cmd_manifest(file: &Path, component: &str) -> Result<(), String> {
    let devfile = resolve_and_validate(file)?;
    let content =
        engine::manifest_with_variables(&devfile, component, &FsSource, &file.to_string_lossy())
            .map_err(|e| e.to_string())?;
    print!("{}", content);
    Ok(())
}

fn cmd_config(file: &Path, action: ConfigAction) -> Result<(), String> {
    let mut obj = DevfileObj::load(file).map_err(|e| e.to_string())?;
    match action {
        ConfigAction::Set { param, value } => {
            obj.set_configuration(&param, &value)
                .map_err(|e| e.to_string())?;
            println!("Set {} = {}", param, value);
        }
        ConfigAction::Unset { param } => {
            obj.delete_configuration(&param).map_err(|e| e.to_string())?;
            println!("Unset {}", param);
        }
        ConfigAction::List => {
            for param in PARAMETERS {
                let value = (param.getter)(&obj.data).unwrap_or_default();
                println!("{:<8} {:<24} {}", param.name, value, param.description);
            }
        }
        ConfigAction::SetEnv { vars } => {
            let pairs: Vec<&str> = vars.iter().map(String::as_str).collect();
            let vars = parse_env_vars(&pairs).map_err(|e| e.to_string())?;
            obj.add_env_vars(&vars).map_err(|e| e.to_string())?;
            println!("Added {} environment variable(s)", vars.len());
        }
        ConfigAction::UnsetEnv { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            obj.remove_env_vars(&keys).map_err(|e| e.to_string())?;
            println!("Removed {} environment variable(s)", keys.len());
        }
    }
    Ok(())
}
