//! TR-011: Execution engine.
//!
//! Selects commands from a resolved devfile, builds validated command models
//! and dispatches their side effects to a caller-supplied [`Handler`].

pub mod command;
pub mod component;
pub mod manifest;
pub mod select;

pub use command::CommandModel;
pub use component::ComponentModel;
pub use manifest::{manifest_with_variables, substitute_variables};
pub use select::{get_command, has_command, select_default_command};

use crate::core::error::{EngineError, HandlerError};
use crate::core::types::{Command, CommandGroupKind, CommandKind, Component, Devfile, EventKind};
use rustc_hash::FxHashSet;

/// Performs the side effects requested by the engine.
///
/// Must be safe to call from several threads at once: parallel composites
/// invoke it concurrently.
pub trait Handler: Sync {
    fn apply_image(&self, component: &Component) -> Result<(), HandlerError>;
    fn apply_kubernetes(&self, component: &Component) -> Result<(), HandlerError>;
    fn execute(&self, command: &Command) -> Result<(), HandlerError>;
}

/// Build and run one command.
pub fn execute_command(
    devfile: &Devfile,
    command: &Command,
    handler: &dyn Handler,
) -> Result<(), EngineError> {
    CommandModel::new(devfile, command)?.execute(handler)
}

/// Run the default command of `kind`.
pub fn execute_command_by_kind(
    devfile: &Devfile,
    kind: CommandGroupKind,
    handler: &dyn Handler,
) -> Result<(), EngineError> {
    execute_command_by_name_and_kind(devfile, "", kind, handler, false)
}

/// Run the command `name` of `kind`, or the default one when `name` is empty.
/// With `ignore_not_found`, a missing command (or missing default) is a no-op.
pub fn execute_command_by_name_and_kind(
    devfile: &Devfile,
    name: &str,
    kind: CommandGroupKind,
    handler: &dyn Handler,
    ignore_not_found: bool,
) -> Result<(), EngineError> {
    let command = match get_command(devfile, name, kind) {
        Ok(command) => command,
        Err(EngineError::NoCommandFound { .. } | EngineError::NoDefaultCommandFound { .. })
            if ignore_not_found =>
        {
            tracing::debug!(%kind, name, "ignoring command not found");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    execute_command(devfile, command, handler)
}

/// Run the default deploy command. Fails when there is none.
pub fn deploy(devfile: &Devfile, handler: &dyn Handler) -> Result<(), EngineError> {
    execute_command_by_name_and_kind(devfile, "", CommandGroupKind::Deploy, handler, false)
}

/// Run the build command `name`, or the default build command. Without a name
/// a devfile with no build command is not an error.
pub fn build(devfile: &Devfile, name: &str, handler: &dyn Handler) -> Result<(), EngineError> {
    execute_command_by_name_and_kind(devfile, name, CommandGroupKind::Build, handler, name.is_empty())
}

pub fn has_events(devfile: &Devfile, event: EventKind) -> bool {
    devfile
        .events
        .as_ref()
        .is_some_and(|e| !e.get(event).is_empty())
}

/// Run the commands bound to `event` in order, stopping at the first failure.
pub fn execute_events(
    devfile: &Devfile,
    event: EventKind,
    handler: &dyn Handler,
) -> Result<(), EngineError> {
    let Some(events) = &devfile.events else {
        return Ok(());
    };
    for id in events.get(event) {
        let command = devfile
            .command(id)
            .ok_or_else(|| EngineError::EventCommandNotFound {
                event: event.to_string(),
                id: id.clone(),
            })?;
        tracing::info!(%event, command = %id, "running event command");
        execute_command(devfile, command, handler).map_err(|err| EngineError::Command {
            id: id.clone(),
            source: Box::new(err),
        })?;
    }
    Ok(())
}

/// Names of the container components `command` would run in, following
/// composites, deduplicated in first-use order.
pub fn container_components_for_command(
    devfile: &Devfile,
    command: &Command,
) -> Result<Vec<String>, EngineError> {
    let mut out = Vec::new();
    let mut visited = FxHashSet::default();
    collect_containers(devfile, command, &mut visited, &mut out)?;
    Ok(out)
}

fn collect_containers(
    devfile: &Devfile,
    command: &Command,
    visited: &mut FxHashSet<String>,
    out: &mut Vec<String>,
) -> Result<(), EngineError> {
    if !visited.insert(command.key()) {
        return Ok(());
    }
    let component = match &command.kind {
        CommandKind::Exec(exec) => exec.component.as_deref(),
        CommandKind::Apply(apply) => apply.component.as_deref(),
        CommandKind::Composite(composite) => {
            for sub in &composite.commands {
                let next = devfile
                    .command(sub)
                    .ok_or_else(|| EngineError::MissingSubCommand {
                        composite: command.id.clone(),
                        missing: sub.clone(),
                    })?;
                collect_containers(devfile, next, visited, out)?;
            }
            None
        }
    };
    if let Some(name) = component {
        let is_container = devfile
            .component(name)
            .is_some_and(|c| c.as_container().is_some());
        if is_container && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    Ok(())
}
