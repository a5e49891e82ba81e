//! TR-007: Command model.
//!
//! A validated view over one command plus the id index of the whole devfile.
//! Construction fails fast on a malformed command, a dangling composite
//! reference or a composite cycle; no invalid model is ever returned.
//!
//! Parallel composites run one scoped thread per sub-command. All of them run
//! to completion; failures are collected on a bounded channel and reported
//! together.

use super::component::{is_blank, ComponentModel};
use super::Handler;
use crate::core::error::EngineError;
use crate::core::types::{Command, CommandKind, CompositeCommand, Devfile};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Lowercased command id → command.
pub type CommandIndex<'a> = FxHashMap<String, &'a Command>;

pub fn build_index(devfile: &Devfile) -> CommandIndex<'_> {
    devfile.commands.iter().map(|c| (c.key(), c)).collect()
}

#[derive(Debug, Clone)]
pub struct CommandModel<'a> {
    devfile: &'a Devfile,
    command: &'a Command,
    index: Arc<CommandIndex<'a>>,
}

impl<'a> CommandModel<'a> {
    pub fn new(devfile: &'a Devfile, command: &'a Command) -> Result<Self, EngineError> {
        let model = Self {
            devfile,
            command,
            index: Arc::new(build_index(devfile)),
        };
        model.check_validity()?;
        Ok(model)
    }

    pub fn command(&self) -> &'a Command {
        self.command
    }

    pub fn id(&self) -> &str {
        &self.command.id
    }

    /// Check this command's own fields and, for a composite, the whole graph
    /// below it for cycles.
    pub fn check_validity(&self) -> Result<(), EngineError> {
        self.check_fields()?;
        if let CommandKind::Composite(_) = &self.command.kind {
            self.check_cycle()?;
        }
        Ok(())
    }

    fn check_fields(&self) -> Result<(), EngineError> {
        let invalid = |reason: &str| EngineError::InvalidCommand {
            id: self.command.id.clone(),
            reason: reason.to_string(),
        };
        match &self.command.kind {
            CommandKind::Exec(exec) => {
                if is_blank(&exec.component) {
                    return Err(invalid("exec command requires a component"));
                }
                if is_blank(&exec.command_line) {
                    return Err(invalid("exec command requires a commandLine"));
                }
            }
            CommandKind::Apply(apply) => {
                if is_blank(&apply.component) {
                    return Err(invalid("apply command requires a component"));
                }
            }
            CommandKind::Composite(composite) => {
                for sub in &composite.commands {
                    if !self.index.contains_key(&sub.to_lowercase()) {
                        return Err(EngineError::MissingSubCommand {
                            composite: self.command.id.clone(),
                            missing: sub.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Depth-first walk of the composite graph. `path` holds the ids on the
    /// current branch; `done` the keys whose sub-graph is known acyclic, so
    /// each composite is expanded once.
    fn check_cycle(&self) -> Result<(), EngineError> {
        let mut path = vec![self.command.id.clone()];
        let mut done = FxHashSet::default();
        self.visit(self.command, &mut path, &mut done)
    }

    fn visit(
        &self,
        command: &Command,
        path: &mut Vec<String>,
        done: &mut FxHashSet<String>,
    ) -> Result<(), EngineError> {
        let CommandKind::Composite(composite) = &command.kind else {
            return Ok(());
        };
        for sub in &composite.commands {
            let key = sub.to_lowercase();
            if done.contains(&key) {
                continue;
            }
            if path.iter().any(|id| id.eq_ignore_ascii_case(sub)) {
                let mut chain = path.clone();
                chain.push(sub.clone());
                return Err(EngineError::CompositeCycle {
                    id: self.command.id.clone(),
                    chain,
                });
            }
            if let Some(next) = self.index.get(&key) {
                path.push(sub.clone());
                self.visit(next, path, done)?;
                path.pop();
            }
        }
        done.insert(command.key());
        Ok(())
    }

    /// Model for a sub-command, sharing the index. The root already walked
    /// the graph for cycles; only the sub-command's own fields are checked.
    fn sub_command(&self, id: &str) -> Result<CommandModel<'a>, EngineError> {
        let command = self
            .index
            .get(&id.to_lowercase())
            .copied()
            .ok_or_else(|| EngineError::MissingSubCommand {
                composite: self.command.id.clone(),
                missing: id.to_string(),
            })?;
        let model = Self {
            devfile: self.devfile,
            command,
            index: Arc::clone(&self.index),
        };
        model.check_fields()?;
        Ok(model)
    }

    pub fn execute(&self, handler: &dyn Handler) -> Result<(), EngineError> {
        match &self.command.kind {
            CommandKind::Exec(_) => {
                tracing::info!(command = %self.command.id, "executing command");
                handler.execute(self.command).map_err(EngineError::Handler)
            }
            CommandKind::Apply(apply) => {
                let name = apply.component.as_deref().unwrap_or_default();
                let matches = self.devfile.components_named(name);
                let component = match matches.as_slice() {
                    [] => {
                        return Err(EngineError::ComponentNotExist {
                            name: name.to_string(),
                        })
                    }
                    [one] => *one,
                    _ => {
                        return Err(EngineError::ComponentsWithSameName {
                            name: name.to_string(),
                        })
                    }
                };
                tracing::info!(command = %self.command.id, component = name, "applying component");
                ComponentModel::new(component)?.apply(handler)
            }
            CommandKind::Composite(composite) if composite.is_parallel() => {
                self.execute_parallel(composite, handler)
            }
            CommandKind::Composite(composite) => {
                tracing::info!(
                    command = %self.command.id,
                    steps = composite.commands.len(),
                    "executing sequential composite"
                );
                for sub in &composite.commands {
                    self.sub_command(sub)?.execute(handler)?;
                }
                Ok(())
            }
        }
    }

    fn execute_parallel(
        &self,
        composite: &CompositeCommand,
        handler: &dyn Handler,
    ) -> Result<(), EngineError> {
        let subs = composite
            .commands
            .iter()
            .map(|id| self.sub_command(id))
            .collect::<Result<Vec<_>, _>>()?;
        let total = subs.len();
        tracing::info!(command = %self.command.id, tasks = total, "executing parallel composite");

        let (tx, rx) = crossbeam_channel::bounded(total);
        std::thread::scope(|scope| {
            for sub in &subs {
                let tx = tx.clone();
                scope.spawn(move || {
                    if let Err(err) = sub.execute(handler) {
                        tracing::warn!(command = %sub.id(), error = %err, "parallel sub-command failed");
                        // Capacity equals the task count, so this never blocks.
                        let _ = tx.send(err);
                    }
                });
            }
        });
        drop(tx);

        let failures: Vec<EngineError> = rx.try_iter().collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::ParallelExecutionFailed {
                id: self.command.id.clone(),
                total,
                failures,
            })
        }
    }
}
