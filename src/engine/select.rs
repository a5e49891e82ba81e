//! TR-009: Command selection by group kind.

use crate::core::error::EngineError;
use crate::core::types::{Command, CommandGroupKind, Devfile};

/// Pick the command to run for `kind`.
///
/// | candidates | result |
/// |---|---|
/// | 0 | `NoCommandFound` |
/// | 1 | that command, default or not |
/// | n | the single `isDefault` one, else `NoDefaultCommandFound` / `MoreThanOneDefaultCommandFound` |
pub fn select_default_command(
    devfile: &Devfile,
    kind: CommandGroupKind,
) -> Result<&Command, EngineError> {
    let candidates = devfile.commands_by_group(kind);
    tracing::debug!(%kind, candidates = candidates.len(), "selecting default command");
    match candidates.as_slice() {
        [] => Err(EngineError::NoCommandFound { kind, name: None }),
        [only] => Ok(*only),
        _ => {
            let defaults: Vec<&Command> = candidates
                .iter()
                .copied()
                .filter(|c| c.is_default())
                .collect();
            match defaults.as_slice() {
                [] => Err(EngineError::NoDefaultCommandFound { kind }),
                [one] => Ok(*one),
                _ => Err(EngineError::MoreThanOneDefaultCommandFound { kind }),
            }
        }
    }
}

/// Look up a command by id within `kind`. An empty name selects the default.
pub fn get_command<'a>(
    devfile: &'a Devfile,
    name: &str,
    kind: CommandGroupKind,
) -> Result<&'a Command, EngineError> {
    if name.is_empty() {
        return select_default_command(devfile, kind);
    }
    devfile
        .commands_by_group(kind)
        .into_iter()
        .find(|c| c.id.eq_ignore_ascii_case(name))
        .ok_or_else(|| EngineError::NoCommandFound {
            kind,
            name: Some(name.to_string()),
        })
}

/// Whether any command belongs to `kind`.
pub fn has_command(devfile: &Devfile, kind: CommandGroupKind) -> bool {
    devfile.commands.iter().any(|c| c.group_kind() == Some(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_devfile;

    fn deploy_commands(defaults: &[Option<bool>]) -> Devfile {
        let mut yaml = String::from(
            "schemaVersion: 2.2.0\ncomponents:\n  - name: k\n    kubernetes: {uri: k.yaml}\ncommands:\n",
        );
        for (i, default) in defaults.iter().enumerate() {
            let group = match default {
                Some(d) => format!("{{kind: deploy, isDefault: {}}}", d),
                None => "{kind: deploy}".to_string(),
            };
            yaml.push_str(&format!(
                "  - id: deploy-{}\n    apply: {{component: k, group: {}}}\n",
                i, group
            ));
        }
        parse_devfile(yaml.as_bytes()).unwrap()
    }

    #[test]
    fn test_tr009_none() {
        let d = deploy_commands(&[]);
        assert!(matches!(
            select_default_command(&d, CommandGroupKind::Deploy),
            Err(EngineError::NoCommandFound { name: None, .. })
        ));
    }

    #[test]
    fn test_tr009_single_not_default_selected() {
        let d = deploy_commands(&[None]);
        assert_eq!(
            select_default_command(&d, CommandGroupKind::Deploy).unwrap().id,
            "deploy-0"
        );
        let d = deploy_commands(&[Some(false)]);
        assert!(select_default_command(&d, CommandGroupKind::Deploy).is_ok());
    }

    #[test]
    fn test_tr009_one_default_of_two() {
        let d = deploy_commands(&[Some(false), Some(true)]);
        assert_eq!(
            select_default_command(&d, CommandGroupKind::Deploy).unwrap().id,
            "deploy-1"
        );
    }

    #[test]
    fn test_tr009_no_default_of_two() {
        let d = deploy_commands(&[None, Some(false)]);
        assert!(matches!(
            select_default_command(&d, CommandGroupKind::Deploy),
            Err(EngineError::NoDefaultCommandFound { kind: CommandGroupKind::Deploy })
        ));
    }

    #[test]
    fn test_tr009_two_defaults() {
        let d = deploy_commands(&[Some(true), Some(true)]);
        assert!(matches!(
            select_default_command(&d, CommandGroupKind::Deploy),
            Err(EngineError::MoreThanOneDefaultCommandFound { .. })
        ));
    }

    #[test]
    fn test_tr009_get_command_by_name() {
        let d = deploy_commands(&[Some(true), None]);
        assert_eq!(
            get_command(&d, "DEPLOY-1", CommandGroupKind::Deploy).unwrap().id,
            "deploy-1"
        );
        assert_eq!(get_command(&d, "", CommandGroupKind::Deploy).unwrap().id, "deploy-0");
        match get_command(&d, "deploy-0", CommandGroupKind::Build) {
            Err(EngineError::NoCommandFound { kind, name }) => {
                assert_eq!(kind, CommandGroupKind::Build);
                assert_eq!(name.as_deref(), Some("deploy-0"));
            }
            other => panic!("expected NoCommandFound, got {:?}", other),
        }
    }

    #[test]
    fn test_tr009_has_command() {
        let d = deploy_commands(&[None]);
        assert!(has_command(&d, CommandGroupKind::Deploy));
        assert!(!has_command(&d, CommandGroupKind::Run));
    }
}
