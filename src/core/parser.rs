//! TR-002: Devfile parsing, validation and write-back.
//!
//! Parses devfile YAML through a pluggable `SchemaValidator` and validates
//! structural constraints:
//! - schemaVersion must be a 2.x semantic version
//! - component names and command ids must be unique
//! - exec/apply commands must reference existing components
//! - composite sub-commands and event bindings must reference existing commands

use super::error::{ConfigError, ParseError, ValidationError};
use super::types::*;
use regex::Regex;
use rustc_hash::FxHashSet;
use semver::Version;
use serde_yaml_ng::Value;
use std::path::Path;
use std::sync::LazyLock;

/// Supported schema major version.
pub const SUPPORTED_MAJOR: u64 = 2;

const COMPONENT_VARIANTS: &[&str] = &["container", "kubernetes", "openshift", "volume", "image"];
const COMMAND_VARIANTS: &[&str] = &["exec", "apply", "composite"];

/// Top-level block-style `schemaVersion: <number>` line.
static NUMERIC_VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^schemaVersion[ \t]*:[ \t]*([0-9][0-9.]*)[ \t]*(?:#.*)?\r?$")
        .expect("valid regex")
});

/// Validates one raw document against its declared schema version and
/// decodes it.
pub trait SchemaValidator {
    fn validate(&self, raw: &[u8], schema_version: &str) -> Result<Devfile, ParseError>;
}

impl<T: SchemaValidator + ?Sized> SchemaValidator for &T {
    fn validate(&self, raw: &[u8], schema_version: &str) -> Result<Devfile, ParseError> {
        (**self).validate(raw, schema_version)
    }
}

/// Default validator: accepts schema major version 2 and decodes the YAML
/// shape with serde.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSchema;

impl SchemaValidator for YamlSchema {
    fn validate(&self, raw: &[u8], schema_version: &str) -> Result<Devfile, ParseError> {
        let version = parse_schema_version(schema_version)?;
        if version.major != SUPPORTED_MAJOR {
            return Err(ParseError::UnsupportedSchemaVersion {
                version: schema_version.to_string(),
            });
        }
        let mut value: Value = serde_yaml_ng::from_slice(raw)?;
        check_single_variant(&value)?;
        // An unquoted `2.2` decodes as a float; store the normalized text.
        if let Some(map) = value.as_mapping_mut() {
            map.insert(Value::from("schemaVersion"), Value::from(schema_version));
        }
        Ok(serde_yaml_ng::from_value(value)?)
    }
}

/// Components and commands are tagged by exactly one variant key. serde
/// would keep the first and drop the rest, so extra keys are rejected here.
fn check_single_variant(doc: &Value) -> Result<(), ParseError> {
    for scope in [Some(doc), doc.get("parent")].into_iter().flatten() {
        check_entries(scope.get("components"), "component", "name", COMPONENT_VARIANTS)?;
        check_entries(scope.get("commands"), "command", "id", COMMAND_VARIANTS)?;
    }
    Ok(())
}

fn check_entries(
    list: Option<&Value>,
    category: &'static str,
    key_field: &str,
    variants: &[&str],
) -> Result<(), ParseError> {
    let Some(entries) = list.and_then(Value::as_sequence) else {
        return Ok(());
    };
    for entry in entries {
        let keys: Vec<String> = variants
            .iter()
            .filter(|v| entry.get(**v).is_some())
            .map(|v| v.to_string())
            .collect();
        if keys.len() > 1 {
            return Err(ParseError::MultipleVariants {
                category,
                name: entry
                    .get(key_field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                keys,
            });
        }
    }
    Ok(())
}

/// Read `schemaVersion` from raw bytes without decoding the rest.
///
/// An unquoted version decodes as a number, which loses text (`2.10` reads
/// as `2.1`). The scalar is then taken from the source line; a decimal that
/// cannot be recovered that way is rejected.
pub fn peek_schema_version(raw: &[u8]) -> Result<String, ParseError> {
    let value: Value = serde_yaml_ng::from_slice(raw)?;
    match value.get("schemaVersion") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => {
            let text = String::from_utf8_lossy(raw);
            if let Some(caps) = NUMERIC_VERSION_LINE.captures(&text) {
                return Ok(caps[1].to_string());
            }
            if n.is_f64() {
                return Err(ParseError::InvalidSchemaVersion {
                    version: n.to_string(),
                    reason: "unquoted decimal version is ambiguous; quote it".to_string(),
                });
            }
            Ok(n.to_string())
        }
        _ => Err(ParseError::MissingSchemaVersion),
    }
}

/// Parse a schema version, padding `2` and `2.2` to full semver.
pub fn parse_schema_version(version: &str) -> Result<Version, ParseError> {
    let trimmed = version.trim();
    let padded = match trimmed.matches('.').count() {
        0 => format!("{}.0.0", trimmed),
        1 => format!("{}.0", trimmed),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).map_err(|e| ParseError::InvalidSchemaVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })
}

/// Peek the schema version, then hand the bytes to `validator`.
pub fn parse_with(validator: &dyn SchemaValidator, raw: &[u8]) -> Result<Devfile, ParseError> {
    let version = peek_schema_version(raw)?;
    validator.validate(raw, &version)
}

/// Parse a devfile with the default validator.
pub fn parse_devfile(raw: &[u8]) -> Result<Devfile, ParseError> {
    parse_with(&YamlSchema, raw)
}

/// Parse a devfile from disk.
pub fn parse_devfile_file(path: &Path) -> Result<Devfile, ParseError> {
    let raw = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_devfile(&raw)
}

/// Serialize a devfile and write it atomically (temp file, then rename).
pub fn write_devfile(path: &Path, devfile: &Devfile) -> Result<(), ConfigError> {
    let yaml = serde_yaml_ng::to_string(devfile)?;
    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, yaml).map_err(|source| ConfigError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn error(message: String) -> ValidationError {
    ValidationError { message }
}

/// Validate a parsed devfile. Returns a list of errors (empty = valid).
pub fn validate_devfile(devfile: &Devfile) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if devfile.schema_version.trim().is_empty() {
        errors.push(error("schemaVersion must not be empty".to_string()));
    }
    if devfile.metadata.name.as_deref().is_some_and(str::is_empty) {
        errors.push(error("metadata.name must not be empty".to_string()));
    }

    let mut names = FxHashSet::default();
    for component in &devfile.components {
        if component.name.is_empty() {
            errors.push(error("component with an empty name".to_string()));
        } else if !names.insert(component.name.as_str()) {
            errors.push(error(format!("duplicate component name '{}'", component.name)));
        }
    }

    let mut projects = FxHashSet::default();
    for project in devfile.projects.iter().chain(&devfile.starter_projects) {
        if !projects.insert(project.name.as_str()) {
            errors.push(error(format!("duplicate project name '{}'", project.name)));
        }
    }

    let mut ids = FxHashSet::default();
    for command in &devfile.commands {
        if command.id.is_empty() {
            errors.push(error("command with an empty id".to_string()));
        } else if !ids.insert(command.key()) {
            errors.push(error(format!("duplicate command id '{}'", command.id)));
        }
    }

    for command in &devfile.commands {
        match &command.kind {
            CommandKind::Exec(exec) => {
                if let Some(name) = &exec.component {
                    match devfile.component(name) {
                        None => errors.push(error(format!(
                            "command '{}' references unknown component '{}'",
                            command.id, name
                        ))),
                        Some(c) if c.as_container().is_none() => errors.push(error(format!(
                            "exec command '{}' must reference a container component, '{}' is a {}",
                            command.id,
                            name,
                            c.component_type()
                        ))),
                        Some(_) => {}
                    }
                }
            }
            CommandKind::Apply(apply) => {
                if let Some(name) = &apply.component {
                    if devfile.component(name).is_none() {
                        errors.push(error(format!(
                            "command '{}' references unknown component '{}'",
                            command.id, name
                        )));
                    }
                }
            }
            CommandKind::Composite(composite) => {
                for sub in &composite.commands {
                    if !ids.contains(&sub.to_lowercase()) {
                        errors.push(error(format!(
                            "composite command '{}' references unknown command '{}'",
                            command.id, sub
                        )));
                    }
                }
            }
        }
    }

    if let Some(events) = &devfile.events {
        for kind in EventKind::ALL {
            for id in events.get(kind) {
                if !ids.contains(&id.to_lowercase()) {
                    errors.push(error(format!(
                        "{} event references unknown command '{}'",
                        kind, id
                    )));
                }
            }
        }
    }

    errors
}
