//! TR-013: Error taxonomy.
//!
//! One enum per concern. Every variant carries the structured fields a caller
//! needs to branch on (id, name, kind, uri) instead of a formatted string.

use super::types::CommandGroupKind;
use std::path::PathBuf;

/// Error returned by a caller-supplied handler. Opaque to the engine.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to obtain raw document bytes.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot read {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported URI scheme for {uri} (only local paths and file:// are readable)")]
    UnsupportedScheme { uri: String },

    #[error("no document registered for {uri}")]
    NotFound { uri: String },

    #[error("invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
}

/// Failure to turn raw bytes into a [`Devfile`](super::types::Devfile).
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("schemaVersion is missing")]
    MissingSchemaVersion,

    #[error("invalid schemaVersion '{version}': {reason}")]
    InvalidSchemaVersion { version: String, reason: String },

    #[error("unsupported schemaVersion '{version}' (expected 2.x)")]
    UnsupportedSchemaVersion { version: String },

    #[error("{category} '{name}' declares more than one type: {}", .keys.join(", "))]
    MultipleVariants {
        category: &'static str,
        name: String,
        keys: Vec<String>,
    },

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A structural problem found in a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Parent resolution failure. Always fatal, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to fetch parent {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to parse parent {uri}: {source}")]
    Parse {
        uri: String,
        #[source]
        source: ParseError,
    },

    #[error("parent does not define a uri")]
    MissingParentUri,

    #[error("cannot override {category} '{key}': it does not exist in the parent")]
    UnknownOverrideTarget { category: &'static str, key: String },

    #[error("cannot override {category} '{key}': parent declares a {expected}, override declares a {found}")]
    OverrideTypeMismatch {
        category: &'static str,
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{category} '{key}' is already defined in the parent; declare it as a parent override instead")]
    DuplicateKey { category: &'static str, key: String },

    #[error("parent cycle detected: {}", .chain.join(" -> "))]
    ParentCycle { chain: Vec<String> },

    #[error("parent chain exceeds the maximum depth of {max_depth}")]
    ParentTooDeep { max_depth: usize },

    #[error("parent {uri} has schemaVersion {parent}, greater than the child's {child}")]
    ParentVersionTooNew {
        uri: String,
        parent: String,
        child: String,
    },

    #[error("resolved devfile is invalid: {}", .errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; "))]
    Invalid { errors: Vec<ValidationError> },
}

/// Construction, lookup, and execution failures of the command engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // -- validation (construction time) --
    #[error("command '{id}' is invalid: {reason}")]
    InvalidCommand { id: String, reason: String },

    #[error("component '{name}' is invalid: {reason}")]
    InvalidComponent { name: String, reason: String },

    #[error("the command '{missing}' mentioned in the composite command '{composite}' does not exist in the devfile")]
    MissingSubCommand { composite: String, missing: String },

    #[error("composite command '{id}' references itself: {}", .chain.join(" -> "))]
    CompositeCycle { id: String, chain: Vec<String> },

    // -- lookup (dispatch time) --
    #[error("component '{name}' does not exist")]
    ComponentNotExist { name: String },

    #[error("more than one component named '{name}'")]
    ComponentsWithSameName { name: String },

    #[error("{}", no_command_message(.kind, .name.as_deref()))]
    NoCommandFound {
        kind: CommandGroupKind,
        name: Option<String>,
    },

    #[error("no default {kind} command found in the devfile")]
    NoDefaultCommandFound { kind: CommandGroupKind },

    #[error("more than one default {kind} command found in the devfile; this should not happen")]
    MoreThanOneDefaultCommandFound { kind: CommandGroupKind },

    #[error("unable to find devfile command '{id}' bound to {event}")]
    EventCommandNotFound { event: String, id: String },

    #[error("{component} is not a {expected} component")]
    WrongComponentType {
        component: String,
        expected: &'static str,
    },

    #[error("manifest references undefined variables: {}", .keys.join(", "))]
    InvalidVariableKeys { keys: Vec<String> },

    #[error("cannot load manifest of component '{component}': {source}")]
    Manifest {
        component: String,
        #[source]
        source: SourceError,
    },

    // -- execution --
    #[error(transparent)]
    Handler(HandlerError),

    #[error("unable to execute devfile command '{id}': {source}")]
    Command {
        id: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("parallel execution of composite '{id}' failed: {} of {total} sub-command(s) failed", .failures.len())]
    ParallelExecutionFailed {
        id: String,
        total: usize,
        failures: Vec<EngineError>,
    },
}

fn no_command_message(kind: &CommandGroupKind, name: Option<&str>) -> String {
    match name {
        Some(n) => format!("no {} command named '{}' found in the devfile", kind, n),
        None => format!("no {} command found in the devfile", kind),
    }
}

/// Failure of a configurable-parameter operation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown parameter '{0}': it is not a configurable parameter in the devfile")]
    UnknownParameter(String),

    #[error("unable to parse the port string '{0}'")]
    InvalidPort(String),

    #[error("invalid port protocol '{0}' (expected tcp or udp)")]
    InvalidProtocol(String),

    #[error("unable to find environment variable {key} in component '{component}'")]
    EnvVarNotFound { key: String, component: String },

    #[error("malformed environment variable '{0}' (expected KEY=VALUE)")]
    MalformedEnvVar(String),

    #[error("devfile has no path to write to")]
    NoPath,

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize error: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
}
