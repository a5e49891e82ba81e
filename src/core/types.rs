//! TR-001: Devfile document model.
//!
//! Defines the YAML schema types for components, commands, projects, events
//! and the parent reference. Components and commands are closed enums: exactly
//! one variant is set by construction. All types derive Serialize/Deserialize
//! and keep insertion order so an unmodified document round-trips unchanged.

use super::error::EngineError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Free-form attribute map attached to components, commands and endpoints.
pub type Attributes = IndexMap<String, serde_yaml_ng::Value>;

/// Endpoint names that mark a debug port.
pub const DEBUG_ENDPOINT_PREFIX: &str = "debug";

// ============================================================================
// Top-level devfile
// ============================================================================

/// Root document. After resolution `parent` is always `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Devfile {
    pub schema_version: String,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,

    /// Global variables substituted into manifests (`{{name}}`)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub starter_projects: Vec<Project>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Events>,
}

/// Devfile metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self == &Metadata::default()
    }
}

/// Reference to a parent devfile plus the patches applied to its entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub starter_projects: Vec<Project>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Events>,
}

// ============================================================================
// Components
// ============================================================================

/// A named runtime building block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(flatten)]
    pub kind: ComponentKind,
}

/// Component variant. Serialized as the variant key (`container:`, `volume:` ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Container(Container),
    Kubernetes(ManifestComponent),
    Openshift(ManifestComponent),
    Volume(Volume),
    Image(Image),
}

/// Component type tag, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Container,
    Kubernetes,
    Openshift,
    Volume,
    Image,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Kubernetes => "kubernetes",
            Self::Openshift => "openshift",
            Self::Volume => "volume",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Container(_) => ComponentType::Container,
            Self::Kubernetes(_) => ComponentType::Kubernetes,
            Self::Openshift(_) => ComponentType::Openshift,
            Self::Volume(_) => ComponentType::Volume,
            Self::Image(_) => ComponentType::Image,
        }
    }
}

impl Component {
    pub fn component_type(&self) -> ComponentType {
        self.kind.component_type()
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.kind {
            ComponentKind::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut Container> {
        match &mut self.kind {
            ComponentKind::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Kubernetes or OpenShift manifest body.
    pub fn as_manifest(&self) -> Option<&ManifestComponent> {
        match &self.kind {
            ComponentKind::Kubernetes(m) | ComponentKind::Openshift(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match &self.kind {
            ComponentKind::Image(i) => Some(i),
            _ => None,
        }
    }
}

/// Workspace container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_sources: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_mapping: Option<String>,
}

/// Kubernetes / OpenShift manifest, either inlined or referenced by URI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inlined: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_by_default: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
}

/// Shared volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<bool>,
}

/// Buildable image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_build: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<Dockerfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dockerfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_context: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_required: Option<bool>,
}

/// Network endpoint exposed by a container or manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: String,

    #[serde(default)]
    pub target_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,
}

impl Endpoint {
    /// Debug endpoints are named `debug` or `debug-*`.
    pub fn is_debug(&self) -> bool {
        is_debug_port(&self.name)
    }
}

/// Returns whether `name` follows the debug endpoint naming convention.
pub fn is_debug_port(name: &str) -> bool {
    name == DEBUG_ENDPOINT_PREFIX
        || name
            .strip_prefix(DEBUG_ENDPOINT_PREFIX)
            .is_some_and(|rest| rest.starts_with('-'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

// ============================================================================
// Commands
// ============================================================================

/// A named unit of action. Ids compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(flatten)]
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    Exec(ExecCommand),
    Apply(ApplyCommand),
    Composite(CompositeCommand),
}

/// Command type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Exec,
    Apply,
    Composite,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exec => "exec",
            Self::Apply => "apply",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run a command line inside a container component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_reload_capable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<CommandGroup>,
}

/// Apply a component (manifest or image).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<CommandGroup>,
}

/// Run other commands, sequentially or in parallel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeCommand {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<CommandGroup>,
}

impl CompositeCommand {
    pub fn is_parallel(&self) -> bool {
        self.parallel.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandGroup {
    pub kind: CommandGroupKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

/// Lifecycle phase a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandGroupKind {
    Build,
    Run,
    Test,
    Debug,
    Deploy,
}

impl fmt::Display for CommandGroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Run => write!(f, "run"),
            Self::Test => write!(f, "test"),
            Self::Debug => write!(f, "debug"),
            Self::Deploy => write!(f, "deploy"),
        }
    }
}

impl FromStr for CommandGroupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "build" => Ok(Self::Build),
            "run" => Ok(Self::Run),
            "test" => Ok(Self::Test),
            "debug" => Ok(Self::Debug),
            "deploy" => Ok(Self::Deploy),
            other => Err(format!(
                "unknown command group kind '{}' (expected build, run, test, debug or deploy)",
                other
            )),
        }
    }
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match &self.kind {
            CommandKind::Exec(_) => CommandType::Exec,
            CommandKind::Apply(_) => CommandType::Apply,
            CommandKind::Composite(_) => CommandType::Composite,
        }
    }

    pub fn group(&self) -> Option<&CommandGroup> {
        match &self.kind {
            CommandKind::Exec(e) => e.group.as_ref(),
            CommandKind::Apply(a) => a.group.as_ref(),
            CommandKind::Composite(c) => c.group.as_ref(),
        }
    }

    pub fn group_kind(&self) -> Option<CommandGroupKind> {
        self.group().map(|g| g.kind)
    }

    pub fn is_default(&self) -> bool {
        self.group().and_then(|g| g.is_default).unwrap_or(false)
    }

    /// Lowercased id, the key commands are indexed and compared by.
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }

    pub fn as_exec(&self) -> Option<&ExecCommand> {
        match &self.kind {
            CommandKind::Exec(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<ZipSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub remotes: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_from: Option<CheckoutFrom>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// ============================================================================
// Events
// ============================================================================

/// Bindings of command ids to lifecycle events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Events {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_start: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_start: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_stop: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_stop: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PreStart,
    PostStart,
    PreStop,
    PostStop,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::PreStart,
        EventKind::PostStart,
        EventKind::PreStop,
        EventKind::PostStop,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreStart => write!(f, "preStart"),
            Self::PostStart => write!(f, "postStart"),
            Self::PreStop => write!(f, "preStop"),
            Self::PostStop => write!(f, "postStop"),
        }
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "prestart" => Ok(Self::PreStart),
            "poststart" => Ok(Self::PostStart),
            "prestop" => Ok(Self::PreStop),
            "poststop" => Ok(Self::PostStop),
            other => Err(format!("unknown event '{}'", other)),
        }
    }
}

impl Events {
    pub fn is_empty(&self) -> bool {
        self.pre_start.is_empty()
            && self.post_start.is_empty()
            && self.pre_stop.is_empty()
            && self.post_stop.is_empty()
    }

    pub fn get(&self, kind: EventKind) -> &[String] {
        match kind {
            EventKind::PreStart => &self.pre_start,
            EventKind::PostStart => &self.post_start,
            EventKind::PreStop => &self.pre_stop,
            EventKind::PostStop => &self.post_stop,
        }
    }

    pub fn get_mut(&mut self, kind: EventKind) -> &mut Vec<String> {
        match kind {
            EventKind::PreStart => &mut self.pre_start,
            EventKind::PostStart => &mut self.post_start,
            EventKind::PreStop => &mut self.pre_stop,
            EventKind::PostStop => &mut self.post_stop,
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Devfile {
    /// An empty document at the given schema version.
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            schema_version: schema_version.into(),
            metadata: Metadata::default(),
            parent: None,
            variables: IndexMap::new(),
            attributes: IndexMap::new(),
            projects: Vec::new(),
            starter_projects: Vec::new(),
            components: Vec::new(),
            commands: Vec::new(),
            events: None,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn starter_projects(&self) -> &[Project] {
        &self.starter_projects
    }

    /// Event bindings; an absent `events:` block reads as empty.
    pub fn events(&self) -> Events {
        self.events.clone().unwrap_or_default()
    }

    pub fn metadata_name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// All components with this exact name (more than one is a data error).
    pub fn components_named(&self, name: &str) -> Vec<&Component> {
        self.components.iter().filter(|c| c.name == name).collect()
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Command lookup by id, case-insensitive.
    pub fn command(&self, id: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.id.eq_ignore_ascii_case(id))
    }

    pub fn commands_by_group(&self, kind: CommandGroupKind) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| c.group_kind() == Some(kind))
            .collect()
    }

    pub fn components_of_type(&self, component_type: ComponentType) -> Vec<&Component> {
        self.components
            .iter()
            .filter(|c| c.component_type() == component_type)
            .collect()
    }

    /// Container components paired with their container body.
    pub fn containers(&self) -> impl Iterator<Item = (&Component, &Container)> {
        self.components
            .iter()
            .filter_map(|c| c.as_container().map(|body| (c, body)))
    }

    /// Target ports of every container, keyed by container name.
    pub fn container_endpoint_mapping(&self) -> IndexMap<String, Vec<u16>> {
        self.containers()
            .map(|(c, body)| {
                (
                    c.name.clone(),
                    body.endpoints.iter().map(|e| e.target_port).collect(),
                )
            })
            .collect()
    }

    /// Container endpoints whose exposure is not in `ignore_exposures`.
    pub fn endpoints_excluding(&self, ignore_exposures: &[&str]) -> Vec<&Endpoint> {
        self.containers()
            .flat_map(|(_, body)| body.endpoints.iter())
            .filter(|e| {
                e.exposure
                    .as_deref()
                    .is_none_or(|x| !ignore_exposures.contains(&x))
            })
            .collect()
    }

    /// Debug endpoints of the named container component.
    pub fn debug_endpoints(&self, component: &str) -> Result<Vec<&Endpoint>, EngineError> {
        let body = self
            .component(component)
            .ok_or_else(|| EngineError::ComponentNotExist {
                name: component.to_string(),
            })?
            .as_container()
            .ok_or_else(|| EngineError::WrongComponentType {
                component: component.to_string(),
                expected: "container",
            })?;
        Ok(body.endpoints.iter().filter(|e| e.is_debug()).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
