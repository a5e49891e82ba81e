//! TR-004: Override and add passes.
//!
//! Merges a child devfile onto its already resolved parent in two passes:
//! 1. Override: every entry of the `parent:` patch must name an existing
//!    parent entry of the same variant; it is merged field by field.
//! 2. Add: every top-level child entry must be new and is appended.
//!
//! Both passes work on an owned copy, so a failed merge leaves nothing behind.

use super::error::ResolveError;
use super::types::*;

/// An entry that can be located by key and patched in place.
pub trait Patchable: Clone {
    /// Category name used in error messages (`command`, `component`, ...).
    const CATEGORY: &'static str;

    /// Merge key. Command ids compare lowercased.
    fn key(&self) -> String;

    fn patch(&mut self, patch: &Self) -> Result<(), ResolveError>;
}

/// Number of entries touched by each pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub overridden: usize,
    pub added: usize,
}

/// Merge `local` onto the resolved `parent`. The result carries the child's
/// schema version and metadata and no parent reference.
pub fn merge(parent: Devfile, local: &Devfile) -> Result<(Devfile, MergeStats), ResolveError> {
    let mut merged = parent;
    let mut stats = MergeStats::default();

    if let Some(patch) = &local.parent {
        stats.overridden = apply_overrides(&mut merged, patch)?;
    }
    stats.added = add_local(&mut merged, local)?;

    merged.schema_version = local.schema_version.clone();
    merged.metadata = local.metadata.clone();
    merged.parent = None;
    Ok((merged, stats))
}

/// Apply the `parent:` patch block onto `base`. Returns the number of
/// overridden entries.
pub fn apply_overrides(base: &mut Devfile, patch: &Parent) -> Result<usize, ResolveError> {
    let mut count = 0;
    count += override_list(&mut base.commands, &patch.commands)?;
    count += override_list(&mut base.components, &patch.components)?;
    count += override_list(&mut base.projects, &patch.projects)?;
    count += override_list(&mut base.starter_projects, &patch.starter_projects)?;

    if let Some(events) = &patch.events {
        let target = base.events.get_or_insert_with(Events::default);
        for kind in EventKind::ALL {
            if !events.get(kind).is_empty() {
                *target.get_mut(kind) = events.get(kind).to_vec();
            }
        }
    }
    merge_map(&mut base.variables, &patch.variables);
    merge_map(&mut base.attributes, &patch.attributes);
    Ok(count)
}

/// Append the child's own entries onto `base`. Returns the number of added
/// entries.
pub fn add_local(base: &mut Devfile, local: &Devfile) -> Result<usize, ResolveError> {
    let mut count = 0;
    count += add_list(&mut base.commands, &local.commands)?;
    count += add_list(&mut base.components, &local.components)?;
    count += add_list(&mut base.projects, &local.projects)?;
    count += add_list(&mut base.starter_projects, &local.starter_projects)?;

    if let Some(events) = &local.events {
        let target = base.events.get_or_insert_with(Events::default);
        for kind in EventKind::ALL {
            for id in events.get(kind) {
                let bound = target.get_mut(kind);
                if bound.iter().any(|b| b.eq_ignore_ascii_case(id)) {
                    return Err(ResolveError::DuplicateKey {
                        category: "event binding",
                        key: format!("{}/{}", kind, id),
                    });
                }
                bound.push(id.clone());
            }
        }
        if target.is_empty() {
            base.events = None;
        }
    }
    merge_map(&mut base.variables, &local.variables);
    merge_map(&mut base.attributes, &local.attributes);
    Ok(count)
}

fn override_list<T: Patchable>(base: &mut [T], patches: &[T]) -> Result<usize, ResolveError> {
    for patch in patches {
        let key = patch.key();
        let target = base
            .iter_mut()
            .find(|entry| entry.key() == key)
            .ok_or(ResolveError::UnknownOverrideTarget {
                category: T::CATEGORY,
                key,
            })?;
        target.patch(patch)?;
    }
    Ok(patches.len())
}

fn add_list<T: Patchable>(base: &mut Vec<T>, local: &[T]) -> Result<usize, ResolveError> {
    for entry in local {
        let key = entry.key();
        if base.iter().any(|existing| existing.key() == key) {
            return Err(ResolveError::DuplicateKey {
                category: T::CATEGORY,
                key,
            });
        }
        base.push(entry.clone());
    }
    Ok(local.len())
}

// ============================================================================
// Field-level merge helpers
// ============================================================================

fn set<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if let Some(value) = src {
        *dst = Some(value.clone());
    }
}

fn set_list<T: Clone>(dst: &mut Vec<T>, src: &[T]) {
    if !src.is_empty() {
        *dst = src.to_vec();
    }
}

fn merge_map<V: Clone>(dst: &mut indexmap::IndexMap<String, V>, src: &indexmap::IndexMap<String, V>) {
    for (key, value) in src {
        dst.insert(key.clone(), value.clone());
    }
}

/// Merge a sub-list keyed by name: matching entries are merged with `merge`,
/// new ones appended.
fn merge_keyed<T: Clone>(
    dst: &mut Vec<T>,
    src: &[T],
    name: impl Fn(&T) -> &str,
    merge: impl Fn(&mut T, &T),
) {
    for entry in src {
        match dst.iter_mut().find(|d| name(d) == name(entry)) {
            Some(existing) => merge(existing, entry),
            None => dst.push(entry.clone()),
        }
    }
}

fn merge_env(dst: &mut Vec<EnvVar>, src: &[EnvVar]) {
    merge_keyed(dst, src, |e| e.name.as_str(), |d, s| d.value = s.value.clone());
}

fn merge_endpoints(dst: &mut Vec<Endpoint>, src: &[Endpoint]) {
    merge_keyed(dst, src, |e| e.name.as_str(), |d, s| {
        if s.target_port != 0 {
            d.target_port = s.target_port;
        }
        set(&mut d.exposure, &s.exposure);
        set(&mut d.protocol, &s.protocol);
        set(&mut d.path, &s.path);
        set(&mut d.secure, &s.secure);
        merge_map(&mut d.attributes, &s.attributes);
    });
}

fn merge_container(d: &mut Container, s: &Container) {
    set(&mut d.image, &s.image);
    set(&mut d.memory_limit, &s.memory_limit);
    set(&mut d.cpu_limit, &s.cpu_limit);
    set_list(&mut d.command, &s.command);
    set_list(&mut d.args, &s.args);
    merge_env(&mut d.env, &s.env);
    merge_endpoints(&mut d.endpoints, &s.endpoints);
    merge_keyed(&mut d.volume_mounts, &s.volume_mounts, |v| v.name.as_str(), |d, s| {
        set(&mut d.path, &s.path)
    });
    set(&mut d.mount_sources, &s.mount_sources);
    set(&mut d.source_mapping, &s.source_mapping);
}

fn merge_manifest(d: &mut ManifestComponent, s: &ManifestComponent) {
    // uri and inlined are one field: setting either replaces both.
    if s.uri.is_some() || s.inlined.is_some() {
        d.uri = s.uri.clone();
        d.inlined = s.inlined.clone();
    }
    set(&mut d.deploy_by_default, &s.deploy_by_default);
    merge_endpoints(&mut d.endpoints, &s.endpoints);
}

fn merge_group(d: &mut Option<CommandGroup>, s: &Option<CommandGroup>) {
    match (d.as_mut(), s) {
        (Some(dg), Some(sg)) => {
            dg.kind = sg.kind;
            set(&mut dg.is_default, &sg.is_default);
        }
        (None, Some(sg)) => *d = Some(sg.clone()),
        (_, None) => {}
    }
}

impl Patchable for Component {
    const CATEGORY: &'static str = "component";

    fn key(&self) -> String {
        self.name.clone()
    }

    fn patch(&mut self, patch: &Self) -> Result<(), ResolveError> {
        let expected = self.component_type().as_str();
        match (&mut self.kind, &patch.kind) {
            (ComponentKind::Container(d), ComponentKind::Container(s)) => merge_container(d, s),
            (ComponentKind::Kubernetes(d), ComponentKind::Kubernetes(s))
            | (ComponentKind::Openshift(d), ComponentKind::Openshift(s)) => merge_manifest(d, s),
            (ComponentKind::Volume(d), ComponentKind::Volume(s)) => {
                set(&mut d.size, &s.size);
                set(&mut d.ephemeral, &s.ephemeral);
            }
            (ComponentKind::Image(d), ComponentKind::Image(s)) => {
                set(&mut d.image_name, &s.image_name);
                set(&mut d.auto_build, &s.auto_build);
                set(&mut d.dockerfile, &s.dockerfile);
            }
            _ => {
                return Err(ResolveError::OverrideTypeMismatch {
                    category: Self::CATEGORY,
                    key: self.name.clone(),
                    expected,
                    found: patch.component_type().as_str(),
                })
            }
        }
        merge_map(&mut self.attributes, &patch.attributes);
        Ok(())
    }
}

impl Patchable for Command {
    const CATEGORY: &'static str = "command";

    fn key(&self) -> String {
        Command::key(self)
    }

    fn patch(&mut self, patch: &Self) -> Result<(), ResolveError> {
        let expected = self.command_type().as_str();
        match (&mut self.kind, &patch.kind) {
            (CommandKind::Exec(d), CommandKind::Exec(s)) => {
                set(&mut d.component, &s.component);
                set(&mut d.command_line, &s.command_line);
                set(&mut d.working_dir, &s.working_dir);
                merge_env(&mut d.env, &s.env);
                set(&mut d.hot_reload_capable, &s.hot_reload_capable);
                set(&mut d.label, &s.label);
                merge_group(&mut d.group, &s.group);
            }
            (CommandKind::Apply(d), CommandKind::Apply(s)) => {
                set(&mut d.component, &s.component);
                set(&mut d.label, &s.label);
                merge_group(&mut d.group, &s.group);
            }
            (CommandKind::Composite(d), CommandKind::Composite(s)) => {
                set_list(&mut d.commands, &s.commands);
                set(&mut d.parallel, &s.parallel);
                set(&mut d.label, &s.label);
                merge_group(&mut d.group, &s.group);
            }
            _ => {
                return Err(ResolveError::OverrideTypeMismatch {
                    category: Self::CATEGORY,
                    key: self.id.clone(),
                    expected,
                    found: patch.command_type().as_str(),
                })
            }
        }
        merge_map(&mut self.attributes, &patch.attributes);
        Ok(())
    }
}

impl Patchable for Project {
    const CATEGORY: &'static str = "project";

    fn key(&self) -> String {
        self.name.clone()
    }

    fn patch(&mut self, patch: &Self) -> Result<(), ResolveError> {
        set(&mut self.clone_path, &patch.clone_path);
        match (&mut self.git, &patch.git) {
            (Some(d), Some(s)) => {
                merge_map(&mut d.remotes, &s.remotes);
                set(&mut d.checkout_from, &s.checkout_from);
            }
            (d, s) => set(d, s),
        }
        set(&mut self.zip, &patch.zip);
        merge_map(&mut self.attributes, &patch.attributes);
        Ok(())
    }
}
