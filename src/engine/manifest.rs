//! TR-010: Kubernetes/OpenShift manifest loading with `{{variable}}`
//! substitution from the devfile's global variables.

use crate::core::error::EngineError;
use crate::core::source::{join_uri, DocumentSource};
use crate::core::types::Devfile;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("valid regex"));

/// Replace every `{{ key }}` in `text`. Keys missing from `variables` are
/// collected and reported together.
pub fn substitute_variables(
    variables: &IndexMap<String, String>,
    text: &str,
) -> Result<String, EngineError> {
    let mut missing: Vec<String> = Vec::new();
    let replaced = VARIABLE.replace_all(text, |caps: &Captures<'_>| {
        let key = &caps[1];
        match variables.get(key) {
            Some(value) => value.clone(),
            None => {
                if !missing.iter().any(|m| m == key) {
                    missing.push(key.to_string());
                }
                caps[0].to_string()
            }
        }
    });
    if missing.is_empty() {
        Ok(replaced.into_owned())
    } else {
        Err(EngineError::InvalidVariableKeys { keys: missing })
    }
}

/// Content of the named kubernetes/openshift component, inlined or fetched by
/// URI relative to `location`, with variables substituted.
pub fn manifest_with_variables(
    devfile: &Devfile,
    component: &str,
    source: &dyn DocumentSource,
    location: &str,
) -> Result<String, EngineError> {
    let manifest = match devfile.components_named(component).as_slice() {
        [] => {
            return Err(EngineError::ComponentNotExist {
                name: component.to_string(),
            })
        }
        [one] => one.as_manifest().ok_or_else(|| EngineError::WrongComponentType {
            component: component.to_string(),
            expected: "kubernetes or openshift",
        })?,
        _ => {
            return Err(EngineError::ComponentsWithSameName {
                name: component.to_string(),
            })
        }
    };

    let content = match manifest.uri.as_deref().filter(|u| !u.is_empty()) {
        Some(uri) => {
            let manifest_err = |source| EngineError::Manifest {
                component: component.to_string(),
                source,
            };
            let resolved = join_uri(location, uri).map_err(manifest_err)?;
            let raw = source.fetch(&resolved).map_err(manifest_err)?;
            String::from_utf8_lossy(&raw).into_owned()
        }
        None => manifest.inlined.clone().unwrap_or_default(),
    };
    substitute_variables(&devfile.variables, &content)
}
