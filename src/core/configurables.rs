//! TR-006: Configurable parameters and container mutators.
//!
//! Typed mutators scan every component and change container components in
//! place. Each one validates its whole input before touching the document.
//! `PARAMETERS` is the static registry behind `config set/unset/list`.

use super::error::{ConfigError, ParseError};
use super::parser::{parse_devfile_file, write_devfile};
use super::types::{Devfile, Endpoint, EnvVar};
use std::path::{Path, PathBuf};

/// Protocol assumed for an existing endpoint that declares none.
const DEFAULT_ENDPOINT_PROTOCOL: &str = "http";

/// A configurable devfile parameter.
pub struct Parameter {
    pub name: &'static str,
    pub description: &'static str,
    pub getter: fn(&Devfile) -> Option<String>,
    pub setter: fn(&mut Devfile, &str) -> Result<(), ConfigError>,
    pub deleter: fn(&mut Devfile),
    pub is_set: fn(&Devfile) -> bool,
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter").field("name", &self.name).finish()
    }
}

/// Supported parameters, sorted by name.
pub static PARAMETERS: &[Parameter] = &[
    Parameter {
        name: "Memory",
        description: "The Maximum memory all the component containers can consume",
        getter: |d| d.memory_limit().map(str::to_string),
        setter: |d, v| {
            d.set_memory_limit_on_all_containers(v);
            Ok(())
        },
        deleter: |d| d.set_memory_limit_on_all_containers(""),
        is_set: |d| d.memory_limit().is_some(),
    },
    Parameter {
        name: "Name",
        description: "The name of the component",
        getter: |d| d.metadata.name.clone(),
        setter: |d, v| {
            d.set_name(v);
            Ok(())
        },
        deleter: |d| d.set_name(""),
        is_set: |d| d.metadata.name.as_deref().is_some_and(|n| !n.is_empty()),
    },
    Parameter {
        name: "Ports",
        description: "Ports to be opened in all component containers",
        getter: |d| {
            let ports: Vec<String> = d
                .containers()
                .flat_map(|(_, c)| c.endpoints.iter())
                .map(|e| match &e.protocol {
                    Some(p) => format!("{}/{}", e.target_port, p),
                    None => e.target_port.to_string(),
                })
                .collect();
            (!ports.is_empty()).then(|| ports.join(","))
        },
        setter: |d, v| {
            let ports: Vec<&str> = v.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
            d.add_ports(&ports)
        },
        deleter: Devfile::remove_ports,
        is_set: Devfile::has_ports,
    },
];

/// Case-insensitive parameter lookup.
pub fn parameter(name: &str) -> Result<&'static Parameter, ConfigError> {
    PARAMETERS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ConfigError::UnknownParameter(name.to_string()))
}

/// Parse `<port>[/tcp|/udp]` into an endpoint named `port-<n>-<proto>`.
pub fn parse_port(spec: &str) -> Result<Endpoint, ConfigError> {
    let parts: Vec<&str> = spec.trim().split('/').collect();
    if parts.len() > 2 {
        return Err(ConfigError::InvalidPort(spec.to_string()));
    }
    let port: u16 = parts[0]
        .parse()
        .map_err(|_| ConfigError::InvalidPort(spec.to_string()))?;
    let protocol = match parts.get(1).map(|p| p.to_ascii_lowercase()) {
        None => "tcp".to_string(),
        Some(p) if p == "tcp" || p == "udp" => p,
        Some(p) => return Err(ConfigError::InvalidProtocol(p)),
    };
    Ok(Endpoint {
        name: format!("port-{}-{}", port, protocol),
        target_port: port,
        protocol: Some(protocol),
        ..Endpoint::default()
    })
}

/// Parse `KEY=VALUE` pairs.
pub fn parse_env_vars(pairs: &[&str]) -> Result<Vec<EnvVar>, ConfigError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(EnvVar::new(key, value)),
            _ => Err(ConfigError::MalformedEnvVar(pair.to_string())),
        })
        .collect()
}

impl Devfile {
    /// Set `metadata.name`; an empty name clears it.
    pub fn set_name(&mut self, name: &str) {
        self.metadata.name = (!name.is_empty()).then(|| name.to_string());
    }

    /// Set the memory limit of every container; empty clears it.
    pub fn set_memory_limit_on_all_containers(&mut self, memory: &str) {
        let value = (!memory.is_empty()).then(|| memory.to_string());
        for component in &mut self.components {
            if let Some(container) = component.as_container_mut() {
                container.memory_limit = value.clone();
            }
        }
    }

    /// First non-empty container memory limit.
    pub fn memory_limit(&self) -> Option<&str> {
        self.containers()
            .find_map(|(_, c)| c.memory_limit.as_deref().filter(|m| !m.is_empty()))
    }

    /// Open ports on every container. All specs are parsed before any
    /// container changes.
    pub fn add_ports(&mut self, ports: &[&str]) -> Result<(), ConfigError> {
        let endpoints = ports
            .iter()
            .map(|p| parse_port(p))
            .collect::<Result<Vec<_>, _>>()?;
        for component in &mut self.components {
            if let Some(container) = component.as_container_mut() {
                for endpoint in &endpoints {
                    let present = container.endpoints.iter().any(|existing| {
                        let protocol = existing
                            .protocol
                            .as_deref()
                            .unwrap_or(DEFAULT_ENDPOINT_PROTOCOL);
                        existing.target_port == endpoint.target_port
                            && endpoint.protocol.as_deref() == Some(protocol)
                    });
                    if !present {
                        container.endpoints.push(endpoint.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove all endpoints from every container.
    pub fn remove_ports(&mut self) {
        for component in &mut self.components {
            if let Some(container) = component.as_container_mut() {
                container.endpoints.clear();
            }
        }
    }

    pub fn has_ports(&self) -> bool {
        self.containers().any(|(_, c)| !c.endpoints.is_empty())
    }

    /// Add or update env vars on every container. The last value for a
    /// repeated name wins.
    pub fn add_env_vars(&mut self, vars: &[EnvVar]) {
        for component in &mut self.components {
            if let Some(container) = component.as_container_mut() {
                for var in vars {
                    match container.env.iter_mut().find(|e| e.name == var.name) {
                        Some(existing) => existing.value = var.value.clone(),
                        None => container.env.push(var.clone()),
                    }
                }
            }
        }
    }

    /// Remove env vars from every container. Fails without changes if any
    /// container lacks one of the keys.
    pub fn remove_env_vars(&mut self, keys: &[&str]) -> Result<(), ConfigError> {
        for (component, container) in self.containers() {
            if let Some(missing) = keys
                .iter()
                .find(|k| !container.env.iter().any(|e| e.name == **k))
            {
                return Err(ConfigError::EnvVarNotFound {
                    key: missing.to_string(),
                    component: component.name.clone(),
                });
            }
        }
        for component in &mut self.components {
            if let Some(container) = component.as_container_mut() {
                container.env.retain(|e| !keys.contains(&e.name.as_str()));
            }
        }
        Ok(())
    }
}

/// A devfile bound to the file it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct DevfileObj {
    pub path: Option<PathBuf>,
    pub data: Devfile,
}

impl DevfileObj {
    pub fn new(path: impl Into<PathBuf>, data: Devfile) -> Self {
        Self {
            path: Some(path.into()),
            data,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ParseError> {
        Ok(Self::new(path, parse_devfile_file(path)?))
    }

    /// Write the document back atomically.
    pub fn write_yaml(&self) -> Result<(), ConfigError> {
        let path = self.path.as_deref().ok_or(ConfigError::NoPath)?;
        write_devfile(path, &self.data)?;
        tracing::debug!(path = %path.display(), "devfile written");
        Ok(())
    }

    /// Apply `change` to a copy, persist it, then keep it. On error the
    /// in-memory document is untouched.
    fn update(
        &mut self,
        change: impl FnOnce(&mut Devfile) -> Result<(), ConfigError>,
    ) -> Result<(), ConfigError> {
        let mut next = self.data.clone();
        change(&mut next)?;
        let staged = Self {
            path: self.path.clone(),
            data: next,
        };
        staged.write_yaml()?;
        *self = staged;
        Ok(())
    }

    pub fn set_configuration(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let param = parameter(name)?;
        self.update(|d| (param.setter)(d, value))
    }

    pub fn delete_configuration(&mut self, name: &str) -> Result<(), ConfigError> {
        let param = parameter(name)?;
        self.update(|d| {
            (param.deleter)(d);
            Ok(())
        })
    }

    /// Unknown parameters are never set.
    pub fn is_set(&self, name: &str) -> bool {
        parameter(name).is_ok_and(|p| (p.is_set)(&self.data))
    }

    pub fn get_configuration(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok((parameter(name)?.getter)(&self.data))
    }

    pub fn add_env_vars(&mut self, vars: &[EnvVar]) -> Result<(), ConfigError> {
        self.update(|d| {
            d.add_env_vars(vars);
            Ok(())
        })
    }

    pub fn remove_env_vars(&mut self, keys: &[&str]) -> Result<(), ConfigError> {
        self.update(|d| d.remove_env_vars(keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_devfile;

    const DOC: &str = r#"
schemaVersion: 2.2.0
metadata:
  name: app
components:
  - name: web
    container:
      image: nginx
      env:
        - {name: MODE, value: dev}
      endpoints:
        - name: http
          targetPort: 8080
  - name: worker
    container:
      image: worker
      env:
        - {name: MODE, value: dev}
        - {name: QUEUE, value: jobs}
  - name: data
    volume: {}
"#;

    fn doc() -> Devfile {
        parse_devfile(DOC.as_bytes()).unwrap()
    }

    #[test]
    fn test_tr006_parse_port() {
        let ep = parse_port("9090/UDP").unwrap();
        assert_eq!(ep.name, "port-9090-udp");
        assert_eq!(ep.target_port, 9090);
        assert_eq!(ep.protocol.as_deref(), Some("udp"));
        assert_eq!(parse_port("3000").unwrap().name, "port-3000-tcp");
        assert!(matches!(parse_port("abc"), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(parse_port("80/sctp"), Err(ConfigError::InvalidProtocol(_))));
        assert!(matches!(parse_port("80/tcp/x"), Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_tr006_add_ports_all_or_nothing() {
        let mut d = doc();
        let before = d.clone();
        assert!(d.add_ports(&["3000", "bogus"]).is_err());
        assert_eq!(d, before);

        d.add_ports(&["3000", "4000/udp"]).unwrap();
        let web = d.component("web").unwrap().as_container().unwrap();
        let names: Vec<_> = web.endpoints.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["http", "port-3000-tcp", "port-4000-udp"]);
        let worker = d.component("worker").unwrap().as_container().unwrap();
        assert_eq!(worker.endpoints.len(), 2);
    }

    #[test]
    fn test_tr006_add_ports_dedup() {
        let mut d = doc();
        d.add_ports(&["3000"]).unwrap();
        d.add_ports(&["3000/tcp"]).unwrap();
        let worker = d.component("worker").unwrap().as_container().unwrap();
        assert_eq!(worker.endpoints.len(), 1);
    }

    #[test]
    fn test_tr006_remove_ports() {
        let mut d = doc();
        assert!(d.has_ports());
        d.remove_ports();
        assert!(!d.has_ports());
    }

    #[test]
    fn test_tr006_memory() {
        let mut d = doc();
        assert_eq!(d.memory_limit(), None);
        d.set_memory_limit_on_all_containers("1Gi");
        assert_eq!(d.memory_limit(), Some("1Gi"));
        assert!(d
            .containers()
            .all(|(_, c)| c.memory_limit.as_deref() == Some("1Gi")));
        d.set_memory_limit_on_all_containers("");
        assert_eq!(d.memory_limit(), None);
    }

    #[test]
    fn test_tr006_env_vars() {
        let mut d = doc();
        d.add_env_vars(&[EnvVar::new("MODE", "prod"), EnvVar::new("LOG", "info")]);
        let web = d.component("web").unwrap().as_container().unwrap();
        assert_eq!(
            web.env,
            vec![EnvVar::new("MODE", "prod"), EnvVar::new("LOG", "info")]
        );

        let before = d.clone();
        match d.remove_env_vars(&["QUEUE"]) {
            Err(ConfigError::EnvVarNotFound { key, component }) => {
                assert_eq!(key, "QUEUE");
                assert_eq!(component, "web");
            }
            other => panic!("expected EnvVarNotFound, got {:?}", other),
        }
        assert_eq!(d, before);

        d.remove_env_vars(&["MODE"]).unwrap();
        let worker = d.component("worker").unwrap().as_container().unwrap();
        assert_eq!(worker.env, vec![EnvVar::new("QUEUE", "jobs"), EnvVar::new("LOG", "info")]);
    }

    #[test]
    fn test_tr006_parse_env_vars() {
        let vars = parse_env_vars(&["A=1", "B=x=y"]).unwrap();
        assert_eq!(vars, vec![EnvVar::new("A", "1"), EnvVar::new("B", "x=y")]);
        assert!(parse_env_vars(&["novalue"]).is_err());
        assert!(parse_env_vars(&["=v"]).is_err());
    }

    #[test]
    fn test_tr006_registry_lookup() {
        assert_eq!(parameter("ports").unwrap().name, "Ports");
        assert_eq!(parameter("MEMORY").unwrap().name, "Memory");
        assert!(matches!(parameter("cpu"), Err(ConfigError::UnknownParameter(_))));
        let names: Vec<_> = PARAMETERS.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Memory", "Name", "Ports"]);
    }

    #[test]
    fn test_tr006_devfile_obj_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devfile.yaml");
        std::fs::write(&path, DOC).unwrap();

        let mut obj = DevfileObj::load(&path).unwrap();
        assert!(obj.is_set("name"));
        assert!(!obj.is_set("memory"));
        assert!(!obj.is_set("cpu"));

        obj.set_configuration("Memory", "512Mi").unwrap();
        obj.set_configuration("ports", "3000,4000/udp").unwrap();
        obj.delete_configuration("name").unwrap();

        let reloaded = DevfileObj::load(&path).unwrap();
        assert_eq!(reloaded, obj);
        assert!(reloaded.is_set("memory"));
        assert!(!reloaded.is_set("name"));
        assert_eq!(
            reloaded.get_configuration("ports").unwrap().as_deref(),
            Some("8080,3000/tcp,4000/udp,3000/tcp,4000/udp")
        );
    }

    #[test]
    fn test_tr006_failed_update_leaves_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devfile.yaml");
        std::fs::write(&path, DOC).unwrap();
        let mut obj = DevfileObj::load(&path).unwrap();
        let before = obj.clone();

        assert!(obj.set_configuration("ports", "99999").is_err());
        assert!(matches!(
            obj.set_configuration("cpu", "2"),
            Err(ConfigError::UnknownParameter(_))
        ));
        assert_eq!(obj, before);
        assert_eq!(DevfileObj::load(&path).unwrap(), before);
    }

    #[test]
    fn test_tr006_write_without_path() {
        let obj = DevfileObj {
            path: None,
            data: doc(),
        };
        assert!(matches!(obj.write_yaml(), Err(ConfigError::NoPath)));
    }
}
