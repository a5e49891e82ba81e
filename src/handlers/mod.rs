//! TR-012: Handlers shipped with the CLI.
//!
//! `DryRunHandler` records and logs every request without side effects.
//! `LocalHandler` runs exec command lines on this machine.

pub mod local;

pub use local::LocalHandler;

use crate::core::error::HandlerError;
use crate::core::types::{Command, Component};
use crate::engine::Handler;
use std::sync::Mutex;

/// A request received by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Command id
    Exec(String),
    /// Component name
    ApplyImage(String),
    /// Component name
    ApplyKubernetes(String),
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exec(id) => write!(f, "exec {}", id),
            Self::ApplyImage(name) => write!(f, "apply image {}", name),
            Self::ApplyKubernetes(name) => write!(f, "apply manifest {}", name),
        }
    }
}

/// Records requests in arrival order. Never fails.
#[derive(Debug, Default)]
pub struct DryRunHandler {
    requests: Mutex<Vec<Request>>,
}

impl DryRunHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the requests received so far.
    pub fn requests(&self) -> Vec<Request> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, request: Request) {
        tracing::info!(request = %request, "dry run");
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }
    }
}

impl Handler for DryRunHandler {
    fn apply_image(&self, component: &Component) -> Result<(), HandlerError> {
        self.record(Request::ApplyImage(component.name.clone()));
        Ok(())
    }

    fn apply_kubernetes(&self, component: &Component) -> Result<(), HandlerError> {
        self.record(Request::ApplyKubernetes(component.name.clone()));
        Ok(())
    }

    fn execute(&self, command: &Command) -> Result<(), HandlerError> {
        self.record(Request::Exec(command.id.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tr012_dry_run_records_in_order() {
        let handler = DryRunHandler::new();
        let cmd: Command =
            serde_yaml_ng::from_str("id: run\nexec: {component: c, commandLine: ./run}\n").unwrap();
        let img: Component = serde_yaml_ng::from_str("name: img\nimage: {imageName: x}\n").unwrap();
        handler.execute(&cmd).unwrap();
        handler.apply_image(&img).unwrap();
        assert_eq!(
            handler.requests(),
            vec![Request::Exec("run".into()), Request::ApplyImage("img".into())]
        );
    }

    #[test]
    fn test_tr012_request_display() {
        assert_eq!(Request::Exec("build".into()).to_string(), "exec build");
        assert_eq!(
            Request::ApplyKubernetes("deploy".into()).to_string(),
            "apply manifest deploy"
        );
    }
}
