//! TR-008: Component model.
//!
//! A validated view over one component. Construction checks the fields its
//! variant requires; `apply` dispatches to the handler.

use super::Handler;
use crate::core::error::EngineError;
use crate::core::types::{Component, ComponentKind};

#[derive(Debug, Clone, Copy)]
pub struct ComponentModel<'a> {
    component: &'a Component,
}

impl<'a> ComponentModel<'a> {
    pub fn new(component: &'a Component) -> Result<Self, EngineError> {
        let model = Self { component };
        model.check_validity()?;
        Ok(model)
    }

    pub fn component(&self) -> &'a Component {
        self.component
    }

    pub fn check_validity(&self) -> Result<(), EngineError> {
        let invalid = |reason: &str| EngineError::InvalidComponent {
            name: self.component.name.clone(),
            reason: reason.to_string(),
        };
        match &self.component.kind {
            ComponentKind::Container(c) => {
                if is_blank(&c.image) {
                    return Err(invalid("container component requires an image"));
                }
            }
            ComponentKind::Kubernetes(m) | ComponentKind::Openshift(m) => {
                match (is_blank(&m.uri), is_blank(&m.inlined)) {
                    (true, true) => return Err(invalid("manifest requires either uri or inlined")),
                    (false, false) => {
                        return Err(invalid("manifest sets both uri and inlined; only one is allowed"))
                    }
                    _ => {}
                }
            }
            ComponentKind::Image(i) => {
                if is_blank(&i.image_name) {
                    return Err(invalid("image component requires an imageName"));
                }
                if let Some(dockerfile) = &i.dockerfile {
                    if is_blank(&dockerfile.uri) {
                        return Err(invalid("dockerfile requires a uri"));
                    }
                }
            }
            ComponentKind::Volume(_) => {}
        }
        Ok(())
    }

    /// Containers and volumes are realized with the workload and need no
    /// action here.
    pub fn apply(&self, handler: &dyn Handler) -> Result<(), EngineError> {
        match &self.component.kind {
            ComponentKind::Container(_) | ComponentKind::Volume(_) => Ok(()),
            ComponentKind::Kubernetes(_) | ComponentKind::Openshift(_) => {
                tracing::info!(component = %self.component.name, "applying manifest");
                handler
                    .apply_kubernetes(self.component)
                    .map_err(EngineError::Handler)
            }
            ComponentKind::Image(_) => {
                tracing::info!(component = %self.component.name, "applying image");
                handler.apply_image(self.component).map_err(EngineError::Handler)
            }
        }
    }
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
