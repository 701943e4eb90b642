//! Component dispatch: maps an agent-supplied component name to a renderer.
//!
//! The table is filled by the host at startup. Names are open-ended; an
//! unknown name resolves to [`Resolution::NotFound`] and renders as an inline
//! `unsupported component: <name>` line instead of failing the conversation.

mod widgets;

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a renderer rejected the props it was handed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PropsError(pub String);

impl From<serde_json::Error> for PropsError {
    fn from(error: serde_json::Error) -> Self {
        Self(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unsupported component: {0}")]
    NotFound(String),
    #[error("invalid props for {component}: {reason}")]
    InvalidProps { component: String, reason: String },
}

/// Turns a props bag into display lines.
pub trait ComponentRenderer: Send + Sync {
    fn render(&self, props: &Value) -> Result<Vec<String>, PropsError>;
}

impl<F> ComponentRenderer for F
where
    F: Fn(&Value) -> Result<Vec<String>, PropsError> + Send + Sync,
{
    fn render(&self, props: &Value) -> Result<Vec<String>, PropsError> {
        self(props)
    }
}

pub enum Resolution<'a> {
    Found(&'a dyn ComponentRenderer),
    NotFound,
}

impl Resolution<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

#[derive(Clone, Default)]
pub struct ComponentRegistry {
    renderers: HashMap<String, Arc<dyn ComponentRenderer>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with terminal renderers for `table`, `card`,
    /// `form`, `stats`, `steps` and `chart`.
    pub fn with_builtin_widgets() -> Self {
        let mut registry = Self::new();
        widgets::register_builtin(&mut registry);
        registry
    }

    /// Register `renderer` under `name`, returning any renderer it replaces.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        renderer: impl ComponentRenderer + 'static,
    ) -> Option<Arc<dyn ComponentRenderer>> {
        self.renderers.insert(name.into(), Arc::new(renderer))
    }

    pub fn resolve(&self, name: &str) -> Resolution<'_> {
        match self.renderers.get(name) {
            Some(renderer) => Resolution::Found(renderer.as_ref()),
            None => Resolution::NotFound,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn try_render(&self, component: &str, props: &Value) -> Result<Vec<String>, DispatchError> {
        match self.resolve(component) {
            Resolution::Found(renderer) => {
                renderer
                    .render(props)
                    .map_err(|error| DispatchError::InvalidProps {
                        component: component.to_string(),
                        reason: error.0,
                    })
            }
            Resolution::NotFound => Err(DispatchError::NotFound(component.to_string())),
        }
    }

    /// Always produces something displayable; dispatch failures become a
    /// single inline indicator line.
    pub fn render(&self, component: &str, props: &Value) -> Vec<String> {
        self.try_render(component, props).unwrap_or_else(|error| {
            tracing::debug!(%error, "component dispatch fell back to indicator");
            vec![error.to_string()]
        })
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names())
            .finish()
    }
}
