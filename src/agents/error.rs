use thiserror::Error;

use super::role::Role;
use crate::prompt::TemplateError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("{role} expects {expected}")]
    InputMismatch { role: Role, expected: &'static str },

    #[error("Failed to render {role} prompt: {source}")]
    Template {
        role: Role,
        #[source]
        source: TemplateError,
    },

    #[error("{role} inference failed: {source:#}")]
    Inference {
        role: Role,
        #[source]
        source: anyhow::Error,
    },
}

impl AgentError {
    /// True when the endpoint failed, as opposed to the request never being sent.
    pub fn is_inference_failure(&self) -> bool {
        matches!(self, AgentError::Inference { .. })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            AgentError::UnknownRole(_) => None,
            AgentError::InputMismatch { role, .. }
            | AgentError::Template { role, .. }
            | AgentError::Inference { role, .. } => Some(*role),
        }
    }
}
