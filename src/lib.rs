//! Role-based prompt dispatch for a local language model.
//!
//! Each [`Agent`] fills a fixed specialist template with patient report text and sends it
//! to the configured inference endpoint. [`Panel`] runs the cardiologist, psychologist,
//! and pulmonologist in turn and hands their answers to the multidisciplinary team.

pub mod agents;
pub mod config;
pub mod llm_client;
pub mod prompt;

pub use agents::{run, Agent, AgentError, AgentInput, Panel, PanelReport, Role, TeamReports};
pub use config::{LlmBackend, LlmConfig};
pub use llm_client::{build_llm_client, EchoLlmClient, LlmClient, SharedLlmClient};
pub use prompt::{PromptTemplate, TemplateError};
