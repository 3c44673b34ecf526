use tracing::{debug, error, info, instrument};

use super::error::AgentError;
use super::role::{AgentInput, Role, TeamReports};
use crate::llm_client::SharedLlmClient;
use crate::prompt::PromptTemplate;

/// A role-bound prompt-and-invoke unit. Built once, run once.
pub struct Agent {
    role: Role,
    input: AgentInput,
    template: PromptTemplate,
    llm_client: SharedLlmClient,
}

impl Agent {
    pub fn new(
        role: Role,
        input: AgentInput,
        llm_client: SharedLlmClient,
    ) -> Result<Self, AgentError> {
        if !input.fits(role) {
            let expected = if role.is_specialist() {
                "a single medical report"
            } else {
                "cardiologist, psychologist, and pulmonologist reports"
            };
            return Err(AgentError::InputMismatch { role, expected });
        }

        Ok(Self {
            role,
            input,
            template: role.template(),
            llm_client,
        })
    }

    pub fn cardiologist(medical_report: impl Into<String>, llm_client: SharedLlmClient) -> Self {
        Self::specialist(Role::Cardiologist, medical_report.into(), llm_client)
    }

    pub fn psychologist(medical_report: impl Into<String>, llm_client: SharedLlmClient) -> Self {
        Self::specialist(Role::Psychologist, medical_report.into(), llm_client)
    }

    pub fn pulmonologist(medical_report: impl Into<String>, llm_client: SharedLlmClient) -> Self {
        Self::specialist(Role::Pulmonologist, medical_report.into(), llm_client)
    }

    pub fn multidisciplinary_team(reports: TeamReports, llm_client: SharedLlmClient) -> Self {
        Self {
            role: Role::MultidisciplinaryTeam,
            input: AgentInput::Team(reports),
            template: Role::MultidisciplinaryTeam.template(),
            llm_client,
        }
    }

    fn specialist(role: Role, medical_report: String, llm_client: SharedLlmClient) -> Self {
        Self {
            role,
            input: AgentInput::MedicalReport(medical_report),
            template: role.template(),
            llm_client,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The exact text that `run` sends to the model.
    pub fn prompt(&self) -> Result<String, AgentError> {
        self.template
            .format(&self.input.placeholder_values())
            .map_err(|source| AgentError::Template {
                role: self.role,
                source,
            })
    }

    #[instrument(skip_all, fields(role = %self.role))]
    pub async fn run(self) -> Result<String, AgentError> {
        info!("{} is running...", self.role);

        let prompt = self.prompt()?;
        debug!(prompt_chars = prompt.len(), "Prompt rendered");

        let role = self.role;
        self.llm_client.complete(&prompt).await.map_err(|source| {
            error!(error = %format!("{source:#}"), "Inference failed");
            AgentError::Inference { role, source }
        })
    }

    /// Like `run`, but an inference failure yields `Ok(None)` after being logged.
    /// Unknown roles, mismatched inputs, and template errors still propagate.
    pub async fn run_or_none(self) -> Result<Option<String>, AgentError> {
        match self.run().await {
            Ok(output) => Ok(Some(output)),
            Err(err) if err.is_inference_failure() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Resolve `role` by name, fill its template from `input`, and invoke the model once.
pub async fn run(
    role: &str,
    input: AgentInput,
    llm_client: SharedLlmClient,
) -> Result<String, AgentError> {
    let role: Role = role.parse()?;
    Agent::new(role, input, llm_client)?.run().await
}
