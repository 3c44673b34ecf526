use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::agent::Agent;
use super::error::AgentError;
use super::role::{AgentInput, Role, TeamReports};
use crate::llm_client::SharedLlmClient;

/// Outputs of one panel session. A specialist that failed to answer is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelReport {
    pub cardiologist: Option<String>,
    pub psychologist: Option<String>,
    pub pulmonologist: Option<String>,
    pub diagnosis: String,
}

impl PanelReport {
    pub fn specialist_output(&self, role: Role) -> Option<&str> {
        match role {
            Role::Cardiologist => self.cardiologist.as_deref(),
            Role::Psychologist => self.psychologist.as_deref(),
            Role::Pulmonologist => self.pulmonologist.as_deref(),
            Role::MultidisciplinaryTeam => Some(self.diagnosis.as_str()),
        }
    }

    fn record(&mut self, role: Role, output: Option<String>) {
        match role {
            Role::Cardiologist => self.cardiologist = output,
            Role::Psychologist => self.psychologist = output,
            Role::Pulmonologist => self.pulmonologist = output,
            Role::MultidisciplinaryTeam => self.diagnosis = output.unwrap_or_default(),
        }
    }

    pub fn team_reports(&self) -> TeamReports {
        TeamReports::from_optional(
            self.cardiologist.clone(),
            self.psychologist.clone(),
            self.pulmonologist.clone(),
        )
    }
}

/// Consults every specialist on the same report, then asks the multidisciplinary team.
pub struct Panel {
    llm_client: SharedLlmClient,
}

impl Panel {
    pub fn new(llm_client: SharedLlmClient) -> Self {
        Self { llm_client }
    }

    #[instrument(skip_all, fields(report_chars = medical_report.len()))]
    pub async fn diagnose(&self, medical_report: &str) -> Result<PanelReport, AgentError> {
        let mut report = PanelReport::default();

        for role in Role::SPECIALISTS {
            let agent = Agent::new(
                role,
                AgentInput::medical_report(medical_report),
                self.llm_client.clone(),
            )?;
            let output = agent.run_or_none().await?;
            if output.is_none() {
                warn!(%role, "No specialist output; team will see an empty report");
            }
            report.record(role, output);
        }

        let answered = Role::SPECIALISTS
            .iter()
            .filter(|role| report.specialist_output(**role).is_some())
            .count();
        info!(answered, "Specialists finished; convening multidisciplinary team");

        let team = Agent::multidisciplinary_team(report.team_reports(), self.llm_client.clone());
        let diagnosis = team.run().await?;
        report.record(Role::MultidisciplinaryTeam, Some(diagnosis));

        Ok(report)
    }
}
