use std::fmt;
use std::str::FromStr;

use super::error::AgentError;
use crate::prompt::PromptTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Cardiologist,
    Psychologist,
    Pulmonologist,
    MultidisciplinaryTeam,
}

impl Role {
    /// Single-report roles, in the order the panel consults them.
    pub const SPECIALISTS: [Role; 3] = [
        Role::Cardiologist,
        Role::Psychologist,
        Role::Pulmonologist,
    ];

    pub const ALL: [Role; 4] = [
        Role::Cardiologist,
        Role::Psychologist,
        Role::Pulmonologist,
        Role::MultidisciplinaryTeam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cardiologist => "Cardiologist",
            Role::Psychologist => "Psychologist",
            Role::Pulmonologist => "Pulmonologist",
            Role::MultidisciplinaryTeam => "MultidisciplinaryTeam",
        }
    }

    pub fn is_specialist(&self) -> bool {
        !matches!(self, Role::MultidisciplinaryTeam)
    }

    pub fn template(&self) -> PromptTemplate {
        PromptTemplate::for_role(*self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AgentError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == raw)
            .ok_or_else(|| AgentError::UnknownRole(raw.to_string()))
    }
}

/// The three specialist outputs fed into the multidisciplinary team prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamReports {
    pub cardiologist_report: String,
    pub psychologist_report: String,
    pub pulmonologist_report: String,
}

impl TeamReports {
    pub fn new(
        cardiologist_report: impl Into<String>,
        psychologist_report: impl Into<String>,
        pulmonologist_report: impl Into<String>,
    ) -> Self {
        Self {
            cardiologist_report: cardiologist_report.into(),
            psychologist_report: psychologist_report.into(),
            pulmonologist_report: pulmonologist_report.into(),
        }
    }

    /// Absent reports become empty strings so every placeholder is still filled.
    pub fn from_optional(
        cardiologist_report: Option<String>,
        psychologist_report: Option<String>,
        pulmonologist_report: Option<String>,
    ) -> Self {
        Self {
            cardiologist_report: cardiologist_report.unwrap_or_default(),
            psychologist_report: psychologist_report.unwrap_or_default(),
            pulmonologist_report: pulmonologist_report.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentInput {
    MedicalReport(String),
    Team(TeamReports),
}

impl AgentInput {
    pub fn medical_report(report: impl Into<String>) -> Self {
        AgentInput::MedicalReport(report.into())
    }

    pub(crate) fn placeholder_values(&self) -> Vec<(&'static str, &str)> {
        match self {
            AgentInput::MedicalReport(report) => vec![("medical_report", report.as_str())],
            AgentInput::Team(reports) => vec![
                ("cardiologist_report", reports.cardiologist_report.as_str()),
                ("psychologist_report", reports.psychologist_report.as_str()),
                ("pulmonologist_report", reports.pulmonologist_report.as_str()),
            ],
        }
    }

    pub(crate) fn fits(&self, role: Role) -> bool {
        match (role, self) {
            (Role::MultidisciplinaryTeam, AgentInput::Team(_)) => true,
            (Role::MultidisciplinaryTeam, AgentInput::MedicalReport(_)) => false,
            (_, AgentInput::MedicalReport(_)) => true,
            (_, AgentInput::Team(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_parses_from_its_display_name() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().expect("parse"), role);
        }
    }

    #[test]
    fn role_names_must_match_exactly() {
        let near_misses = [
            "cardiologist",
            " Cardiologist ",
            "PSYCHOLOGIST",
            "Multidisciplinary Team",
        ];
        for raw in near_misses {
            let err = raw.parse::<Role>().expect_err("near-miss name");
            assert!(
                matches!(err, AgentError::UnknownRole(ref name) if name == raw),
                "{raw:?} accepted"
            );
        }
    }

    #[test]
    fn unknown_role_keeps_the_raw_name() {
        let err = "Dermatologist".parse::<Role>().expect_err("unknown role");
        assert!(matches!(err, AgentError::UnknownRole(ref name) if name == "Dermatologist"));
        assert_eq!(err.to_string(), "Unknown role: Dermatologist");
    }

    #[test]
    fn absent_team_reports_become_empty_strings() {
        let reports = TeamReports::from_optional(Some("cardio".into()), None, None);
        assert_eq!(reports.cardiologist_report, "cardio");
        assert_eq!(reports.psychologist_report, "");
        assert_eq!(reports.pulmonologist_report, "");
    }

    #[test]
    fn input_shape_must_match_role() {
        let single = AgentInput::medical_report("r");
        let team = AgentInput::Team(TeamReports::default());

        for role in Role::SPECIALISTS {
            assert!(single.fits(role));
            assert!(!team.fits(role));
        }
        assert!(team.fits(Role::MultidisciplinaryTeam));
        assert!(!single.fits(Role::MultidisciplinaryTeam));
    }
}
