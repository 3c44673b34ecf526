use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use medpanel::{
    build_llm_client, Agent, AgentInput, EchoLlmClient, LlmBackend, LlmConfig, Panel,
    PanelReport, Role, SharedLlmClient, TeamReports,
};
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "medpanel",
    about = "Consult cardiology, psychology, and pulmonology agents on a patient report via a local LLM"
)]
struct Cli {
    /// Inference backend (overrides MEDPANEL_LLM_BACKEND).
    #[arg(long, global = true, value_enum)]
    backend: Option<LlmBackend>,

    /// Model identifier (overrides MEDPANEL_LLM_MODEL).
    #[arg(long, global = true)]
    model: Option<String>,

    /// Endpoint base URL (overrides MEDPANEL_LLM_BASE_URL / OLLAMA_HOST).
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run all three specialists on one report, then the multidisciplinary team.
    Diagnose {
        /// Path to the patient's medical report.
        report: PathBuf,

        /// Print the panel outputs as JSON instead of sections.
        #[arg(long)]
        json: bool,
    },
    /// Run a single agent and print its reply.
    Consult(RoleArgs),
    /// Print the rendered prompt for a role without contacting the model.
    Prompt(RoleArgs),
}

#[derive(Args, Debug)]
struct RoleArgs {
    /// Cardiologist, Psychologist, Pulmonologist, or MultidisciplinaryTeam.
    role: String,

    /// Medical report for the single-specialist roles.
    report: Option<PathBuf>,

    /// Cardiologist output for the team role.
    #[arg(long)]
    cardiologist: Option<PathBuf>,

    /// Psychologist output for the team role.
    #[arg(long)]
    psychologist: Option<PathBuf>,

    /// Pulmonologist output for the team role.
    #[arg(long)]
    pulmonologist: Option<PathBuf>,
}

impl RoleArgs {
    fn build_agent(&self, llm_client: SharedLlmClient) -> anyhow::Result<Agent> {
        let role: Role = self.role.parse()?;
        let input = if role.is_specialist() {
            let Some(path) = self.report.as_deref() else {
                bail!("{role} needs a report file");
            };
            AgentInput::MedicalReport(read_report(path)?)
        } else {
            AgentInput::Team(TeamReports::from_optional(
                read_optional(self.cardiologist.as_deref())?,
                read_optional(self.psychologist.as_deref())?,
                read_optional(self.pulmonologist.as_deref())?,
            ))
        };

        Ok(Agent::new(role, input, llm_client)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        backend: cli.backend,
        model: cli.model,
        base_url: cli.base_url,
    };

    let output = execute(cli.command, &overrides).await?;
    print!("{output}");
    Ok(())
}

// Only commands that contact the model resolve the endpoint configuration.
async fn execute(command: Commands, overrides: &ConfigOverrides) -> anyhow::Result<String> {
    match command {
        Commands::Diagnose { report, json } => {
            let llm_client = connect(overrides)?;
            let mut output = run_diagnose(llm_client, &report, json).await?;
            output.push('\n');
            Ok(output)
        }
        Commands::Consult(args) => {
            let agent = args.build_agent(connect(overrides)?)?;
            let role = agent.role();
            let output = agent.run().await.map_err(|err| {
                error!(%err, "Agent request failed");
                err
            })?;
            Ok(format!("\n{role}:\n{output}\n\n"))
        }
        Commands::Prompt(args) => {
            let agent = args.build_agent(EchoLlmClient::shared())?;
            Ok(agent.prompt()?)
        }
    }
}

fn connect(overrides: &ConfigOverrides) -> anyhow::Result<SharedLlmClient> {
    let config = resolve_config(overrides)?;
    build_llm_client(&config).context("LLM client initialization failed")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

#[derive(Debug, Default)]
struct ConfigOverrides {
    backend: Option<LlmBackend>,
    model: Option<String>,
    base_url: Option<String>,
}

fn resolve_config(overrides: &ConfigOverrides) -> anyhow::Result<LlmConfig> {
    let mut config = LlmConfig::from_env().context("Invalid LLM configuration")?;
    if let Some(backend) = overrides.backend {
        config = config.with_backend(backend);
    }
    if let Some(model) = overrides.model.as_deref() {
        config = config.with_model(model);
    }
    if let Some(base_url) = overrides.base_url.as_deref() {
        config = config.with_base_url(base_url);
    }
    Ok(config)
}

async fn run_diagnose(
    llm_client: SharedLlmClient,
    path: &Path,
    json: bool,
) -> anyhow::Result<String> {
    let medical_report = read_report(path)?;
    let report = Panel::new(llm_client).diagnose(&medical_report).await?;
    render_panel_report(&report, json)
}

fn render_panel_report(report: &PanelReport, json: bool) -> anyhow::Result<String> {
    if json {
        return serde_json::to_string_pretty(report).context("Failed to serialize panel report");
    }

    let mut rendered = String::new();
    for role in Role::SPECIALISTS {
        let section = report
            .specialist_output(role)
            .unwrap_or("[no response from the model]");
        rendered.push_str(&format!("\n=== {role} ===\n{section}\n"));
    }
    rendered.push_str(&format!("\n=== Final Diagnosis ===\n{}\n", report.diagnosis));

    Ok(rendered)
}

fn read_report(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read report {}", path.display()))
}

fn read_optional(path: Option<&Path>) -> anyhow::Result<Option<String>> {
    path.map(read_report).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn temp_report(name: &str, body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("medpanel-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("report.txt");
        fs::write(&path, body).expect("write report");
        path
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn diagnose_takes_a_report_path() {
        let cli = Cli::parse_from(["medpanel", "diagnose", "report.txt"]);
        assert!(matches!(
            cli.command,
            Commands::Diagnose { ref report, json: false } if report == Path::new("report.txt")
        ));
        assert!(cli.backend.is_none());
    }

    #[test]
    fn global_overrides_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "medpanel",
            "consult",
            "Cardiologist",
            "r.txt",
            "--backend",
            "echo",
            "--model",
            "llama3.1",
        ]);
        assert_eq!(cli.backend, Some(LlmBackend::Echo));
        assert_eq!(cli.model.as_deref(), Some("llama3.1"));
    }

    #[test]
    fn cli_help_is_emitted_as_error_kind() {
        let err = Cli::command()
            .try_get_matches_from(["medpanel", "--help"])
            .expect_err("help should short-circuit");
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn specialist_without_report_is_rejected() {
        let cli = Cli::parse_from(["medpanel", "prompt", "Psychologist"]);
        let Commands::Prompt(args) = cli.command else {
            panic!("expected prompt command");
        };
        let err = args
            .build_agent(EchoLlmClient::shared())
            .err()
            .expect("missing report");
        assert!(err.to_string().contains("needs a report file"));
    }

    #[test]
    fn unknown_role_surfaces_before_any_file_io() {
        let cli = Cli::parse_from(["medpanel", "consult", "Oncologist", "missing.txt"]);
        let Commands::Consult(args) = cli.command else {
            panic!("expected consult command");
        };
        let err = args
            .build_agent(EchoLlmClient::shared())
            .err()
            .expect("unknown role");
        assert_eq!(err.to_string(), "Unknown role: Oncologist");
    }

    #[test]
    fn team_prompt_reads_flagged_files_and_blanks_the_rest() {
        let cardio = temp_report("team-cardio", "Holter: frequent PVCs");
        let cardio = cardio.to_str().expect("utf-8 temp path");
        let cli = Cli::parse_from([
            "medpanel",
            "prompt",
            "MultidisciplinaryTeam",
            "--cardiologist",
            cardio,
        ]);
        let Commands::Prompt(args) = cli.command else {
            panic!("expected prompt command");
        };

        let prompt = args
            .build_agent(EchoLlmClient::shared())
            .expect("agent")
            .prompt()
            .expect("prompt");
        assert!(prompt.contains("Cardiologist Report:\nHolter: frequent PVCs\n"));
        assert!(prompt.contains("Psychologist Report:\n\n"));
        assert!(!prompt.contains("{pulmonologist_report}"));
    }

    #[tokio::test]
    async fn diagnose_runs_end_to_end_against_echo() {
        let path = temp_report("diagnose", "SpO2 91% at rest");
        let output = run_diagnose(EchoLlmClient::shared(), &path, false)
            .await
            .expect("diagnose");

        assert!(output.contains("\n=== Cardiologist ===\n"));
        assert!(output.contains("\n=== Final Diagnosis ===\n"));
        assert!(output.contains("SpO2 91% at rest"));
    }

    #[tokio::test]
    async fn diagnose_json_parses_back_into_a_panel_report() {
        let path = temp_report("diagnose-json", "Wheezing after exertion");
        let cli = Cli::parse_from(["medpanel", "diagnose", "--json", "report.txt"]);
        assert!(matches!(cli.command, Commands::Diagnose { json: true, .. }));

        let output = run_diagnose(EchoLlmClient::shared(), &path, true)
            .await
            .expect("diagnose");
        let report: PanelReport = serde_json::from_str(&output).expect("valid json");

        for role in Role::SPECIALISTS {
            let section = report.specialist_output(role).expect("specialist answered");
            assert!(section.contains("Wheezing after exertion"), "role {role}");
        }
        assert!(report
            .diagnosis
            .starts_with("\nAct like a multidisciplinary team"));
    }

    #[tokio::test]
    async fn prompt_ignores_endpoint_configuration() {
        let path = temp_report("prompt-bad-env", "Resting HR 110");
        let report = path.to_str().expect("utf-8 temp path");
        // Only this test touches the process environment.
        std::env::set_var("MEDPANEL_LLM_BACKEND", "bedrock");

        let prompt_cli = Cli::parse_from(["medpanel", "prompt", "Cardiologist", report]);
        let rendered = execute(prompt_cli.command, &ConfigOverrides::default()).await;

        let consult_cli = Cli::parse_from(["medpanel", "consult", "Cardiologist", report]);
        let consulted = execute(consult_cli.command, &ConfigOverrides::default()).await;

        std::env::remove_var("MEDPANEL_LLM_BACKEND");

        let rendered = rendered.expect("prompt needs no endpoint");
        assert!(rendered.contains("Medical Report:\nResting HR 110\n"));

        let err = consulted.expect_err("consult needs a valid backend");
        assert!(format!("{err:#}").contains("bedrock"));
    }
}
