mod agents;
mod config;
mod console;
mod errors;
mod llm_client;
mod orchestrator;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use agents::{Agent, Role, TeamInputs};
use anyhow::Context;
use clap::{Parser, Subcommand};
use config::ClientConfig;
use console::Console;
use llm_client::{build_llm_client_from_env, SharedLlmClient};
use orchestrator::CareTeamPipeline;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "medpanel",
    about = "Run a panel of specialist LLM agents over a medical report"
)]
struct Cli {
    /// Model identifier sent with every completion request.
    #[arg(long, global = true, env = "OPENROUTER_MODEL")]
    model: Option<String>,

    /// Encoding the terminal can display; unencodable characters become '?'.
    #[arg(long, global = true, env = "MEDPANEL_STDOUT_ENCODING")]
    stdout_encoding: Option<String>,

    /// Answer with an echo client instead of calling the API (no key required).
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run all three specialists, then the multidisciplinary team.
    Panel {
        /// Path to the medical report, or `-` for stdin.
        report: PathBuf,
        /// Also write the combined report to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the combined report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run a single specialist over a report.
    Agent {
        /// Cardiologist, Psychologist or Pulmonologist.
        role: Role,
        /// Path to the medical report, or `-` for stdin.
        report: PathBuf,
    },
    /// Run the multidisciplinary team over prior specialist outputs.
    Team {
        #[arg(long)]
        cardiologist: Option<PathBuf>,
        #[arg(long)]
        psychologist: Option<PathBuf>,
        #[arg(long)]
        pulmonologist: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let console =
        console::init(cli.stdout_encoding.as_deref()).context("Console initialization failed")?;
    let llm_client =
        build_llm_client_from_env(cli.offline).context("LLM client initialization failed")?;
    let model = cli.model.unwrap_or_else(ClientConfig::model_from_env);
    if model.trim().is_empty() {
        anyhow::bail!("Model identifier must not be empty");
    }

    match cli.command {
        Commands::Panel {
            report,
            output,
            json,
        } => run_panel(&console, llm_client, model, &report, output.as_deref(), json).await,
        Commands::Agent { role, report } => {
            run_agent(&console, llm_client, model, role, &report).await
        }
        Commands::Team {
            cardiologist,
            psychologist,
            pulmonologist,
        } => {
            let inputs = TeamInputs {
                cardiologist: read_optional(cardiologist.as_deref())?,
                psychologist: read_optional(psychologist.as_deref())?,
                pulmonologist: read_optional(pulmonologist.as_deref())?,
            };
            run_team(&console, llm_client, model, inputs).await
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

async fn run_panel(
    console: &Console,
    llm_client: SharedLlmClient,
    model: String,
    report_path: &Path,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let medical_report = read_report(report_path)?;
    let report = CareTeamPipeline::new(llm_client, model)
        .with_encoding(console.encoding())
        .run(&medical_report)
        .await?;

    let rendered = if json {
        serde_json::to_string_pretty(&report).context("Failed to serialize combined report")?
    } else {
        report.render()
    };

    console.print(&rendered)?;

    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, &rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Combined report written");
    }

    Ok(())
}

async fn run_agent(
    console: &Console,
    llm_client: SharedLlmClient,
    model: String,
    role: Role,
    report_path: &Path,
) -> anyhow::Result<()> {
    if !role.is_specialist() {
        anyhow::bail!("{role} reads specialist outputs; use the `team` command");
    }

    let medical_report = read_report(report_path)?;
    let agent = Agent::specialist(role, medical_report, llm_client, model)?
        .with_encoding(console.encoding());

    print_outcome(console, role, agent.run().await)
}

async fn run_team(
    console: &Console,
    llm_client: SharedLlmClient,
    model: String,
    inputs: TeamInputs,
) -> anyhow::Result<()> {
    if inputs == TeamInputs::default() {
        warn!("No specialist outputs given; the team prompt will be empty");
    }

    let agent = Agent::team(inputs, llm_client, model)?.with_encoding(console.encoding());
    print_outcome(console, Role::MultidisciplinaryTeam, agent.run().await)
}

fn print_outcome(console: &Console, role: Role, output: Option<String>) -> anyhow::Result<()> {
    match output {
        Some(text) => console.print(&format!("\n{role}:\n{text}\n"))?,
        None => warn!(%role, "No answer available"),
    }
    Ok(())
}

fn read_report(path: &Path) -> anyhow::Result<String> {
    let report = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read report from stdin")?;
        buffer
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()))?
    };

    if report.trim().is_empty() {
        anyhow::bail!("Medical report {} is empty", path.display());
    }
    Ok(report)
}

fn read_optional(path: Option<&Path>) -> anyhow::Result<Option<String>> {
    path.map(|path| {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_panel_headlessly() {
        let cli = Cli::parse_from([
            "medpanel",
            "--offline",
            "panel",
            "report.txt",
            "--output",
            "results/final_diagnosis.txt",
        ]);
        assert!(cli.offline);
        match cli.command {
            Commands::Panel { report, output, json } => {
                assert_eq!(report, PathBuf::from("report.txt"));
                assert_eq!(output, Some(PathBuf::from("results/final_diagnosis.txt")));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_role_names() {
        let cli = Cli::parse_from(["medpanel", "agent", "psych", "-"]);
        match cli.command {
            Commands::Agent { role, report } => {
                assert_eq!(role, Role::Psychologist);
                assert_eq!(report, PathBuf::from("-"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_role() {
        let err = Cli::command()
            .try_get_matches_from(["medpanel", "agent", "oncologist", "r.txt"])
            .expect_err("unknown role");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn cli_help_is_emitted_as_error_kind() {
        let err = Cli::command()
            .try_get_matches_from(["medpanel", "--help"])
            .expect_err("help should short-circuit");
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn empty_report_is_rejected() {
        let path = std::env::temp_dir().join(format!("medpanel-empty-{}.txt", std::process::id()));
        fs::write(&path, "  \n").expect("write temp report");
        let err = read_report(&path).expect_err("empty report");
        assert!(err.to_string().contains("is empty"));
        fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn offline_panel_writes_report_file() {
        let base = std::env::temp_dir().join(format!("medpanel-panel-{}", std::process::id()));
        fs::create_dir_all(&base).expect("create temp dir");
        let report_path = base.join("report.txt");
        let output_path = base.join("results").join("final_diagnosis.txt");
        fs::write(&report_path, "Patient reports palpitations").expect("write report");

        run_panel(
            &Console::new(console::OutputEncoding::Utf8),
            llm_client::EchoLlmClient::shared(),
            "test/model".to_string(),
            &report_path,
            Some(&output_path),
            false,
        )
        .await
        .expect("offline panel runs");

        let written = fs::read_to_string(&output_path).expect("report written");
        assert!(written.contains("## Final diagnosis (MultidisciplinaryTeam)"));
        assert!(written.contains("Patient reports palpitations"));
        fs::remove_dir_all(&base).ok();
    }

    #[tokio::test]
    async fn offline_panel_json_has_specialists_and_team() {
        let base = std::env::temp_dir().join(format!("medpanel-json-{}", std::process::id()));
        fs::create_dir_all(&base).expect("create temp dir");
        let report_path = base.join("report.txt");
        let output_path = base.join("final_diagnosis.json");
        fs::write(&report_path, "Wheezing after exercise").expect("write report");

        run_panel(
            &Console::new(console::OutputEncoding::Utf8),
            llm_client::EchoLlmClient::shared(),
            "test/model".to_string(),
            &report_path,
            Some(&output_path),
            true,
        )
        .await
        .expect("offline panel runs");

        let written = fs::read_to_string(&output_path).expect("report written");
        let parsed: serde_json::Value = serde_json::from_str(&written).expect("valid JSON");
        let specialists = parsed["specialists"].as_array().expect("specialists array");
        let roles: Vec<&str> = specialists
            .iter()
            .filter_map(|entry| entry["role"].as_str())
            .collect();
        assert_eq!(roles, ["Cardiologist", "Psychologist", "Pulmonologist"]);
        assert!(specialists.iter().all(|entry| entry["output"].is_string()));
        assert!(parsed["team"].is_string());
        assert_eq!(parsed["medical_report"], "Wheezing after exercise");
        fs::remove_dir_all(&base).ok();
    }
}
