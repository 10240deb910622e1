use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::agents::{Agent, Role, TeamInputs};
use crate::console::OutputEncoding;
use crate::errors::ConfigResult;
use crate::llm_client::SharedLlmClient;

const NO_ANSWER: &str = "[no answer available]";

#[derive(Debug, Clone, Serialize)]
pub struct SpecialistOutput {
    pub role: Role,
    pub output: Option<String>,
}

/// Everything one panel run produced. Absent outputs mark failed agents.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedReport {
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub medical_report: String,
    pub specialists: Vec<SpecialistOutput>,
    pub team: Option<String>,
}

impl CombinedReport {
    pub fn answered(&self) -> usize {
        self.specialists
            .iter()
            .filter(|entry| entry.output.is_some())
            .count()
            + usize::from(self.team.is_some())
    }

    pub fn render(&self) -> String {
        let mut sections = Vec::with_capacity(self.specialists.len() + 2);
        sections.push(format!(
            "# Care team report\nGenerated: {}\nModel: {}",
            self.generated_at.to_rfc3339(),
            self.model
        ));

        for entry in &self.specialists {
            sections.push(format!(
                "## {}\n{}",
                entry.role,
                entry.output.as_deref().unwrap_or(NO_ANSWER).trim()
            ));
        }

        sections.push(format!(
            "## Final diagnosis ({})\n{}",
            Role::MultidisciplinaryTeam,
            self.team.as_deref().unwrap_or(NO_ANSWER).trim()
        ));

        let mut rendered = sections.join("\n\n");
        rendered.push('\n');
        rendered
    }
}

/// Runs the three specialists over one report, then the team agent over
/// their outputs. Calls are strictly sequential.
pub struct CareTeamPipeline {
    llm_client: SharedLlmClient,
    model: String,
    encoding: OutputEncoding,
}

impl CareTeamPipeline {
    pub fn new(llm_client: SharedLlmClient, model: impl Into<String>) -> Self {
        Self {
            llm_client,
            model: model.into(),
            encoding: OutputEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn run(&self, medical_report: &str) -> ConfigResult<CombinedReport> {
        let mut specialists = Vec::with_capacity(Role::SPECIALISTS.len());
        let mut team_inputs = TeamInputs::default();

        for role in Role::SPECIALISTS {
            let output = self.agent(role, medical_report)?.run().await;
            team_inputs.set(role, output.clone());
            specialists.push(SpecialistOutput { role, output });
        }

        let team = Agent::team(team_inputs, self.llm_client.clone(), self.model.clone())?
            .with_encoding(self.encoding)
            .run()
            .await;

        let report = CombinedReport {
            generated_at: Utc::now(),
            model: self.model.clone(),
            medical_report: medical_report.to_string(),
            specialists,
            team,
        };
        info!(answered = report.answered(), "Care team run finished");
        Ok(report)
    }

    fn agent(&self, role: Role, medical_report: &str) -> ConfigResult<Agent> {
        Ok(Agent::specialist(
            role,
            medical_report,
            self.llm_client.clone(),
            self.model.clone(),
        )?
        .with_encoding(self.encoding))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::llm_client::tests::{FailingLlmClient, FixedLlmClient};
    use crate::llm_client::{CompletionRequest, LlmClient};

    /// Records prompts; answers with the first line of each prompt.
    #[derive(Default)]
    struct RecordingLlmClient {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlmClient {
        async fn chat(&self, request: &CompletionRequest) -> anyhow::Result<Value> {
            let prompt = request.messages[0].content.clone();
            let first_line = prompt.lines().next().unwrap_or_default().to_string();
            self.prompts.lock().expect("prompts lock").push(prompt);
            Ok(json!({ "choices": [{ "message": { "content": first_line } }] }))
        }
    }

    #[tokio::test]
    async fn specialists_run_in_order_and_feed_the_team() {
        let client = Arc::new(RecordingLlmClient::default());
        let pipeline = CareTeamPipeline::new(client.clone(), "test/model");

        let report = pipeline
            .run("Shortness of breath and chest tightness")
            .await
            .expect("pipeline runs");

        let prompts = client.prompts.lock().expect("prompts lock");
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].starts_with("Act like a cardiologist"));
        assert!(prompts[1].starts_with("Act like a psychologist"));
        assert!(prompts[2].starts_with("Act like a pulmonologist"));
        assert!(prompts[3].contains("Cardiologist Report: Act like a cardiologist"));
        assert!(prompts[3].contains("Pulmonologist Report: Act like a pulmonologist"));

        assert_eq!(report.answered(), 4);
        let roles: Vec<Role> = report.specialists.iter().map(|entry| entry.role).collect();
        assert_eq!(roles, Role::SPECIALISTS.to_vec());
    }

    #[tokio::test]
    async fn failing_agents_leave_absent_sections() {
        let pipeline = CareTeamPipeline::new(Arc::new(FailingLlmClient), "test/model");
        let report = pipeline.run("report").await.expect("pipeline still completes");

        assert_eq!(report.answered(), 0);
        assert!(report.team.is_none());
        let rendered = report.render();
        assert_eq!(rendered.matches(NO_ANSWER).count(), 4);
    }

    #[tokio::test]
    async fn rendered_report_has_a_section_per_role() {
        let pipeline =
            CareTeamPipeline::new(Arc::new(FixedLlmClient("- finding".to_string())), "m");
        let rendered = pipeline.run("report").await.expect("runs").render();

        for heading in [
            "## Cardiologist",
            "## Psychologist",
            "## Pulmonologist",
            "## Final diagnosis (MultidisciplinaryTeam)",
        ] {
            assert!(rendered.contains(heading), "missing {heading}");
        }
        assert!(!rendered.contains(NO_ANSWER));
    }
}
