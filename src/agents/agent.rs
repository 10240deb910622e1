use std::collections::HashMap;

use tracing::{error, info, instrument, warn};

use crate::console::{sanitize, OutputEncoding};
use crate::errors::ConfigResult;
use crate::llm_client::{complete, Completion, SharedLlmClient};

use super::role::Role;
use super::templates::{
    self, CARDIOLOGIST_REPORT, MEDICAL_REPORT, PSYCHOLOGIST_REPORT, PULMONOLOGIST_REPORT,
};

/// Prior specialist outputs fed to the team agent. A missing output is
/// rendered as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamInputs {
    pub cardiologist: Option<String>,
    pub psychologist: Option<String>,
    pub pulmonologist: Option<String>,
}

impl TeamInputs {
    #[allow(dead_code)]
    pub fn new(
        cardiologist: impl Into<String>,
        psychologist: impl Into<String>,
        pulmonologist: impl Into<String>,
    ) -> Self {
        Self {
            cardiologist: Some(cardiologist.into()),
            psychologist: Some(psychologist.into()),
            pulmonologist: Some(pulmonologist.into()),
        }
    }

    /// Record `output` under the specialist that produced it.
    pub fn set(&mut self, role: Role, output: Option<String>) {
        match role {
            Role::Cardiologist => self.cardiologist = output,
            Role::Psychologist => self.psychologist = output,
            Role::Pulmonologist => self.pulmonologist = output,
            Role::MultidisciplinaryTeam => {
                warn!("Team output is not an input to the team agent; ignoring")
            }
        }
    }

    fn values(&self) -> HashMap<&'static str, &str> {
        HashMap::from([
            (CARDIOLOGIST_REPORT, self.cardiologist.as_deref().unwrap_or("")),
            (PSYCHOLOGIST_REPORT, self.psychologist.as_deref().unwrap_or("")),
            (PULMONOLOGIST_REPORT, self.pulmonologist.as_deref().unwrap_or("")),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentInput {
    Report(String),
    Team(TeamInputs),
}

/// One role-bound prompt, rendered at construction and sent once by [`Agent::run`].
pub struct Agent {
    role: Role,
    prompt: String,
    model: String,
    llm_client: SharedLlmClient,
    encoding: OutputEncoding,
}

impl Agent {
    pub fn new(
        role: Role,
        input: AgentInput,
        llm_client: SharedLlmClient,
        model: impl Into<String>,
    ) -> ConfigResult<Self> {
        let prompt = Self::render(role, &input)?;

        Ok(Self {
            role,
            prompt,
            model: model.into(),
            llm_client,
            encoding: OutputEncoding::default(),
        })
    }

    pub fn specialist(
        role: Role,
        medical_report: impl Into<String>,
        llm_client: SharedLlmClient,
        model: impl Into<String>,
    ) -> ConfigResult<Self> {
        Self::new(
            role,
            AgentInput::Report(medical_report.into()),
            llm_client,
            model,
        )
    }

    pub fn team(
        inputs: TeamInputs,
        llm_client: SharedLlmClient,
        model: impl Into<String>,
    ) -> ConfigResult<Self> {
        Self::new(
            Role::MultidisciplinaryTeam,
            AgentInput::Team(inputs),
            llm_client,
            model,
        )
    }

    /// Sanitize output for a stream declaring `encoding` instead of UTF-8.
    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    fn render(role: Role, input: &AgentInput) -> ConfigResult<String> {
        let template = templates::lookup(role);
        match input {
            AgentInput::Team(inputs) => template.render(&inputs.values()),
            AgentInput::Report(report) => {
                template.render(&HashMap::from([(MEDICAL_REPORT, report.as_str())]))
            }
        }
    }

    /// Send the prompt and return the sanitized answer, or `None` when the
    /// request failed. Failures are logged, never returned.
    #[instrument(skip_all, fields(role = %self.role))]
    pub async fn run(self) -> Option<String> {
        info!("{} is running...", self.role);

        match complete(self.llm_client.as_ref(), &self.model, &self.prompt).await {
            Completion::Failed(reason) => {
                error!(role = %self.role, error = %reason, "Agent request failed");
                None
            }
            completion => {
                if matches!(completion, Completion::Degraded(_)) {
                    warn!("Response lacked message content; using fallback text");
                }
                completion
                    .into_text()
                    .map(|text| sanitize(&text, self.encoding).into_owned())
            }
        }
    }
}
