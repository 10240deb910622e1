use std::collections::HashMap;
use std::error::Error as _;

use tera::{Context, Error as TeraError, Tera};

use crate::errors::{ConfigError, ConfigResult};

use super::role::Role;

pub const MEDICAL_REPORT: &str = "medical_report";
pub const CARDIOLOGIST_REPORT: &str = "cardiologist_report";
pub const PSYCHOLOGIST_REPORT: &str = "psychologist_report";
pub const PULMONOLOGIST_REPORT: &str = "pulmonologist_report";

#[derive(Debug)]
pub struct PromptTemplate {
    pub role: Role,
    pub text: &'static str,
    pub placeholders: &'static [&'static str],
}

static CARDIOLOGIST: PromptTemplate = PromptTemplate {
    role: Role::Cardiologist,
    text: "Act like a cardiologist. You will receive a medical report of a patient.
Task: Review the patient's cardiac workup, including ECG, blood tests, Holter monitor results, and echocardiogram.
Focus: Determine if there are any subtle signs of cardiac issues that could explain the patient's symptoms. Rule out any underlying heart conditions, such as arrhythmias or structural abnormalities, that might be missed on routine testing.
Recommendation: Provide guidance on any further cardiac testing or monitoring needed to ensure there are no hidden heart-related concerns. Suggest potential management strategies if a cardiac issue is identified.
Please only return the possible causes of the patient's symptoms as a bulleted list and the recommended next steps.
Medical Report: {{ medical_report }}",
    placeholders: &[MEDICAL_REPORT],
};

static PSYCHOLOGIST: PromptTemplate = PromptTemplate {
    role: Role::Psychologist,
    text: "Act like a psychologist. You will receive a patient's report.
Task: Review the patient's report and provide a psychological assessment.
Focus: Identify any potential mental health issues, such as anxiety, depression, or trauma, that may be affecting the patient's well-being.
Recommendation: Offer guidance on how to address these mental health concerns, including therapy, counseling, or other interventions.
Please only return the possible mental health issues as a bulleted list and the recommended next steps.
Patient's Report: {{ medical_report }}",
    placeholders: &[MEDICAL_REPORT],
};

static PULMONOLOGIST: PromptTemplate = PromptTemplate {
    role: Role::Pulmonologist,
    text: "Act like a pulmonologist. You will receive a patient's report.
Task: Review the patient's report and provide a pulmonary assessment.
Focus: Identify any potential respiratory issues, such as asthma, COPD, or lung infections, that may be affecting the patient's breathing.
Recommendation: Offer guidance on how to address these respiratory concerns, including pulmonary function tests, imaging studies, or other interventions.
Please only return the possible respiratory issues as a bulleted list and the recommended next steps.
Patient's Report: {{ medical_report }}",
    placeholders: &[MEDICAL_REPORT],
};

static MULTIDISCIPLINARY_TEAM: PromptTemplate = PromptTemplate {
    role: Role::MultidisciplinaryTeam,
    text: "Act like a multidisciplinary team of healthcare professionals.
You will receive a medical report of a patient visited by a Cardiologist, Psychologist, and Pulmonologist.
Task: Review the patient's medical report from the Cardiologist, Psychologist, and Pulmonologist, analyze them and come up with a list of 3 possible health issues of the patient, ranked from most to least likely.
Just return a list of bullet points of 3 possible health issues of the patient and for each issue provide the reason.

Cardiologist Report: {{ cardiologist_report }}
Psychologist Report: {{ psychologist_report }}
Pulmonologist Report: {{ pulmonologist_report }}",
    placeholders: &[CARDIOLOGIST_REPORT, PSYCHOLOGIST_REPORT, PULMONOLOGIST_REPORT],
};

pub fn lookup(role: Role) -> &'static PromptTemplate {
    match role {
        Role::Cardiologist => &CARDIOLOGIST,
        Role::Psychologist => &PSYCHOLOGIST,
        Role::Pulmonologist => &PULMONOLOGIST,
        Role::MultidisciplinaryTeam => &MULTIDISCIPLINARY_TEAM,
    }
}

#[allow(dead_code)]
pub fn lookup_by_name(name: &str) -> ConfigResult<&'static PromptTemplate> {
    Ok(lookup(name.parse()?))
}

impl PromptTemplate {
    /// Render with `values`. Every declared placeholder must have a value;
    /// values are inserted verbatim and never re-parsed as template syntax.
    pub fn render(&self, values: &HashMap<&str, &str>) -> ConfigResult<String> {
        if let Some(missing) = self.placeholders.iter().find(|name| !values.contains_key(*name)) {
            return Err(self.missing(missing));
        }

        let mut context = Context::new();
        for (name, value) in values {
            context.insert(*name, value);
        }

        let mut tera = Tera::default();
        tera.add_raw_template(self.role.name(), self.text)
            .map_err(|err| self.template_error(&err))?;
        tera.render(self.role.name(), &context)
            .map_err(|err| self.template_error(&err))
    }

    fn missing(&self, placeholder: &str) -> ConfigError {
        ConfigError::MissingPlaceholder {
            role: self.role.to_string(),
            placeholder: placeholder.to_string(),
        }
    }

    fn template_error(&self, err: &TeraError) -> ConfigError {
        let reason = error_chain(err);
        match undefined_variable(&reason) {
            Some(name) => self.missing(name),
            None => ConfigError::Template {
                role: self.role.to_string(),
                reason,
            },
        }
    }
}

fn error_chain(err: &TeraError) -> String {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

/// Tera reports an unset variable as "Variable `name` not found in context".
fn undefined_variable(reason: &str) -> Option<&str> {
    let start = reason.find("Variable `")? + "Variable `".len();
    let rest = &reason[start..];
    let end = rest.find('`')?;
    rest[end..]
        .contains("not found in context")
        .then(|| &rest[..end])
}
