use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::ConfigError;

/// Persona an agent speaks as. The first three are specialists reading the
/// raw report; `MultidisciplinaryTeam` reads their outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Cardiologist,
    Psychologist,
    Pulmonologist,
    MultidisciplinaryTeam,
}

impl Role {
    pub const SPECIALISTS: [Role; 3] = [Role::Cardiologist, Role::Psychologist, Role::Pulmonologist];

    pub fn name(self) -> &'static str {
        match self {
            Role::Cardiologist => "Cardiologist",
            Role::Psychologist => "Psychologist",
            Role::Pulmonologist => "Pulmonologist",
            Role::MultidisciplinaryTeam => "MultidisciplinaryTeam",
        }
    }

    pub fn is_specialist(self) -> bool {
        !matches!(self, Role::MultidisciplinaryTeam)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cardiologist" | "cardio" => Ok(Role::Cardiologist),
            "psychologist" | "psych" => Ok(Role::Psychologist),
            "pulmonologist" | "pulmo" => Ok(Role::Pulmonologist),
            "multidisciplinaryteam" | "multidisciplinary-team" | "team" => {
                Ok(Role::MultidisciplinaryTeam)
            }
            _ => Err(ConfigError::UnknownRole(raw.to_string())),
        }
    }
}
