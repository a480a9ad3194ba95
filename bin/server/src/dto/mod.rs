use serde::Serialize;

use graphboot_core::{ConditionOutcome, Registration};

/// A bound component as listed by `/api/components`
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub type_name: String,
}

impl From<&Registration> for ComponentSummary {
    fn from(registration: &Registration) -> Self {
        Self {
            id: registration.id().to_string(),
            aliases: registration.aliases().to_vec(),
            type_name: registration.type_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentList {
    pub components: Vec<ComponentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionReport {
    pub outcomes: Vec<ConditionOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}
