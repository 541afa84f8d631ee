use chrono::{DateTime, Utc};
use pipeline_core::domain::{Experiment, NewExperiment};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::server::{ListRequest, ListResponse};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateExperimentRequest {
    /// Missing names deserialize as empty and are rejected by validation.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateExperimentRequest> for NewExperiment {
    fn from(request: CreateExperimentRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Experiment> for ExperimentResponse {
    fn from(exp: Experiment) -> Self {
        Self {
            id: exp.id.0,
            name: exp.name,
            description: exp.description,
            created_at: exp.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListExperimentsQuery {
    #[serde(default)]
    pub page_token: String,
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub sort_by: String,
}

impl From<ListExperimentsQuery> for ListRequest {
    fn from(query: ListExperimentsQuery) -> Self {
        Self {
            page_token: query.page_token,
            page_size: query.page_size,
            sort_by: query.sort_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListExperimentsResponse {
    pub experiments: Vec<ExperimentResponse>,
    pub next_page_token: String,
}

impl From<ListResponse<Experiment>> for ListExperimentsResponse {
    fn from(page: ListResponse<Experiment>) -> Self {
        Self {
            experiments: page.items.into_iter().map(ExperimentResponse::from).collect(),
            next_page_token: page.next_page_token,
        }
    }
}
