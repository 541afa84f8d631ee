use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ids::ExperimentId;
use crate::error::{CoreError, Result};
use crate::pagination::{CursorValue, SortFields};
use crate::traits::Resource;

// ===== Storage columns =====

pub const EXPERIMENT_ID_COLUMN: &str = "id";
pub const EXPERIMENT_NAME_COLUMN: &str = "name";
pub const EXPERIMENT_CREATED_AT_COLUMN: &str = "created_at";

/// Sortable experiment fields. Listings default to creation order.
pub fn experiment_sort_fields() -> SortFields {
    SortFields::new(Experiment::COLLECTION, "id", EXPERIMENT_ID_COLUMN)
        .with_field("name", EXPERIMENT_NAME_COLUMN)
        .with_field("created_at", EXPERIMENT_CREATED_AT_COLUMN)
        .with_default("created_at")
}

// ===== Experiment Domain Model =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    pub id: ExperimentId,

    pub name: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Experiment {
    /// Materializes a draft with a fresh id.
    pub fn from_draft(draft: NewExperiment, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ExperimentId::new(),
            name: draft.name,
            description: draft.description,
            created_at,
        }
    }
}

// ===== Creation candidate =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct NewExperiment {
    #[validate(length(max = 255))]
    pub name: String,

    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

impl NewExperiment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Resource for Experiment {
    type Id = ExperimentId;
    type Draft = NewExperiment;

    const KIND: &'static str = "experiment";
    const COLLECTION: &'static str = "experiments";

    fn validate_draft(draft: &NewExperiment) -> Result<()> {
        if draft.name.is_empty() {
            return Err(CoreError::invalid_input(
                "Experiment name is empty. Please specify a valid experiment name.",
            ));
        }
        draft.validate()?;
        Ok(())
    }

    fn sort_fields() -> SortFields {
        experiment_sort_fields()
    }

    fn cursor_value(&self, column: &str) -> Option<CursorValue> {
        match column {
            EXPERIMENT_ID_COLUMN => Some(CursorValue::Uuid(self.id.0)),
            EXPERIMENT_NAME_COLUMN => Some(CursorValue::Text(self.name.clone())),
            EXPERIMENT_CREATED_AT_COLUMN => Some(CursorValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_draft_assigns_identity() {
        let now = Utc::now();
        let a = Experiment::from_draft(NewExperiment::new("a"), now);
        let b = Experiment::from_draft(NewExperiment::new("a"), now);

        assert_eq!(a.name, "a");
        assert_eq!(a.created_at, now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = Experiment::validate_draft(&NewExperiment::default()).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("Experiment name is empty"));
    }

    #[test]
    fn test_overlong_fields_are_rejected() {
        let draft = NewExperiment::new("x".repeat(256));
        assert!(Experiment::validate_draft(&draft).unwrap_err().is_invalid_input());

        let draft = NewExperiment::new("ok").with_description("d".repeat(1025));
        assert!(Experiment::validate_draft(&draft).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_cursor_values_cover_sort_fields() {
        let experiment = Experiment::from_draft(NewExperiment::new("exp"), Utc::now());
        let fields = experiment_sort_fields();

        for field in fields.field_names() {
            let column = fields.column_for(field).unwrap();
            assert!(experiment.cursor_value(column).is_some(), "no cursor value for {}", column);
        }
        assert!(experiment.cursor_value("description").is_none());
    }
}
