//! In-process experiment store.
//!
//! Backs the `memory` storage mode and the test suites. Listing sorts a
//! snapshot taken under the read lock, so concurrent writers never observe a
//! half-built page.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use pipeline_core::domain::{Experiment, ExperimentId, NewExperiment};
use pipeline_core::{
    CoreError, CursorValue, ListPage, PaginationContext, Resource, ResourceManager, Result,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    experiments: HashMap<ExperimentId, Experiment>,
    last_created_at: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Creation timestamps are strictly increasing and carry microsecond
    /// precision, the same as a PostgreSQL `TIMESTAMPTZ`.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let stamp = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(stamp);
        stamp
    }
}

#[derive(Debug, Default)]
pub struct InMemoryExperimentStore {
    state: RwLock<StoreState>,
}

impl InMemoryExperimentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.experiments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn position(
    experiment: &Experiment,
    context: &PaginationContext,
) -> Result<(CursorValue, CursorValue)> {
    let unsupported = |column: &str| {
        CoreError::invalid_input(format!("Cannot sort experiments by column '{}'", column))
    };
    let sort_value = experiment
        .cursor_value(&context.sort.column)
        .ok_or_else(|| unsupported(&context.sort.column))?;
    let key_value = experiment
        .cursor_value(&context.key_column)
        .ok_or_else(|| unsupported(&context.key_column))?;
    Ok((sort_value, key_value))
}

#[async_trait]
impl ResourceManager<Experiment> for InMemoryExperimentStore {
    async fn create(&self, draft: NewExperiment) -> Result<Experiment> {
        let mut state = self.state.write().await;
        let created_at = state.next_created_at();
        let experiment = Experiment::from_draft(draft, created_at);

        if state.experiments.contains_key(&experiment.id) {
            return Err(CoreError::internal(format!(
                "Experiment id {} already assigned",
                experiment.id
            )));
        }
        state.experiments.insert(experiment.id, experiment.clone());

        tracing::debug!(experiment_id = %experiment.id, "Stored experiment in memory");
        Ok(experiment)
    }

    async fn get(&self, id: &ExperimentId) -> Result<Experiment> {
        self.state
            .read()
            .await
            .experiments
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("Experiment {} not found", id)))
    }

    async fn list(&self, context: &PaginationContext) -> Result<ListPage<Experiment>> {
        let state = self.state.read().await;

        let mut candidates = Vec::with_capacity(state.experiments.len());
        for experiment in state.experiments.values() {
            let (sort_value, key_value) = position(experiment, context)?;
            if context.is_after_cursor(&sort_value, &key_value) {
                candidates.push((sort_value, key_value, experiment.clone()));
            }
        }
        drop(state);

        candidates.sort_by(|a, b| context.compare((&a.0, &a.1), (&b.0, &b.1)));

        let items = candidates
            .into_iter()
            .take(context.fetch_limit())
            .map(|(_, _, experiment)| experiment)
            .collect();

        Ok(ListPage::from_lookahead(items, context.page_size))
    }

    async fn delete(&self, id: &ExperimentId) -> Result<()> {
        match self.state.write().await.experiments.remove(id) {
            Some(_) => {
                tracing::debug!(experiment_id = %id, "Removed experiment from memory");
                Ok(())
            }
            None => Err(CoreError::not_found(format!("Experiment {} not found", id))),
        }
    }
}
