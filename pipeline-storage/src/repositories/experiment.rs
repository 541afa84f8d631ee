use async_trait::async_trait;
use chrono::Utc;
use pipeline_core::domain::{
    Experiment, ExperimentId, NewExperiment, EXPERIMENT_CREATED_AT_COLUMN, EXPERIMENT_ID_COLUMN,
    EXPERIMENT_NAME_COLUMN,
};
use pipeline_core::{
    CoreError, CursorValue, ListPage, PaginationContext, ResourceManager, Result,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

const SELECT_EXPERIMENTS: &str = "SELECT id, name, description, created_at FROM experiments";

/// Advisory lock key taken by every experiment insert.
const CREATE_LOCK_KEY: i64 = 0x6578_7065_7269_6d74;

pub struct ExperimentRepository {
    pool: PgPool,
}

impl ExperimentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_experiment(row: PgRow) -> Result<Experiment> {
        Ok(Experiment {
            id: ExperimentId(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Maps a context column onto the fixed set of columns this table can be
/// ordered by. Column names are spliced into SQL, so nothing else passes.
fn order_column(column: &str) -> Result<&'static str> {
    match column {
        EXPERIMENT_ID_COLUMN => Ok(EXPERIMENT_ID_COLUMN),
        EXPERIMENT_NAME_COLUMN => Ok(EXPERIMENT_NAME_COLUMN),
        EXPERIMENT_CREATED_AT_COLUMN => Ok(EXPERIMENT_CREATED_AT_COLUMN),
        other => Err(CoreError::invalid_input(format!(
            "Cannot sort experiments by column '{}'",
            other
        ))),
    }
}

fn push_cursor_value(builder: &mut QueryBuilder<'_, Postgres>, value: &CursorValue) {
    match value {
        CursorValue::Text(text) => builder.push_bind(text.clone()),
        CursorValue::Timestamp(ts) => builder.push_bind(*ts),
        CursorValue::Uuid(uuid) => builder.push_bind(*uuid),
    };
}

/// Builds the keyset query for one page:
///
/// ```sql
/// SELECT ... FROM experiments
/// WHERE (sort_col, id) > ($1, $2)
/// ORDER BY sort_col ASC, id ASC
/// LIMIT page_size + 1
/// ```
///
/// The comparison flips to `<` for descending listings.
pub(crate) fn list_query(context: &PaginationContext) -> Result<QueryBuilder<'static, Postgres>> {
    let sort_column = order_column(&context.sort.column)?;
    let key_column = order_column(&context.key_column)?;
    let direction = context.sort.direction;

    let mut builder = QueryBuilder::new(SELECT_EXPERIMENTS);

    if let Some(cursor) = &context.cursor {
        builder.push(format!(" WHERE ({}, {}) ", sort_column, key_column));
        builder.push(if direction.is_descending() { "< (" } else { "> (" });
        push_cursor_value(&mut builder, &cursor.sort_value);
        builder.push(", ");
        push_cursor_value(&mut builder, &cursor.key_value);
        builder.push(")");
    }

    builder.push(format!(
        " ORDER BY {sort} {dir}, {key} {dir} LIMIT ",
        sort = sort_column,
        key = key_column,
        dir = direction.as_sql()
    ));
    builder.push_bind(context.fetch_limit() as i64);

    Ok(builder)
}

#[async_trait]
impl ResourceManager<Experiment> for ExperimentRepository {
    async fn create(&self, draft: NewExperiment) -> Result<Experiment> {
        let experiment = Experiment::from_draft(draft, Utc::now());

        // Creation order must be total: `created_at` is bumped past the newest
        // row, and concurrent creates are serialized until commit.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CREATE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"
            INSERT INTO experiments (id, name, description, created_at)
            SELECT $1, $2, $3,
                   GREATEST(clock_timestamp(), MAX(created_at) + INTERVAL '1 microsecond')
            FROM experiments
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(experiment.id.0)
        .bind(&experiment.name)
        .bind(&experiment.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_experiment(row)
    }

    async fn get(&self, id: &ExperimentId) -> Result<Experiment> {
        let row = sqlx::query(
            "SELECT id, name, description, created_at FROM experiments WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_experiment(row),
            None => Err(CoreError::not_found(format!("Experiment {} not found", id))),
        }
    }

    async fn list(&self, context: &PaginationContext) -> Result<ListPage<Experiment>> {
        let mut query = list_query(context)?;
        let rows = query.build().fetch_all(&self.pool).await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_experiment)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListPage::from_lookahead(items, context.page_size))
    }

    async fn delete(&self, id: &ExperimentId) -> Result<()> {
        let result = sqlx::query("DELETE FROM experiments WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(format!("Experiment {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::domain::experiment_sort_fields;
    use pipeline_core::{Cursor, PageTokenCodec};
    use uuid::Uuid;

    fn context(sort_by: &str) -> PaginationContext {
        PageTokenCodec::new("repository-tests-secret")
            .decode("", sort_by, 10, &experiment_sort_fields())
            .unwrap()
    }

    #[test]
    fn test_first_page_query_has_no_predicate() {
        let query = list_query(&context("")).unwrap();
        assert_eq!(
            query.sql(),
            "SELECT id, name, description, created_at FROM experiments \
             ORDER BY created_at ASC, id ASC LIMIT $1"
        );
    }

    #[test]
    fn test_descending_resume_query_flips_comparison() {
        let ctx = context("name desc").with_cursor(Cursor::new("m", Uuid::nil()));
        let query = list_query(&ctx).unwrap();
        assert_eq!(
            query.sql(),
            "SELECT id, name, description, created_at FROM experiments \
             WHERE (name, id) < ($1, $2) ORDER BY name DESC, id DESC LIMIT $3"
        );
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut ctx = context("");
        ctx.sort.column = "name; DROP TABLE experiments".to_string();
        assert!(matches!(list_query(&ctx), Err(e) if e.is_invalid_input()));
    }
}
