use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::pagination::{CursorValue, ListPage, PaginationContext, SortFields};

/// A resource kind served through the generic create/get/list/delete surface.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Parsed from the opaque id string clients send.
    type Id: fmt::Display + fmt::Debug + FromStr + Send + Sync;

    /// Creation candidate; the manager assigns identity and timestamps.
    type Draft: fmt::Debug + Send + Sync;

    /// Singular name used in messages, e.g. `experiment`.
    const KIND: &'static str;

    /// Collection name used in messages and page tokens, e.g. `experiments`.
    const COLLECTION: &'static str;

    /// Checks a creation candidate before it reaches storage.
    fn validate_draft(draft: &Self::Draft) -> Result<()>;

    /// Default sortable field mapping for this kind.
    fn sort_fields() -> SortFields;

    /// Value of a storage column, used to build cursors.
    fn cursor_value(&self, column: &str) -> Option<CursorValue>;
}

/// Persistence facade for one resource kind.
#[async_trait]
pub trait ResourceManager<R: Resource>: Send + Sync {
    async fn create(&self, draft: R::Draft) -> Result<R>;

    /// Fails with `NotFound` when the id is unknown.
    async fn get(&self, id: &R::Id) -> Result<R>;

    /// Returns at most `context.page_size` items ordered by the context's
    /// sort column and key column, starting strictly after the cursor.
    async fn list(&self, context: &PaginationContext) -> Result<ListPage<R>>;

    /// Fails with `NotFound` when the id is unknown.
    async fn delete(&self, id: &R::Id) -> Result<()>;
}
