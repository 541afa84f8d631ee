//! Generic create/get/list/delete orchestration.
//!
//! [`ResourceServer`] sits between the transport and a [`ResourceManager`]:
//! it validates requests, turns list parameters into a pagination context,
//! mints continuation tokens and prefixes every error with the operation that
//! failed. It keeps no per-request state.

use pipeline_core::domain::Experiment;
use pipeline_core::{
    CoreError, PageTokenCodec, PaginationContext, Resource, ResourceManager, Result, ResultExt,
    SortFields,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Parameters of a list call as received from the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Empty for the first page.
    pub page_token: String,
    /// `0` lets the server pick.
    pub page_size: i32,
    /// Empty for the default order.
    pub sort_by: String,
}

impl ListRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = page_token.into();
        self
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self
    }
}

/// One page of results. `next_page_token` is empty on the last page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_page_token: String,
}

pub struct ResourceServer<R, M: ?Sized> {
    manager: Arc<M>,
    fields: SortFields,
    codec: PageTokenCodec,
    _resource: PhantomData<fn() -> R>,
}

/// Server for experiments over any storage backend.
pub type ExperimentServer = ResourceServer<Experiment, dyn ResourceManager<Experiment>>;

impl<R, M: ?Sized> Clone for ResourceServer<R, M> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            fields: self.fields.clone(),
            codec: self.codec.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R, M: ?Sized> fmt::Debug for ResourceServer<R, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceServer")
            .field("fields", &self.fields)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl<R, M> ResourceServer<R, M>
where
    R: Resource,
    M: ResourceManager<R> + ?Sized,
{
    pub fn new(manager: Arc<M>, codec: PageTokenCodec) -> Self {
        Self {
            manager,
            fields: R::sort_fields(),
            codec,
            _resource: PhantomData,
        }
    }

    /// Replaces the sortable field mapping of the resource kind.
    pub fn with_sort_fields(mut self, fields: SortFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn sort_fields(&self) -> &SortFields {
        &self.fields
    }

    #[tracing::instrument(skip(self), fields(resource = R::KIND))]
    pub async fn create(&self, draft: R::Draft) -> Result<R> {
        R::validate_draft(&draft).context(format!("Validate {} request failed", R::KIND))?;

        let created = self
            .manager
            .create(draft)
            .await
            .context(format!("Create {} failed", R::KIND))?;

        tracing::info!("Created {}", R::KIND);
        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(resource = R::KIND))]
    pub async fn get(&self, id: &str) -> Result<R> {
        let fetched = match Self::resolve_id(id) {
            Ok(id) => self.manager.get(&id).await,
            Err(err) => Err(err),
        };
        fetched.context(format!("Get {} failed", R::KIND))
    }

    #[tracing::instrument(
        skip(self, request),
        fields(resource = R::KIND, sort_by = %request.sort_by, page_size = request.page_size)
    )]
    pub async fn list(&self, request: ListRequest) -> Result<ListResponse<R>> {
        self.list_page(&request)
            .await
            .context(format!("List {} failed", R::COLLECTION))
    }

    #[tracing::instrument(skip(self), fields(resource = R::KIND))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let deleted = match Self::resolve_id(id) {
            Ok(id) => self.manager.delete(&id).await,
            Err(err) => Err(err),
        };
        deleted.context(format!("Delete {} failed", R::KIND))?;

        tracing::info!("Deleted {}", R::KIND);
        Ok(())
    }

    /// Ids are opaque to clients, so one that cannot name a stored resource
    /// is reported the same way as an unknown one.
    fn resolve_id(raw: &str) -> Result<R::Id> {
        raw.parse()
            .map_err(|_| CoreError::not_found(format!("{} {} not found", R::KIND, raw)))
    }

    async fn list_page(&self, request: &ListRequest) -> Result<ListResponse<R>> {
        let context = self.codec.decode(
            &request.page_token,
            &request.sort_by,
            request.page_size,
            &self.fields,
        )?;

        let page = self.manager.list(&context).await?;
        let next_page_token = self.next_page_token(&context, &page.items, page.more_available)?;

        tracing::debug!(
            sort = %context.sort,
            page_size = context.page_size,
            returned = page.items.len(),
            more_available = page.more_available,
            "Listed page"
        );

        Ok(ListResponse {
            items: page.items,
            next_page_token,
        })
    }

    fn next_page_token(
        &self,
        context: &PaginationContext,
        items: &[R],
        more_available: bool,
    ) -> Result<String> {
        match items.last() {
            Some(last) if more_available => self.codec.encode(&context.next_page(last)?),
            _ => Ok(String::new()),
        }
    }
}
