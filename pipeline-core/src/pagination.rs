//! Keyset pagination shared by every resource kind.
//!
//! A listing is driven by a [`PaginationContext`]: the validated sort order,
//! the page size and an optional [`Cursor`] holding the last item the client
//! has already seen. Contexts are built from client input by
//! [`PageTokenCodec::decode`] and handed back to clients as opaque tokens
//! by [`PageTokenCodec::encode`], so the server keeps no per-client state.

pub mod sort;
pub mod token;

pub use sort::*;
pub use token::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::traits::Resource;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page a single list call may return.
pub const MAX_PAGE_SIZE: usize = 200;

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: usize = 1;

/// Validates a client-supplied page size.
///
/// `0` means "not specified" and yields `None`; negative values and values
/// above [`MAX_PAGE_SIZE`] are rejected.
pub fn validate_page_size(page_size: i32) -> Result<Option<usize>> {
    if page_size == 0 {
        return Ok(None);
    }
    let size = usize::try_from(page_size).map_err(|_| page_size_error(page_size))?;
    check_page_size(size).map(Some)
}

pub(crate) fn check_page_size(size: usize) -> Result<usize> {
    if (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(page_size_error(size))
    }
}

fn page_size_error(requested: impl fmt::Display) -> CoreError {
    CoreError::invalid_input(format!(
        "Invalid page size {}. Page size must be between {} and {}",
        requested, MIN_PAGE_SIZE, MAX_PAGE_SIZE
    ))
}

/// Direction of a sorted listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn is_descending(&self) -> bool {
        matches!(self, SortDirection::Descending)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }

    /// Applies this direction to an ascending comparison result.
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A validated sort order: the API field the client asked for, the storage
/// column it maps to, and the direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortOrder {
    pub field: String,
    pub column: String,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Two orders are interchangeable when they sort by the same field in the
    /// same direction.
    pub fn same_ordering(&self, other: &SortOrder) -> bool {
        self.field == other.field && self.direction == other.direction
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => write!(f, "{}", self.field),
            SortDirection::Descending => write!(f, "{} desc", self.field),
        }
    }
}

/// A typed value of a sortable column, as captured in a cursor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CursorValue {
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl From<String> for CursorValue {
    fn from(value: String) -> Self {
        CursorValue::Text(value)
    }
}

impl From<&str> for CursorValue {
    fn from(value: &str) -> Self {
        CursorValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for CursorValue {
    fn from(value: DateTime<Utc>) -> Self {
        CursorValue::Timestamp(value)
    }
}

impl From<Uuid> for CursorValue {
    fn from(value: Uuid) -> Self {
        CursorValue::Uuid(value)
    }
}

/// Position of the last item a client has seen: its sort column value plus
/// its primary key, which breaks ties between equal sort values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub sort_value: CursorValue,
    pub key_value: CursorValue,
}

impl Cursor {
    pub fn new(sort_value: impl Into<CursorValue>, key_value: impl Into<CursorValue>) -> Self {
        Self {
            sort_value: sort_value.into(),
            key_value: key_value.into(),
        }
    }
}

/// Everything a resource manager needs to produce one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationContext {
    /// Collection the context was built for, e.g. `experiments`.
    pub resource: String,
    pub sort: SortOrder,
    /// Primary key column used as tie-breaker.
    pub key_column: String,
    pub page_size: usize,
    /// `None` starts at the beginning of the ordered sequence.
    pub cursor: Option<Cursor>,
}

impl PaginationContext {
    pub fn new(
        resource: impl Into<String>,
        sort: SortOrder,
        key_column: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            resource: resource.into(),
            sort,
            key_column: key_column.into(),
            page_size,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn is_first_page(&self) -> bool {
        self.cursor.is_none()
    }

    /// Number of rows to fetch so that a full page plus one look-ahead row
    /// tells whether more data remains.
    pub fn fetch_limit(&self) -> usize {
        self.page_size + 1
    }

    /// Compares two `(sort value, key value)` positions under this context's
    /// ordering.
    pub fn compare(
        &self,
        left: (&CursorValue, &CursorValue),
        right: (&CursorValue, &CursorValue),
    ) -> Ordering {
        let ascending = left.0.cmp(right.0).then_with(|| left.1.cmp(right.1));
        self.sort.direction.apply(ascending)
    }

    /// Whether a position lies strictly after the cursor. Always true on the
    /// first page.
    pub fn is_after_cursor(&self, sort_value: &CursorValue, key_value: &CursorValue) -> bool {
        match &self.cursor {
            None => true,
            Some(cursor) => {
                self.compare((sort_value, key_value), (&cursor.sort_value, &cursor.key_value))
                    == Ordering::Greater
            }
        }
    }

    /// Builds the context for the page that follows `last`.
    pub fn next_page<R: Resource>(&self, last: &R) -> Result<Self> {
        let sort_value = last.cursor_value(&self.sort.column).ok_or_else(|| {
            CoreError::internal(format!(
                "{} has no value for sort column '{}'",
                R::KIND,
                self.sort.column
            ))
        })?;
        let key_value = last.cursor_value(&self.key_column).ok_or_else(|| {
            CoreError::internal(format!(
                "{} has no value for key column '{}'",
                R::KIND,
                self.key_column
            ))
        })?;

        Ok(self.clone().with_cursor(Cursor {
            sort_value,
            key_value,
        }))
    }
}

/// One page returned by a resource manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// Set when at least one more item follows the last one in `items`.
    pub more_available: bool,
}

impl<T> ListPage<T> {
    pub fn new(items: Vec<T>, more_available: bool) -> Self {
        Self {
            items,
            more_available,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    /// Builds a page from a look-ahead fetch of up to `page_size + 1` items,
    /// dropping the extra item when present.
    pub fn from_lookahead(mut items: Vec<T>, page_size: usize) -> Self {
        let more_available = items.len() > page_size;
        items.truncate(page_size);
        Self::new(items, more_available)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
