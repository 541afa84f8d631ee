//! Opaque continuation tokens.
//!
//! A token has the form `v1.<payload>.<tag>`: the payload is URL-safe base64
//! JSON describing the sort order, page size and cursor, and the tag is an
//! HMAC-SHA256 over the version and payload. Unknown JSON fields are ignored
//! so later versions of the payload can add fields without invalidating
//! tokens already handed out.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, Result};

use super::{
    check_page_size, validate_page_size, Cursor, PaginationContext, SortDirection, SortFields,
    SortOrder, DEFAULT_PAGE_SIZE,
};

type HmacSha256 = Hmac<Sha256>;

/// Version prefix of tokens minted by this codec.
pub const TOKEN_VERSION: &str = "v1";

/// Recommended minimum length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TokenPayload {
    resource: String,
    sort_field: String,
    #[serde(default)]
    direction: SortDirection,
    page_size: usize,
    cursor: Option<Cursor>,
}

/// Mints and validates continuation tokens.
///
/// The codec holds only the signing key; it is cheap to clone and safe to
/// share between concurrent requests.
#[derive(Clone)]
pub struct PageTokenCodec {
    key: Arc<[u8]>,
}

impl fmt::Debug for PageTokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTokenCodec")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl PageTokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: Arc::from(secret.as_ref()),
        }
    }

    /// Serializes the context of the next page into a token.
    pub fn encode(&self, context: &PaginationContext) -> Result<String> {
        let payload = TokenPayload {
            resource: context.resource.clone(),
            sort_field: context.sort.field.clone(),
            direction: context.sort.direction,
            page_size: context.page_size,
            cursor: context.cursor.clone(),
        };

        let json = serde_json::to_vec(&payload)?;
        let body = URL_SAFE_NO_PAD.encode(json);
        let tag = URL_SAFE_NO_PAD.encode(self.sign(&body)?);

        Ok(format!("{}.{}.{}", TOKEN_VERSION, body, tag))
    }

    /// Builds the pagination context for a list request.
    ///
    /// Without a token this is the first page of `sort_by`. With a token the
    /// request must ask for the same ordering the token was minted for. A
    /// `page_size` of `0` keeps the token's page size, or falls back to
    /// [`DEFAULT_PAGE_SIZE`] on the first page.
    pub fn decode(
        &self,
        token: &str,
        sort_by: &str,
        page_size: i32,
        fields: &SortFields,
    ) -> Result<PaginationContext> {
        let requested = fields.resolve(sort_by)?;
        let page_size = validate_page_size(page_size)?;

        if token.is_empty() {
            return Ok(PaginationContext::new(
                fields.resource(),
                requested,
                fields.key_column(),
                page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            ));
        }

        let payload = self.open(token)?;

        if payload.resource != fields.resource() {
            return Err(CoreError::invalid_input(format!(
                "Invalid page token: issued for {} and cannot be used to list {}",
                payload.resource,
                fields.resource()
            )));
        }

        let column = fields.column_for(&payload.sort_field).ok_or_else(|| {
            CoreError::invalid_input(format!(
                "Invalid page token: sort field '{}' is not supported",
                payload.sort_field
            ))
        })?;
        let minted = SortOrder {
            field: payload.sort_field.clone(),
            column: column.to_string(),
            direction: payload.direction,
        };

        if !minted.same_ordering(&requested) {
            return Err(CoreError::invalid_input(format!(
                "Invalid page token: it was issued for sort_by '{}' but the request asks for '{}'. \
                 Resend the original sort_by or list again without a page token",
                minted, requested
            )));
        }

        let token_page_size = check_page_size(payload.page_size)
            .map_err(|err| err.wrap("Invalid page token"))?;

        let cursor = payload
            .cursor
            .ok_or_else(|| CoreError::invalid_input("Invalid page token: missing cursor"))?;

        Ok(PaginationContext::new(
            fields.resource(),
            minted,
            fields.key_column(),
            page_size.unwrap_or(token_page_size),
        )
        .with_cursor(cursor))
    }

    fn open(&self, token: &str) -> Result<TokenPayload> {
        let (version, rest) = token.split_once('.').ok_or_else(corrupt)?;
        if version != TOKEN_VERSION {
            return Err(CoreError::invalid_input(format!(
                "Invalid page token: unsupported version '{}'",
                version
            )));
        }

        let (body, tag) = rest.split_once('.').ok_or_else(corrupt)?;
        let tag = URL_SAFE_NO_PAD.decode(tag).map_err(|_| corrupt())?;

        let mut mac = self.mac()?;
        mac.update(TOKEN_VERSION.as_bytes());
        mac.update(b".");
        mac.update(body.as_bytes());
        mac.verify_slice(&tag).map_err(|_| {
            tracing::warn!("Rejected page token with invalid signature");
            CoreError::invalid_input("Invalid page token: signature mismatch")
        })?;

        let json = URL_SAFE_NO_PAD.decode(body).map_err(|_| corrupt())?;
        serde_json::from_slice(&json).map_err(|_| corrupt())
    }

    fn sign(&self, body: &str) -> Result<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(TOKEN_VERSION.as_bytes());
        mac.update(b".");
        mac.update(body.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|err| CoreError::internal(format!("Page token key rejected: {}", err)))
    }
}

fn corrupt() -> CoreError {
    CoreError::invalid_input("Invalid page token: the token is corrupt")
}
