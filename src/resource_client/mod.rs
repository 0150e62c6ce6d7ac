//! Access to the SGM REST backend.
//!
//! This module provides the [`ResourceClient`] trait for listing, creating,
//! updating and deleting records and for applying named transitions, along
//! with concrete implementations:
//!
//! - [`MemoryResourceClient`]: in-memory backend for tests and demos
//! - [`HttpResourceClient`]: reqwest client for the real API (feature `http`)
//!
//! # Example
//!
//! ```
//! use sgm_workflow::{MemoryResourceClient, ResourceClient};
//! use serde_json::json;
//!
//! # async fn example() -> sgm_workflow::Result<()> {
//! let client = MemoryResourceClient::new();
//! client.insert("estoque", json!({"id": 1, "status_estoque": "Disponivel"})).await;
//! client.on_transition("estoque", "reservar", "status_estoque", json!("Reservado")).await;
//!
//! let updated = client.apply_transition("estoque", "1", "reservar").await?;
//! assert_eq!(updated["status_estoque"], "Reservado");
//! # Ok(())
//! # }
//! ```

mod memory;

#[cfg(feature = "http")]
mod http;

pub use memory::{MemoryResourceClient, RecordedCall};

#[cfg(feature = "http")]
pub use http::HttpResourceClient;

use crate::{EntityType, Result, SgmError};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// A trait for talking to the resource backend.
///
/// Every operation addresses a resource by its path segment (e.g.
/// `"analises-quimicas"`) and records by their identifier rendered as a
/// string. Payloads are raw JSON; typed decoding happens in the controller.
///
/// # Object Safety
///
/// This trait is object-safe, allowing for dynamic dispatch with
/// `dyn ResourceClient`, so the HTTP backend can be swapped for the
/// in-memory one in tests.
///
/// # Errors
///
/// Non-2xx responses surface as [`SgmError::RequestFailed`] or
/// [`SgmError::NotFound`]; both are recoverable per operation.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetches every record of a resource.
    async fn list(&self, resource: &str) -> Result<Vec<JsonValue>>;

    /// Creates a record and returns it as stored.
    async fn create(&self, resource: &str, body: &JsonValue) -> Result<JsonValue>;

    /// Replaces the fields of a record and returns it as stored.
    async fn update(&self, resource: &str, id: &str, body: &JsonValue) -> Result<JsonValue>;

    /// Deletes a record.
    async fn delete(&self, resource: &str, id: &str) -> Result<()>;

    /// Applies a named transition: `POST {resource}/{id}/{endpoint_suffix}`.
    ///
    /// Returns the response body; callers should not rely on it reflecting
    /// the new state and refetch instead.
    async fn apply_transition(
        &self,
        resource: &str,
        id: &str,
        endpoint_suffix: &str,
    ) -> Result<JsonValue>;
}

/// Extracts the record array from a list response.
///
/// The backend answers either with a bare array or with an object wrapping
/// it under the entity's list key (e.g. `"itens"` for `estoque`) or under
/// `"data"`. Other array fields of the wrapper are ignored.
pub(crate) fn unwrap_list(resource: &str, body: JsonValue) -> Result<Vec<JsonValue>> {
    match body {
        JsonValue::Array(items) => Ok(items),
        JsonValue::Object(mut fields) => {
            let list_key = EntityType::from_resource_path(resource).map(|e| e.list_key());
            let items = list_key
                .into_iter()
                .chain(["data"])
                .find_map(|key| match fields.remove(key) {
                    Some(JsonValue::Array(items)) => Some(items),
                    _ => None,
                });
            items.ok_or_else(|| SgmError::RequestFailed {
                status: 200,
                message: format!("list response for {resource} contains no record array"),
            })
        }
        other => Err(SgmError::RequestFailed {
            status: 200,
            message: format!("unexpected list response for {resource}: {other}"),
        }),
    }
}

/// Renders the `id` field of a record as a path segment.
pub(crate) fn id_key(record: &JsonValue) -> Option<String> {
    match record.get("id")? {
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => Some(s.clone()),
        _ => None,
    }
}
