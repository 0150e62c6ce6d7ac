//! In-memory resource backend.
//!
//! This module provides [`MemoryResourceClient`], a thread-safe in-memory
//! implementation of [`ResourceClient`] suitable for testing and demos. It
//! mimics the backend closely enough to drive the controller: records are
//! keyed by their `id`, transitions are applied through registered field
//! effects, and every call is logged.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::debug;

use super::{id_key, ResourceClient};
use crate::{Result, SgmError, StatusWorkflowDefinition, WorkflowState};

/// A call received by the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// HTTP method the call corresponds to.
    pub method: &'static str,
    /// Path relative to the API base URL.
    pub path: String,
}

/// Internal storage for the memory client.
#[derive(Debug, Default)]
struct Storage {
    /// Records per resource, in insertion order.
    records: HashMap<String, Vec<JsonValue>>,
    /// Field writes per (resource, endpoint suffix).
    effects: HashMap<(String, String), Vec<(String, JsonValue)>>,
    /// Failures to return from the next calls, oldest first.
    failures: VecDeque<(u16, String)>,
    /// Every call received.
    calls: Vec<RecordedCall>,
    /// Next identifier handed out by `create`.
    next_id: i64,
}

impl Storage {
    fn position(&self, resource: &str, id: &str) -> Option<usize> {
        self.records
            .get(resource)?
            .iter()
            .position(|record| id_key(record).as_deref() == Some(id))
    }

    fn not_found(resource: &str, id: &str) -> SgmError {
        SgmError::NotFound(format!("{resource}/{id}"))
    }
}

/// An in-memory implementation of [`ResourceClient`].
///
/// This implementation uses `Arc<RwLock<...>>` internally, making it safe to
/// clone and share across async tasks; clones see the same records.
#[derive(Debug, Clone)]
pub struct MemoryResourceClient {
    storage: Arc<RwLock<Storage>>,
    latency: Option<Duration>,
}

impl MemoryResourceClient {
    /// Creates a new, empty backend.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(Storage {
                next_id: 1,
                ..Storage::default()
            })),
            latency: None,
        }
    }

    /// Delays every call, to exercise concurrent requests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Stores a record as if the backend already had it.
    pub async fn insert(&self, resource: &str, record: JsonValue) {
        let mut storage = self.storage.write().await;
        if let Some(JsonValue::Number(n)) = record.get("id") {
            if let Some(id) = n.as_i64() {
                storage.next_id = storage.next_id.max(id + 1);
            }
        }
        storage
            .records
            .entry(resource.to_string())
            .or_default()
            .push(record);
    }

    /// Registers the field write performed by `POST {resource}/{id}/{suffix}`.
    ///
    /// Several writes may be registered for the same suffix.
    pub async fn on_transition(
        &self,
        resource: &str,
        endpoint_suffix: &str,
        field: &str,
        value: JsonValue,
    ) {
        self.storage
            .write()
            .await
            .effects
            .entry((resource.to_string(), endpoint_suffix.to_string()))
            .or_default()
            .push((field.to_string(), value));
    }

    /// Registers the effects implied by a workflow definition.
    ///
    /// Each transition writes the target's wire name to the entity's status
    /// field, each toggle writes its flag, and standing actions are accepted
    /// without changing the record.
    pub async fn register_definition<S: WorkflowState>(
        &self,
        definition: &StatusWorkflowDefinition<S>,
    ) -> Result<()> {
        let entity = definition.entity();
        let resource = entity.resource_path();
        let mut storage = self.storage.write().await;

        for &state in definition.states() {
            for transition in definition.transitions_from(state) {
                let value = serde_json::to_value(transition.target)?;
                let writes = storage
                    .effects
                    .entry((resource.to_string(), transition.endpoint_suffix.clone()))
                    .or_default();
                if !writes.iter().any(|(field, _)| field == entity.status_field()) {
                    writes.push((entity.status_field().to_string(), value));
                }
            }
        }

        for toggle in definition.toggles() {
            for (action, raised) in [(&toggle.raise, true), (&toggle.lower, false)] {
                storage
                    .effects
                    .entry((resource.to_string(), action.endpoint_suffix.clone()))
                    .or_default()
                    .push((toggle.flag.clone(), JsonValue::Bool(raised)));
            }
        }

        for action in definition.standing_actions() {
            storage
                .effects
                .entry((resource.to_string(), action.endpoint_suffix.clone()))
                .or_default();
        }

        debug!(entity = %entity, "registered workflow effects");
        Ok(())
    }

    /// Makes the next call fail with the given HTTP status.
    pub async fn fail_next(&self, status: u16, message: impl Into<String>) {
        self.storage
            .write()
            .await
            .failures
            .push_back((status, message.into()));
    }

    /// Returns the stored record, if any.
    pub async fn get(&self, resource: &str, id: &str) -> Option<JsonValue> {
        let storage = self.storage.read().await;
        let index = storage.position(resource, id)?;
        storage.records.get(resource)?.get(index).cloned()
    }

    /// Returns every call received so far.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.storage.read().await.calls.clone()
    }

    /// Returns the number of records stored for a resource.
    pub async fn record_count(&self, resource: &str) -> usize {
        self.storage
            .read()
            .await
            .records
            .get(resource)
            .map_or(0, Vec::len)
    }

    /// Logs the call, waits the configured latency and pops an injected failure.
    async fn begin(&self, method: &'static str, path: String) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut storage = self.storage.write().await;
        storage.calls.push(RecordedCall { method, path });
        match storage.failures.pop_front() {
            Some((status, message)) if status == 404 => Err(SgmError::NotFound(message)),
            Some((status, message)) => Err(SgmError::RequestFailed { status, message }),
            None => Ok(()),
        }
    }
}

impl Default for MemoryResourceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceClient for MemoryResourceClient {
    async fn list(&self, resource: &str) -> Result<Vec<JsonValue>> {
        self.begin("GET", resource.to_string()).await?;
        let storage = self.storage.read().await;
        Ok(storage.records.get(resource).cloned().unwrap_or_default())
    }

    async fn create(&self, resource: &str, body: &JsonValue) -> Result<JsonValue> {
        self.begin("POST", resource.to_string()).await?;

        let JsonValue::Object(fields) = body else {
            return Err(SgmError::RequestFailed {
                status: 400,
                message: "body must be a JSON object".to_string(),
            });
        };

        let mut storage = self.storage.write().await;
        let mut record = fields.clone();
        if !record.contains_key("id") {
            record.insert("id".to_string(), JsonValue::from(storage.next_id));
            storage.next_id += 1;
        }
        let record = JsonValue::Object(record);
        storage
            .records
            .entry(resource.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(&self, resource: &str, id: &str, body: &JsonValue) -> Result<JsonValue> {
        self.begin("PUT", format!("{resource}/{id}")).await?;

        let mut storage = self.storage.write().await;
        let index = storage
            .position(resource, id)
            .ok_or_else(|| Storage::not_found(resource, id))?;
        let record = storage
            .records
            .get_mut(resource)
            .and_then(|records| records.get_mut(index))
            .ok_or_else(|| Storage::not_found(resource, id))?;

        if let (JsonValue::Object(target), JsonValue::Object(changes)) = (&mut *record, body) {
            for (key, value) in changes {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<()> {
        self.begin("DELETE", format!("{resource}/{id}")).await?;

        let mut storage = self.storage.write().await;
        let index = storage
            .position(resource, id)
            .ok_or_else(|| Storage::not_found(resource, id))?;
        if let Some(records) = storage.records.get_mut(resource) {
            records.remove(index);
        }
        Ok(())
    }

    async fn apply_transition(
        &self,
        resource: &str,
        id: &str,
        endpoint_suffix: &str,
    ) -> Result<JsonValue> {
        self.begin("POST", format!("{resource}/{id}/{endpoint_suffix}"))
            .await?;

        let mut storage = self.storage.write().await;
        let writes = storage
            .effects
            .get(&(resource.to_string(), endpoint_suffix.to_string()))
            .cloned()
            .ok_or_else(|| SgmError::NotFound(format!("{resource}/{id}/{endpoint_suffix}")))?;
        let index = storage
            .position(resource, id)
            .ok_or_else(|| Storage::not_found(resource, id))?;
        let record = storage
            .records
            .get_mut(resource)
            .and_then(|records| records.get_mut(index))
            .ok_or_else(|| Storage::not_found(resource, id))?;

        if let JsonValue::Object(fields) = record {
            for (field, value) in writes {
                fields.insert(field, value);
            }
        }
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChemicalAnalysisStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_client_new() {
        let client = MemoryResourceClient::new();
        assert_eq!(client.record_count("estoque").await, 0);
        assert!(client.list("estoque").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let client = MemoryResourceClient::new();
        client.insert("usuarios", json!({"id": 4, "nome": "Ana"})).await;

        let created = client
            .create("usuarios", &json!({"nome": "Rui"}))
            .await
            .unwrap();
        assert_eq!(created["id"], 5);
        assert_eq!(client.record_count("usuarios").await, 2);

        let err = client.create("usuarios", &json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, SgmError::RequestFailed { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let client = MemoryResourceClient::new();
        client
            .insert("estoque", json!({"id": 1, "status_estoque": "Disponivel", "local": "A"}))
            .await;

        let updated = client
            .update("estoque", "1", &json!({"local": "B", "id": 99}))
            .await
            .unwrap();
        assert_eq!(updated["local"], "B");
        assert_eq!(updated["id"], 1);
        assert_eq!(updated["status_estoque"], "Disponivel");

        let err = client.update("estoque", "2", &json!({})).await.unwrap_err();
        assert!(matches!(err, SgmError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let client = MemoryResourceClient::new();
        client.insert("estoque", json!({"id": 1})).await;
        client.delete("estoque", "1").await.unwrap();
        assert_eq!(client.record_count("estoque").await, 0);
        assert!(client.delete("estoque", "1").await.is_err());
    }

    #[tokio::test]
    async fn test_registered_definition_drives_status() {
        let client = MemoryResourceClient::new();
        let definition = ChemicalAnalysisStatus::definition().unwrap();
        client.register_definition(&definition).await.unwrap();
        client
            .insert("analises-quimicas", json!({"id": 3, "status_analise": "Coletada"}))
            .await;

        let record = client
            .apply_transition("analises-quimicas", "3", "recebida")
            .await
            .unwrap();
        assert_eq!(record["status_analise"], "Recebida");

        let record = client
            .apply_transition("analises-quimicas", "3", "em-analise")
            .await
            .unwrap();
        assert_eq!(record["status_analise"], "Em Análise");

        let err = client
            .apply_transition("analises-quimicas", "3", "arquivada")
            .await
            .unwrap_err();
        assert!(matches!(err, SgmError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let client = MemoryResourceClient::new();
        client.fail_next(500, "database unavailable").await;

        let err = client.list("estoque").await.unwrap_err();
        assert!(matches!(err, SgmError::RequestFailed { status: 500, .. }));
        assert!(client.list("estoque").await.is_ok());
    }

    #[tokio::test]
    async fn test_calls_are_logged() {
        let client = MemoryResourceClient::new();
        client.insert("estoque", json!({"id": 1})).await;
        client.on_transition("estoque", "reservar", "status_estoque", json!("Reservado")).await;

        client.list("estoque").await.unwrap();
        client.apply_transition("estoque", "1", "reservar").await.unwrap();

        let calls = client.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].method, "POST");
        assert_eq!(calls[1].path, "estoque/1/reservar");
    }
}
