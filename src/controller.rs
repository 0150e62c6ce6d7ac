//! The UI-integration boundary.
//!
//! This module provides [`TransitionController`], which ties the pure
//! engine to a [`ResourceClient`] and a [`PermissionService`]. It is the
//! only place where workflow actions turn into backend calls, and it
//! enforces the ordering rules around them:
//!
//! - controls are only offered when the user may edit the module
//! - a requested transition is validated against the engine first
//! - at most one transition per record is in flight at a time
//! - the record is refetched after every acknowledged call, and nothing
//!   cached changes before the backend acknowledges
//!
//! Every outcome is broadcast as a [`WorkflowEvent`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    apply_toggle, find_action, find_standing_action, ActionBoard, EntityType, PermissionAction,
    PermissionService, RecordId, ResourceClient, Result, SgmError, WorkflowEvent, WorkflowRecord,
    WorkflowState,
};

/// Default capacity of the event broadcast channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

type InFlightKey = (EntityType, String);

/// Marks a record as having a call in flight until dropped.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<InFlightKey>>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Drives workflow actions against the backend on behalf of one user.
///
/// The controller caches the last fetched list per entity type. The cache is
/// only ever replaced by a refetch, so a failed call leaves it untouched.
///
/// # Example
///
/// ```
/// use sgm_workflow::{
///     AllowAll, ChemicalAnalysis, ChemicalAnalysisStatus, MemoryResourceClient,
///     TransitionController, WorkflowRecord, WorkflowState,
/// };
/// use serde_json::json;
///
/// # async fn example() -> sgm_workflow::Result<()> {
/// let client = MemoryResourceClient::new();
/// client.register_definition(&ChemicalAnalysisStatus::definition()?).await?;
/// client.insert("analises-quimicas", json!({"id": 1, "status_analise": "Coletada"})).await;
///
/// let controller = TransitionController::new(client, AllowAll);
/// let records = controller.refresh::<ChemicalAnalysis>().await?;
///
/// let updated = controller
///     .transition(&records[0], ChemicalAnalysisStatus::Received)
///     .await?;
/// assert_eq!(updated.state(), ChemicalAnalysisStatus::Received);
/// # Ok(())
/// # }
/// ```
pub struct TransitionController<C, P> {
    client: C,
    permissions: P,
    cache: RwLock<HashMap<EntityType, Vec<JsonValue>>>,
    in_flight: Arc<Mutex<HashSet<InFlightKey>>>,
    event_tx: broadcast::Sender<WorkflowEvent>,
}

impl<C: ResourceClient, P: PermissionService> TransitionController<C, P> {
    /// Creates a controller over a backend and a permission service.
    pub fn new(client: C, permissions: P) -> Self {
        let (event_tx, _) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            permissions,
            cache: RwLock::new(HashMap::new()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            event_tx,
        }
    }

    /// Subscribes to controller events.
    ///
    /// Returns a receiver that will receive all events broadcast after this
    /// call. Events sent while nobody listens are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.event_tx.subscribe()
    }

    /// Emits an event to all subscribers.
    ///
    /// Ignores send errors (no subscribers).
    fn emit(&self, event: WorkflowEvent) {
        let _ = self.event_tx.send(event);
    }

    /// The underlying backend.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The permission service.
    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    /// Returns true if the current user may perform `action` on the entity's module.
    pub fn can(&self, entity: EntityType, action: PermissionAction) -> bool {
        self.permissions
            .has_permission(entity.permission_module(), action)
    }

    /// Returns true while a call for the record is awaiting a response.
    pub fn is_in_flight(&self, entity: EntityType, id: &RecordId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(entity, id.to_string()))
    }

    /// Fetches the entity's list, replaces the cache and returns the records.
    ///
    /// Records that cannot be decoded are skipped with a warning so one bad
    /// row does not hide the rest.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the list cannot be fetched.
    pub async fn refresh<R: WorkflowRecord>(&self) -> Result<Vec<R>> {
        let entity = R::State::entity();
        let span = info_span!("refresh", entity = %entity);

        async move {
            let items = self
                .call(entity, None, self.client.list(entity.resource_path()))
                .await?;
            let records = decode_all::<R>(&items);

            self.cache.write().await.insert(entity, items);
            debug!(count = records.len(), "list refreshed");
            self.emit(WorkflowEvent::ListRefreshed {
                entity,
                count: records.len(),
            });
            Ok::<_, SgmError>(records)
        }
        .instrument(span)
        .await
    }

    /// Returns the cached records, empty if the entity was never refreshed.
    pub async fn records<R: WorkflowRecord>(&self) -> Vec<R> {
        let cache = self.cache.read().await;
        cache
            .get(&R::State::entity())
            .map(|items| decode_all(items))
            .unwrap_or_default()
    }

    /// Looks a cached record up by identifier.
    pub async fn find<R: WorkflowRecord>(&self, id: &RecordId) -> Option<R> {
        self.records::<R>().await.into_iter().find(|r| r.id() == id)
    }

    /// Builds the action board for a record.
    ///
    /// The board carries no controls when the user may not edit the module
    /// or while a call for the record is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SgmError::InvalidDefinition`] if the entity's definition is invalid.
    pub fn board<R: WorkflowRecord>(&self, record: &R) -> Result<ActionBoard<R::State>> {
        let entity = R::State::entity();
        let definition = R::State::definition()?;
        let board = ActionBoard::for_record(&definition, record);

        if !self.can(entity, PermissionAction::Editar) || self.is_in_flight(entity, record.id()) {
            return Ok(board.read_only());
        }
        Ok(board)
    }

    /// Moves a record to `target` and returns it as refetched.
    ///
    /// # Errors
    ///
    /// - [`SgmError::PermissionDenied`] without `editar` on the module
    /// - [`SgmError::TransitionInFlight`] if a call for the record is pending
    /// - [`SgmError::InvalidTransition`] if the engine refuses the transition
    /// - backend errors from the call or the refetch
    pub async fn transition<R: WorkflowRecord>(&self, record: &R, target: R::State) -> Result<R> {
        let entity = R::State::entity();
        let id = record.id().to_string();
        let span = info_span!("transition", entity = %entity, id = %id, action = %target);

        async move {
            self.require(entity, Some(&id), PermissionAction::Editar)?;
            let _guard = self.begin(entity, &id)?;

            let definition = R::State::definition()?;
            let current = record.state();
            let action = find_action(&definition, current, target, &record.transition_context())
                .map_err(|e| self.rejected(entity, &id, e))?;

            info!(endpoint = %action.endpoint_suffix, "requesting transition");
            self.emit(WorkflowEvent::TransitionRequested {
                entity,
                item_id: id.clone(),
                action: action.action_label.clone(),
            });

            self.call(
                entity,
                Some(&id),
                self.client
                    .apply_transition(entity.resource_path(), &id, &action.endpoint_suffix),
            )
            .await?;

            let refreshed = self.refetch::<R>(record.id()).await?;
            info!(from = %current, to = %refreshed.state(), "transition applied");
            self.emit(WorkflowEvent::TransitionApplied {
                entity,
                item_id: id.clone(),
                from: current.to_string(),
                to: refreshed.state().to_string(),
            });
            Ok::<_, SgmError>(refreshed)
        }
        .instrument(span)
        .await
    }

    /// Raises or lowers a flag on a record and returns it as refetched.
    ///
    /// # Errors
    ///
    /// As [`transition`](Self::transition), with the engine check done by
    /// [`apply_toggle`].
    pub async fn toggle<R: WorkflowRecord>(&self, record: &R, flag: &str, raise: bool) -> Result<R> {
        let entity = R::State::entity();
        let id = record.id().to_string();
        let span = info_span!("toggle", entity = %entity, id = %id, action = %flag, raise);

        async move {
            self.require(entity, Some(&id), PermissionAction::Editar)?;
            let _guard = self.begin(entity, &id)?;

            let definition = R::State::definition()?;
            let offer = apply_toggle(
                &definition,
                record.state(),
                flag,
                raise,
                &record.transition_context(),
            )
            .map_err(|e| self.rejected(entity, &id, e))?;

            self.call(
                entity,
                Some(&id),
                self.client
                    .apply_transition(entity.resource_path(), &id, &offer.endpoint_suffix),
            )
            .await?;

            let refreshed = self.refetch::<R>(record.id()).await?;
            info!(endpoint = %offer.endpoint_suffix, "toggle applied");
            self.emit(WorkflowEvent::ToggleApplied {
                entity,
                item_id: id.clone(),
                flag: offer.flag,
                raised: raise,
            });
            Ok::<_, SgmError>(refreshed)
        }
        .instrument(span)
        .await
    }

    /// Runs a state-preserving action and returns the record as refetched.
    ///
    /// # Errors
    ///
    /// As [`transition`](Self::transition); an undeclared suffix is an
    /// [`SgmError::InvalidTransition`].
    pub async fn run_standing<R: WorkflowRecord>(&self, record: &R, endpoint_suffix: &str) -> Result<R> {
        let entity = R::State::entity();
        let id = record.id().to_string();
        let span = info_span!("standing_action", entity = %entity, id = %id, action = %endpoint_suffix);

        async move {
            self.require(entity, Some(&id), PermissionAction::Editar)?;
            let _guard = self.begin(entity, &id)?;

            let definition = R::State::definition()?;
            let action = find_standing_action(&definition, record.state(), endpoint_suffix)
                .map_err(|e| self.rejected(entity, &id, e))?
                .clone();

            self.call(
                entity,
                Some(&id),
                self.client
                    .apply_transition(entity.resource_path(), &id, &action.endpoint_suffix),
            )
            .await?;

            let refreshed = self.refetch::<R>(record.id()).await?;
            info!("standing action run");
            self.emit(WorkflowEvent::StandingActionRun {
                entity,
                item_id: id.clone(),
                action: action.action_label,
            });
            Ok::<_, SgmError>(refreshed)
        }
        .instrument(span)
        .await
    }

    /// Creates a record and refreshes the list.
    ///
    /// Returns the backend's response body.
    ///
    /// # Errors
    ///
    /// [`SgmError::PermissionDenied`] without `criar`,
    /// [`SgmError::Validation`] if `body` is not a JSON object, and backend errors.
    pub async fn create<R: WorkflowRecord>(&self, body: &JsonValue) -> Result<JsonValue> {
        let entity = R::State::entity();
        let span = info_span!("create", entity = %entity);

        async move {
            self.require(entity, None, PermissionAction::Criar)?;
            validate_body(body)?;

            let created = self
                .call(entity, None, self.client.create(entity.resource_path(), body))
                .await?;
            self.refresh::<R>().await?;
            info!("record created");
            Ok::<_, SgmError>(created)
        }
        .instrument(span)
        .await
    }

    /// Updates a record and returns it as refetched.
    ///
    /// # Errors
    ///
    /// [`SgmError::PermissionDenied`] without `editar`,
    /// [`SgmError::TransitionInFlight`] while a call for the record is pending,
    /// [`SgmError::Validation`] if `body` is not a JSON object, and backend errors.
    pub async fn update<R: WorkflowRecord>(&self, id: &RecordId, body: &JsonValue) -> Result<R> {
        let entity = R::State::entity();
        let key = id.to_string();
        let span = info_span!("update", entity = %entity, id = %key);

        async move {
            self.require(entity, Some(&key), PermissionAction::Editar)?;
            validate_body(body)?;
            let _guard = self.begin(entity, &key)?;

            self.call(
                entity,
                Some(&key),
                self.client.update(entity.resource_path(), &key, body),
            )
            .await?;
            let refreshed = self.refetch::<R>(id).await?;
            info!("record updated");
            Ok::<_, SgmError>(refreshed)
        }
        .instrument(span)
        .await
    }

    /// Deletes a record and refreshes the list.
    ///
    /// # Errors
    ///
    /// [`SgmError::PermissionDenied`] without `deletar`,
    /// [`SgmError::TransitionInFlight`] while a call for the record is pending,
    /// and backend errors.
    pub async fn delete<R: WorkflowRecord>(&self, id: &RecordId) -> Result<()> {
        let entity = R::State::entity();
        let key = id.to_string();
        let span = info_span!("delete", entity = %entity, id = %key);

        async move {
            self.require(entity, Some(&key), PermissionAction::Deletar)?;
            let _guard = self.begin(entity, &key)?;

            self.call(entity, Some(&key), self.client.delete(entity.resource_path(), &key))
                .await?;
            self.refresh::<R>().await?;
            info!("record deleted");
            Ok::<_, SgmError>(())
        }
        .instrument(span)
        .await
    }

    fn require(&self, entity: EntityType, id: Option<&str>, action: PermissionAction) -> Result<()> {
        if self.can(entity, action) {
            return Ok(());
        }

        let err = SgmError::PermissionDenied {
            module: entity.permission_module().to_string(),
            action: action.to_string(),
        };
        warn!(error = %err, "permission denied");
        if let Some(id) = id {
            self.emit(WorkflowEvent::TransitionRejected {
                entity,
                item_id: id.to_string(),
                reason: err.to_string(),
            });
        }
        Err(err)
    }

    fn begin(&self, entity: EntityType, id: &str) -> Result<InFlightGuard> {
        let key = (entity, id.to_string());
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if !set.insert(key.clone()) {
            warn!("call already in flight");
            return Err(SgmError::TransitionInFlight {
                entity: entity.as_str(),
                id: id.to_string(),
            });
        }

        Ok(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            key,
        })
    }

    fn rejected(&self, entity: EntityType, id: &str, err: SgmError) -> SgmError {
        warn!(error = %err, "action rejected");
        self.emit(WorkflowEvent::TransitionRejected {
            entity,
            item_id: id.to_string(),
            reason: err.to_string(),
        });
        err
    }

    /// Awaits a backend call, reporting failures.
    async fn call<T>(
        &self,
        entity: EntityType,
        id: Option<&str>,
        request: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        request.await.map_err(|err| {
            warn!(error = %err, "backend call failed");
            self.emit(WorkflowEvent::RequestFailed {
                entity,
                item_id: id.map(str::to_string),
                error: err.to_string(),
            });
            err
        })
    }

    /// Refreshes the list and returns the record with the given identifier.
    async fn refetch<R: WorkflowRecord>(&self, id: &RecordId) -> Result<R> {
        self.refresh::<R>()
            .await?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| {
                SgmError::NotFound(format!("{}/{id}", R::State::entity().resource_path()))
            })
    }
}

fn validate_body(body: &JsonValue) -> Result<()> {
    if body.is_object() {
        Ok(())
    } else {
        Err(SgmError::Validation {
            field: "body".to_string(),
            message: "expected a JSON object".to_string(),
        })
    }
}

/// Decodes a record, reporting an unknown status explicitly.
fn decode<R: WorkflowRecord>(value: &JsonValue) -> Result<R> {
    let entity = R::State::entity();
    if let Some(status) = value.get(entity.status_field()).and_then(JsonValue::as_str) {
        if R::State::parse(status).is_none() {
            return Err(SgmError::UnknownState {
                entity: entity.as_str(),
                value: status.to_string(),
            });
        }
    }
    Ok(R::deserialize(value)?)
}

fn decode_all<R: WorkflowRecord>(items: &[JsonValue]) -> Vec<R> {
    items
        .iter()
        .filter_map(|item| match decode::<R>(item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "skipping undecodable record");
                None
            }
        })
        .collect()
}
