//! Workflow events.
//!
//! This module provides [`WorkflowEvent`] for observing what the controller
//! does. Events are broadcast through a channel that can be subscribed to
//! for notifications, logging, or refreshing other views.

use crate::EntityType;

/// An event emitted by the transition controller.
///
/// Events use `String` for item IDs and states to keep the event type simple
/// and easy to serialize for logging or transmission.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum WorkflowEvent {
    /// A transition passed local validation and is being sent.
    TransitionRequested {
        /// Entity type.
        entity: EntityType,
        /// The record's identifier.
        item_id: String,
        /// Action label.
        action: String,
    },

    /// The backend acknowledged a transition and the record was refetched.
    TransitionApplied {
        /// Entity type.
        entity: EntityType,
        /// The record's identifier.
        item_id: String,
        /// State before the transition.
        from: String,
        /// State reported by the backend afterwards.
        to: String,
    },

    /// A transition or toggle was refused before reaching the backend.
    TransitionRejected {
        /// Entity type.
        entity: EntityType,
        /// The record's identifier.
        item_id: String,
        /// Why it was refused.
        reason: String,
    },

    /// A flag toggle was acknowledged.
    ToggleApplied {
        /// Entity type.
        entity: EntityType,
        /// The record's identifier.
        item_id: String,
        /// Flag name.
        flag: String,
        /// New flag value.
        raised: bool,
    },

    /// A state-preserving action was acknowledged.
    StandingActionRun {
        /// Entity type.
        entity: EntityType,
        /// The record's identifier.
        item_id: String,
        /// Action label.
        action: String,
    },

    /// A backend call failed.
    RequestFailed {
        /// Entity type.
        entity: EntityType,
        /// The record's identifier, when the call targeted one record.
        item_id: Option<String>,
        /// Error message describing the failure.
        error: String,
    },

    /// The cached list for an entity was replaced.
    ListRefreshed {
        /// Entity type.
        entity: EntityType,
        /// Number of records now cached.
        count: usize,
    },
}

impl WorkflowEvent {
    /// Returns the entity type for this event.
    pub fn entity(&self) -> EntityType {
        match self {
            Self::TransitionRequested { entity, .. }
            | Self::TransitionApplied { entity, .. }
            | Self::TransitionRejected { entity, .. }
            | Self::ToggleApplied { entity, .. }
            | Self::StandingActionRun { entity, .. }
            | Self::RequestFailed { entity, .. }
            | Self::ListRefreshed { entity, .. } => *entity,
        }
    }

    /// Returns the item ID for this event, if applicable.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::TransitionRequested { item_id, .. }
            | Self::TransitionApplied { item_id, .. }
            | Self::TransitionRejected { item_id, .. }
            | Self::ToggleApplied { item_id, .. }
            | Self::StandingActionRun { item_id, .. } => Some(item_id),
            Self::RequestFailed { item_id, .. } => item_id.as_deref(),
            Self::ListRefreshed { .. } => None,
        }
    }

    /// Returns true if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::TransitionRejected { .. } | Self::RequestFailed { .. }
        )
    }
}
