//! The workflow engine.
//!
//! Pure functions over a [`StatusWorkflowDefinition`]: given the current
//! state and a [`TransitionContext`] they compute which actions a user may be
//! offered, and they validate a requested transition before the caller
//! persists it. Nothing here performs I/O or mutates its inputs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    RejectionReason, Result, SgmError, StandingAction, StatusWorkflowDefinition,
    TransitionContext, WorkflowState,
};

/// A transition offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAction<S> {
    /// Button label.
    pub action_label: String,
    /// State the record will be in after the action.
    pub target_state: S,
    /// URL segment for `POST {resource}/{id}/{suffix}`.
    pub endpoint_suffix: String,
}

/// A flag toggle offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOffer {
    /// JSON field carrying the flag.
    pub flag: String,
    /// Value the flag takes after the action.
    pub raise: bool,
    /// Button label.
    pub action_label: String,
    /// URL segment for `POST {resource}/{id}/{suffix}`.
    pub endpoint_suffix: String,
}

/// Returns the ordered list of transitions legal from `current`.
///
/// Order follows the definition: progress actions first, reject/cancel
/// last. Terminal and undeclared states yield an empty list.
pub fn available_actions<S: WorkflowState>(
    definition: &StatusWorkflowDefinition<S>,
    current: S,
    ctx: &TransitionContext,
) -> Vec<AvailableAction<S>> {
    if !definition.contains(current) || definition.is_terminal(current) {
        debug!(entity = %S::entity(), state = %current, "no actions for state");
        return Vec::new();
    }

    let actions: Vec<AvailableAction<S>> = definition
        .transitions_from(current)
        .iter()
        .filter(|t| t.guard.allows(ctx))
        .map(|t| AvailableAction {
            action_label: t.action_label.clone(),
            target_state: t.target,
            endpoint_suffix: t.endpoint_suffix.clone(),
        })
        .collect();

    debug!(
        entity = %S::entity(),
        state = %current,
        offered = actions.len(),
        "computed available actions"
    );
    actions
}

/// Finds the offered action leading from `current` to `requested`.
///
/// # Errors
///
/// Returns [`SgmError::InvalidTransition`] if `requested` is not among
/// [`available_actions`] for the state and context.
pub fn find_action<S: WorkflowState>(
    definition: &StatusWorkflowDefinition<S>,
    current: S,
    requested: S,
    ctx: &TransitionContext,
) -> Result<AvailableAction<S>> {
    let reject = |reason: RejectionReason| {
        debug!(
            entity = %S::entity(),
            from = %current,
            to = %requested,
            reason = %reason,
            "transition rejected"
        );
        SgmError::InvalidTransition {
            entity: S::entity().as_str(),
            from: current.to_string(),
            to: requested.to_string(),
            reason,
        }
    };

    if !definition.contains(current) || !definition.contains(requested) {
        return Err(reject(RejectionReason::UnknownTarget));
    }
    if definition.is_terminal(current) {
        return Err(reject(RejectionReason::TerminalState));
    }

    let transition = definition
        .transitions_from(current)
        .iter()
        .find(|t| t.target == requested)
        .ok_or_else(|| reject(RejectionReason::NotOffered))?;

    if !transition.guard.allows(ctx) {
        return Err(reject(RejectionReason::GuardNotSatisfied));
    }

    Ok(AvailableAction {
        action_label: transition.action_label.clone(),
        target_state: transition.target,
        endpoint_suffix: transition.endpoint_suffix.clone(),
    })
}

/// Validates a transition and returns the new state.
///
/// Succeeds exactly when `requested` appears in [`available_actions`] for
/// `current` and `ctx`; the returned state equals `requested`.
///
/// # Errors
///
/// Returns [`SgmError::InvalidTransition`] when the current state is
/// terminal, the target is not declared from it, or its guard fails.
pub fn apply_transition<S: WorkflowState>(
    definition: &StatusWorkflowDefinition<S>,
    current: S,
    requested: S,
    ctx: &TransitionContext,
) -> Result<S> {
    find_action(definition, current, requested, ctx).map(|action| action.target_state)
}

/// Returns the flag toggles offered for a record.
///
/// A raised flag offers its lowering action in any state. A lowered flag
/// offers its raising action unless the primary state blocks it.
pub fn toggle_actions<S: WorkflowState>(
    definition: &StatusWorkflowDefinition<S>,
    current: S,
    ctx: &TransitionContext,
) -> Vec<ToggleOffer> {
    definition
        .toggles()
        .iter()
        .filter_map(|toggle| {
            if ctx.flag(&toggle.flag) {
                Some(ToggleOffer {
                    flag: toggle.flag.clone(),
                    raise: false,
                    action_label: toggle.lower.action_label.clone(),
                    endpoint_suffix: toggle.lower.endpoint_suffix.clone(),
                })
            } else if toggle.blocked_in.contains(&current) {
                None
            } else {
                Some(ToggleOffer {
                    flag: toggle.flag.clone(),
                    raise: true,
                    action_label: toggle.raise.action_label.clone(),
                    endpoint_suffix: toggle.raise.endpoint_suffix.clone(),
                })
            }
        })
        .collect()
}

/// Validates a flag toggle and returns the offer to execute.
///
/// # Errors
///
/// Returns [`SgmError::InvalidTransition`] if the flag is unknown, already
/// in the requested position, or blocked in the current state.
pub fn apply_toggle<S: WorkflowState>(
    definition: &StatusWorkflowDefinition<S>,
    current: S,
    flag: &str,
    raise: bool,
    ctx: &TransitionContext,
) -> Result<ToggleOffer> {
    let requested = format!("{} {flag}", if raise { "raise" } else { "lower" });
    let reject = |reason: RejectionReason| SgmError::InvalidTransition {
        entity: S::entity().as_str(),
        from: current.to_string(),
        to: requested.clone(),
        reason,
    };

    let toggle = definition
        .toggle(flag)
        .ok_or_else(|| reject(RejectionReason::UnknownTarget))?;

    if ctx.flag(&toggle.flag) == raise {
        return Err(reject(RejectionReason::NotOffered));
    }

    toggle_actions(definition, current, ctx)
        .into_iter()
        .find(|offer| offer.flag == flag && offer.raise == raise)
        .ok_or_else(|| reject(RejectionReason::GuardNotSatisfied))
}

/// Returns the state-preserving actions, available in every state.
pub fn standing_actions<S: WorkflowState>(
    definition: &StatusWorkflowDefinition<S>,
) -> Vec<StandingAction> {
    definition.standing_actions().to_vec()
}

/// Looks up a standing action by endpoint suffix.
///
/// # Errors
///
/// Returns [`SgmError::InvalidTransition`] if no such action is declared.
pub fn find_standing_action<'a, S: WorkflowState>(
    definition: &'a StatusWorkflowDefinition<S>,
    current: S,
    endpoint_suffix: &str,
) -> Result<&'a StandingAction> {
    definition
        .standing_actions()
        .iter()
        .find(|a| a.endpoint_suffix == endpoint_suffix)
        .ok_or_else(|| SgmError::InvalidTransition {
            entity: S::entity().as_str(),
            from: current.to_string(),
            to: endpoint_suffix.to_string(),
            reason: RejectionReason::UnknownTarget,
        })
}
