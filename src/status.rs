//! Per-record action board.
//!
//! This module provides [`ActionBoard`], a snapshot of where a record is in
//! its workflow and which buttons a user interface should render for it.

use std::fmt;

use crate::{
    available_actions, standing_actions, toggle_actions, AvailableAction, RecordId,
    StandingAction, StatusWorkflowDefinition, ToggleOffer, TransitionContext, WorkflowRecord,
    WorkflowState,
};

/// Everything a user interface needs to render the controls for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBoard<S> {
    /// The record's identifier.
    pub item_id: RecordId,
    /// Current status.
    pub state: S,
    /// Completion percentage, if the entity tracks one.
    pub progress: Option<u8>,
    /// True if the current state is terminal.
    pub terminal: bool,
    /// Transitions in the order they should be offered.
    pub actions: Vec<AvailableAction<S>>,
    /// Flag toggles currently offered.
    pub toggles: Vec<ToggleOffer>,
    /// State-preserving actions.
    pub standing: Vec<StandingAction>,
}

impl<S: WorkflowState> ActionBoard<S> {
    /// Builds the board for a state and context.
    pub fn new(
        definition: &StatusWorkflowDefinition<S>,
        item_id: RecordId,
        state: S,
        ctx: &TransitionContext,
    ) -> Self {
        Self {
            item_id,
            state,
            progress: state.progress_percent(),
            terminal: definition.is_terminal(state),
            actions: available_actions(definition, state, ctx),
            toggles: toggle_actions(definition, state, ctx),
            standing: standing_actions(definition),
        }
    }

    /// Builds the board for a typed record.
    pub fn for_record<R>(definition: &StatusWorkflowDefinition<S>, record: &R) -> Self
    where
        R: WorkflowRecord<State = S>,
    {
        Self::new(
            definition,
            record.id().clone(),
            record.state(),
            &record.transition_context(),
        )
    }

    /// A board showing only the state, with every control removed.
    ///
    /// Used when the current user may not edit the record.
    pub fn read_only(mut self) -> Self {
        self.actions.clear();
        self.toggles.clear();
        self.standing.clear();
        self
    }

    /// Returns true if no control is offered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.toggles.is_empty() && self.standing.is_empty()
    }

    /// Labels of the offered transitions, in order.
    pub fn action_labels(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.action_label.as_str()).collect()
    }

    /// Looks up an offered transition by label.
    pub fn action(&self, label: &str) -> Option<&AvailableAction<S>> {
        self.actions.iter().find(|a| a.action_label == label)
    }

    fn status_char(&self) -> char {
        match (self.terminal, self.progress) {
            (true, Some(0)) => '❌',
            (true, _) => '✅',
            (false, Some(0) | None) => '⏳',
            (false, Some(_)) => '🔄',
        }
    }
}

impl<S: WorkflowState> fmt::Display for ActionBoard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} #{}: {}",
            self.status_char(),
            S::entity(),
            self.item_id,
            self.state
        )?;
        if let Some(progress) = self.progress {
            write!(f, " ({progress}%)")?;
        }
        writeln!(f)?;

        if self.is_empty() {
            writeln!(f, "  no actions")?;
            return Ok(());
        }

        for action in &self.actions {
            writeln!(
                f,
                "  [{}] -> {}  ({})",
                action.action_label, action.target_state, action.endpoint_suffix
            )?;
        }
        for toggle in &self.toggles {
            writeln!(f, "  [{}]  ({})", toggle.action_label, toggle.endpoint_suffix)?;
        }
        for action in &self.standing {
            writeln!(f, "  [{}]  ({})", action.action_label, action.endpoint_suffix)?;
        }

        Ok(())
    }
}
