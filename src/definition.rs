//! Declarative status-workflow definitions.
//!
//! This module provides [`StatusWorkflowDefinition`] and [`DefinitionBuilder`]
//! for declaring, per entity type, the finite state machine that governs the
//! entity's lifecycle. The transition table is mirrored into a petgraph
//! [`DiGraph`] so the workflow can be inspected as a graph.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::{ApprovalLevel, EntityType, MovementType, Result, SgmError, TransitionContext, WorkflowState};

/// Condition attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guard {
    /// The transition is always offered from its source state.
    Always,
    /// Offered only while the recorded approval level equals the given one.
    ApprovalLevelIs(ApprovalLevel),
    /// Offered only for the given movement type.
    MovementTypeIs(MovementType),
}

impl Guard {
    /// Returns true if the guard holds for the context.
    pub fn allows(&self, ctx: &TransitionContext) -> bool {
        match self {
            Self::Always => true,
            Self::ApprovalLevelIs(level) => ctx.approval_level == *level,
            Self::MovementTypeIs(kind) => ctx.movement_type == Some(*kind),
        }
    }
}

/// A declared edge of the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition<S> {
    /// State the record moves to.
    pub target: S,
    /// Button label offered to the user.
    pub action_label: String,
    /// URL segment appended to `{resource}/{id}/` when applying it.
    pub endpoint_suffix: String,
    /// Condition under which it is offered.
    pub guard: Guard,
}

/// One side of a [`FlagToggle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleAction {
    /// Button label offered to the user.
    pub action_label: String,
    /// URL segment appended to `{resource}/{id}/`.
    pub endpoint_suffix: String,
}

/// A boolean modifier kept outside the state machine.
///
/// The flag is raised and lowered by its own pair of actions, independent of
/// the primary status, which avoids doubling the state space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagToggle<S> {
    /// JSON field carrying the flag.
    pub flag: String,
    /// Action that raises the flag.
    pub raise: ToggleAction,
    /// Action that lowers the flag.
    pub lower: ToggleAction,
    /// Primary states in which the flag may not be raised.
    pub blocked_in: Vec<S>,
}

/// A side-effecting action available in every state that does not change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingAction {
    /// Button label offered to the user.
    pub action_label: String,
    /// URL segment appended to `{resource}/{id}/`.
    pub endpoint_suffix: String,
}

/// The finite state machine governing one entity type.
///
/// Construct with [`StatusWorkflowDefinition::builder()`]. A built definition
/// always satisfies its invariants:
///
/// - the initial state, every terminal state and every transition target are
///   declared states
/// - terminal states have no outgoing transitions
/// - every non-terminal state has at least one outgoing transition
/// - endpoint suffixes are URL-safe slugs
#[derive(Debug, Clone)]
pub struct StatusWorkflowDefinition<S: WorkflowState> {
    states: Vec<S>,
    initial: S,
    terminal: Vec<S>,
    transitions: HashMap<S, Vec<Transition<S>>>,
    toggles: Vec<FlagToggle<S>>,
    standing: Vec<StandingAction>,
    graph: DiGraph<S, usize>,
    state_to_index: HashMap<S, NodeIndex>,
}

impl<S: WorkflowState> StatusWorkflowDefinition<S> {
    /// Creates a new definition builder.
    pub fn builder() -> DefinitionBuilder<S> {
        DefinitionBuilder::new()
    }

    /// The entity type this definition governs.
    pub fn entity(&self) -> EntityType {
        S::entity()
    }

    /// All declared states, in declaration order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// The state new records are created in.
    pub fn initial_state(&self) -> S {
        self.initial
    }

    /// States with no outgoing transitions.
    pub fn terminal_states(&self) -> &[S] {
        &self.terminal
    }

    /// Returns true if the state is declared.
    pub fn contains(&self, state: S) -> bool {
        self.state_to_index.contains_key(&state)
    }

    /// Returns true if the state is terminal.
    pub fn is_terminal(&self, state: S) -> bool {
        self.terminal.contains(&state)
    }

    /// Declared transitions out of a state, guards not applied.
    pub fn transitions_from(&self, state: S) -> &[Transition<S>] {
        self.transitions
            .get(&state)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Declared flag toggles.
    pub fn toggles(&self) -> &[FlagToggle<S>] {
        &self.toggles
    }

    /// Looks up a toggle by flag name.
    pub fn toggle(&self, flag: &str) -> Option<&FlagToggle<S>> {
        self.toggles.iter().find(|t| t.flag == flag)
    }

    /// Declared state-preserving actions.
    pub fn standing_actions(&self) -> &[StandingAction] {
        &self.standing
    }

    /// States reachable from the initial state, ignoring guards.
    pub fn reachable_states(&self) -> Vec<S> {
        let mut reachable = Vec::new();
        let Some(start) = self.state_to_index.get(&self.initial) else {
            return reachable;
        };

        let mut bfs = Bfs::new(&self.graph, *start);
        while let Some(node) = bfs.next(&self.graph) {
            reachable.push(self.graph[node]);
        }
        reachable
    }

    /// Declared states that can never be entered from the initial state.
    pub fn unreachable_states(&self) -> Vec<S> {
        let reachable: HashSet<S> = self.reachable_states().into_iter().collect();
        self.states
            .iter()
            .copied()
            .filter(|s| !reachable.contains(s))
            .collect()
    }

    /// Declared successors of a state, ignoring guards, in declaration order.
    pub fn successors(&self, state: S) -> Vec<S> {
        let Some(index) = self.state_to_index.get(&state) else {
            return Vec::new();
        };

        let mut edges: Vec<(usize, S)> = self
            .graph
            .edges(*index)
            .map(|edge| (*edge.weight(), self.graph[edge.target()]))
            .collect();
        edges.sort_by_key(|(position, _)| *position);
        edges.into_iter().map(|(_, target)| target).collect()
    }
}

/// Builder for [`StatusWorkflowDefinition`].
///
/// Transitions out of a state keep the order in which they are declared;
/// that order is the order in which actions are offered.
#[derive(Debug)]
pub struct DefinitionBuilder<S> {
    states: Vec<S>,
    initial: Option<S>,
    terminal: Vec<S>,
    transitions: Vec<(S, Transition<S>)>,
    toggles: Vec<FlagToggle<S>>,
    standing: Vec<StandingAction>,
}

impl<S: WorkflowState> DefinitionBuilder<S> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            initial: None,
            terminal: Vec::new(),
            transitions: Vec::new(),
            toggles: Vec::new(),
            standing: Vec::new(),
        }
    }

    /// Declares the states.
    pub fn states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.states.extend(states);
        self
    }

    /// Sets the initial state.
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Declares terminal states.
    pub fn terminal(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.terminal.extend(states);
        self
    }

    /// Adds an unconditional transition.
    pub fn transition(self, from: S, to: S, label: &str, suffix: &str) -> Self {
        self.guarded_transition(from, to, label, suffix, Guard::Always)
    }

    /// Adds a transition offered only while `guard` holds.
    pub fn guarded_transition(
        mut self,
        from: S,
        to: S,
        label: &str,
        suffix: &str,
        guard: Guard,
    ) -> Self {
        self.transitions.push((
            from,
            Transition {
                target: to,
                action_label: label.to_string(),
                endpoint_suffix: suffix.to_string(),
                guard,
            },
        ));
        self
    }

    /// Adds the same unconditional transition out of each listed state.
    pub fn transition_from_each(mut self, from: &[S], to: S, label: &str, suffix: &str) -> Self {
        for state in from {
            self = self.transition(*state, to, label, suffix);
        }
        self
    }

    /// Adds a flag toggle.
    pub fn toggle(
        mut self,
        flag: &str,
        raise: (&str, &str),
        lower: (&str, &str),
        blocked_in: impl IntoIterator<Item = S>,
    ) -> Self {
        self.toggles.push(FlagToggle {
            flag: flag.to_string(),
            raise: ToggleAction {
                action_label: raise.0.to_string(),
                endpoint_suffix: raise.1.to_string(),
            },
            lower: ToggleAction {
                action_label: lower.0.to_string(),
                endpoint_suffix: lower.1.to_string(),
            },
            blocked_in: blocked_in.into_iter().collect(),
        });
        self
    }

    /// Adds an action available in every state that leaves the state unchanged.
    pub fn standing_action(mut self, label: &str, suffix: &str) -> Self {
        self.standing.push(StandingAction {
            action_label: label.to_string(),
            endpoint_suffix: suffix.to_string(),
        });
        self
    }

    /// Validates the declarations and builds the definition.
    ///
    /// # Errors
    ///
    /// Returns [`SgmError::InvalidDefinition`] if any invariant is violated.
    pub fn build(self) -> Result<StatusWorkflowDefinition<S>> {
        let entity = S::entity();
        let invalid = |message: String| SgmError::InvalidDefinition(format!("{entity}: {message}"));

        if self.states.is_empty() {
            return Err(invalid("no states declared".to_string()));
        }

        let mut graph = DiGraph::new();
        let mut state_to_index = HashMap::new();
        for state in &self.states {
            if state_to_index.contains_key(state) {
                return Err(invalid(format!("duplicate state {state}")));
            }
            let index = graph.add_node(*state);
            state_to_index.insert(*state, index);
        }

        let initial = self
            .initial
            .ok_or_else(|| invalid("no initial state".to_string()))?;
        if !state_to_index.contains_key(&initial) {
            return Err(invalid(format!("initial state {initial} is not declared")));
        }

        for state in &self.terminal {
            if !state_to_index.contains_key(state) {
                return Err(invalid(format!("terminal state {state} is not declared")));
            }
        }

        let mut transitions: HashMap<S, Vec<Transition<S>>> = HashMap::new();
        for (position, (from, transition)) in self.transitions.into_iter().enumerate() {
            let (Some(&from_index), Some(&to_index)) = (
                state_to_index.get(&from),
                state_to_index.get(&transition.target),
            ) else {
                return Err(invalid(format!(
                    "transition {from} -> {} references an undeclared state",
                    transition.target
                )));
            };

            if self.terminal.contains(&from) {
                return Err(invalid(format!(
                    "terminal state {from} declares a transition to {}",
                    transition.target
                )));
            }

            validate_slug(&transition.endpoint_suffix).map_err(&invalid)?;

            let outgoing = transitions.entry(from).or_default();
            if outgoing.iter().any(|t| t.target == transition.target) {
                return Err(invalid(format!(
                    "duplicate transition {from} -> {}",
                    transition.target
                )));
            }

            graph.add_edge(from_index, to_index, position);
            outgoing.push(transition);
        }

        for state in &self.states {
            if !self.terminal.contains(state) && !transitions.contains_key(state) {
                return Err(invalid(format!(
                    "non-terminal state {state} has no outgoing transition"
                )));
            }
        }

        for toggle in &self.toggles {
            if toggle.flag.is_empty() {
                return Err(invalid("toggle with empty flag name".to_string()));
            }
            validate_slug(&toggle.raise.endpoint_suffix).map_err(&invalid)?;
            validate_slug(&toggle.lower.endpoint_suffix).map_err(&invalid)?;
            if let Some(state) = toggle
                .blocked_in
                .iter()
                .find(|s| !state_to_index.contains_key(*s))
            {
                return Err(invalid(format!(
                    "toggle {} blocks undeclared state {state}",
                    toggle.flag
                )));
            }
        }

        for action in &self.standing {
            validate_slug(&action.endpoint_suffix).map_err(&invalid)?;
        }

        let definition = StatusWorkflowDefinition {
            states: self.states,
            initial,
            terminal: self.terminal,
            transitions,
            toggles: self.toggles,
            standing: self.standing,
            graph,
            state_to_index,
        };

        let unreachable = definition.unreachable_states();
        debug!(
            entity = %entity,
            states = definition.states.len(),
            unreachable = ?unreachable,
            "workflow definition built"
        );

        Ok(definition)
    }
}

impl<S: WorkflowState> Default for DefinitionBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Endpoint suffixes are lower-case ASCII words joined by single hyphens.
fn validate_slug(slug: &str) -> std::result::Result<(), String> {
    let well_formed = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(format!("endpoint suffix {slug:?} is not a URL-safe slug"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChemicalAnalysisStatus as S;

    fn base() -> DefinitionBuilder<S> {
        StatusWorkflowDefinition::builder()
            .states([S::Collected, S::Received, S::Completed])
            .initial(S::Collected)
            .terminal([S::Completed])
            .transition(S::Collected, S::Received, "Receive", "recebida")
            .transition(S::Received, S::Completed, "Conclude", "concluida")
    }

    #[test]
    fn test_build_valid_definition() {
        let definition = base().build().unwrap();
        assert_eq!(definition.initial_state(), S::Collected);
        assert!(definition.is_terminal(S::Completed));
        assert_eq!(definition.transitions_from(S::Collected).len(), 1);
        assert!(definition.transitions_from(S::Completed).is_empty());
    }

    #[test]
    fn test_missing_initial_rejected() {
        let result = StatusWorkflowDefinition::<S>::builder()
            .states([S::Collected])
            .terminal([S::Collected])
            .build();
        assert!(matches!(result, Err(SgmError::InvalidDefinition(_))));
    }

    #[test]
    fn test_initial_must_be_declared() {
        let result = StatusWorkflowDefinition::builder()
            .states([S::Collected, S::Completed])
            .initial(S::Cancelled)
            .terminal([S::Completed])
            .transition(S::Collected, S::Completed, "Conclude", "concluida")
            .build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("initial state"));
    }

    #[test]
    fn test_undeclared_target_rejected() {
        let result = base()
            .transition(S::Received, S::Cancelled, "Cancel", "cancelada")
            .build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("undeclared state"));
    }

    #[test]
    fn test_dead_end_non_terminal_rejected() {
        let result = StatusWorkflowDefinition::builder()
            .states([S::Collected, S::Received, S::Completed])
            .initial(S::Collected)
            .terminal([S::Completed])
            .transition(S::Collected, S::Received, "Receive", "recebida")
            .build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("no outgoing transition"));
    }

    #[test]
    fn test_terminal_with_transition_rejected() {
        let result = base()
            .transition(S::Completed, S::Received, "Reopen", "recebida")
            .build();
        assert!(result.unwrap_err().to_string().contains("terminal state"));
    }

    #[test]
    fn test_duplicate_state_rejected() {
        let result = base().states([S::Collected]).build();
        assert!(result.unwrap_err().to_string().contains("duplicate state"));
    }

    #[test]
    fn test_duplicate_transition_rejected() {
        let result = base()
            .transition(S::Collected, S::Received, "Receive again", "recebida")
            .build();
        assert!(result.unwrap_err().to_string().contains("duplicate transition"));
    }

    #[test]
    fn test_slug_with_space_rejected() {
        let result = StatusWorkflowDefinition::builder()
            .states([S::Collected, S::InAnalysis])
            .initial(S::Collected)
            .terminal([S::InAnalysis])
            .transition(S::Collected, S::InAnalysis, "Start", "em análise")
            .build();
        assert!(result.unwrap_err().to_string().contains("URL-safe"));
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("aprovada-nivel-1").is_ok());
        assert!(validate_slug("Recebida").is_err());
        assert!(validate_slug("-x").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_successors_keep_declaration_order() {
        let definition = StatusWorkflowDefinition::builder()
            .states([S::Collected, S::Received, S::Cancelled])
            .initial(S::Collected)
            .terminal([S::Cancelled])
            .transition(S::Collected, S::Received, "Receive", "recebida")
            .transition(S::Collected, S::Cancelled, "Cancel", "cancelada")
            .transition(S::Received, S::Cancelled, "Cancel", "cancelada")
            .build()
            .unwrap();

        assert_eq!(
            definition.successors(S::Collected),
            vec![S::Received, S::Cancelled]
        );
    }

    #[test]
    fn test_unreachable_states() {
        let definition = StatusWorkflowDefinition::builder()
            .states([S::Collected, S::Received, S::Completed, S::Cancelled])
            .initial(S::Collected)
            .terminal([S::Completed, S::Cancelled])
            .transition(S::Collected, S::Received, "Receive", "recebida")
            .transition(S::Received, S::Completed, "Conclude", "concluida")
            .build()
            .unwrap();

        assert_eq!(definition.unreachable_states(), vec![S::Cancelled]);
        assert_eq!(definition.reachable_states().len(), 3);
    }

    #[test]
    fn test_guard_allows() {
        let ctx = TransitionContext::new().with_movement_type(MovementType::Loan);
        assert!(Guard::Always.allows(&ctx));
        assert!(Guard::MovementTypeIs(MovementType::Loan).allows(&ctx));
        assert!(!Guard::MovementTypeIs(MovementType::Exit).allows(&ctx));
        assert!(Guard::ApprovalLevelIs(ApprovalLevel::Unapproved).allows(&ctx));
        assert!(!Guard::ApprovalLevelIs(ApprovalLevel::Level1).allows(&ctx));
    }
}
