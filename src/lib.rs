//! # SGM Workflow
//!
//! Status workflows, backend access and derived engineering metrics for the
//! SGM metrology and asset-management front-end.
//!
//! Every record type with a lifecycle (chemical analyses, change controls,
//! stock items, stock movements and user accounts) is governed by a
//! declarative [`StatusWorkflowDefinition`]. A pure engine computes which
//! actions a user may be offered and validates requested transitions; the
//! [`TransitionController`] turns accepted actions into REST calls and
//! refetches the record once the backend acknowledges them.
//!
//! ## Quick Example
//!
//! ```
//! use sgm_workflow::{
//!     available_actions, apply_transition, ChangeControlStatus, TransitionContext,
//!     ApprovalLevel, WorkflowState,
//! };
//!
//! let definition = ChangeControlStatus::definition()?;
//! let ctx = TransitionContext::new().with_approval_level(ApprovalLevel::Unapproved);
//!
//! let actions = available_actions(&definition, ChangeControlStatus::InAnalysis, &ctx);
//! let labels: Vec<_> = actions.iter().map(|a| a.action_label.as_str()).collect();
//! assert_eq!(labels, ["Approve L1", "Reject", "Cancel"]);
//!
//! let next = apply_transition(
//!     &definition,
//!     ChangeControlStatus::InAnalysis,
//!     ChangeControlStatus::ApprovedL1,
//!     &ctx,
//! )?;
//! assert_eq!(next, ChangeControlStatus::ApprovedL1);
//! # Ok::<(), sgm_workflow::SgmError>(())
//! ```
//!
//! ## Derived metrics
//!
//! ```
//! use sgm_workflow::{api_gravity, beta_ratio};
//!
//! assert_eq!(api_gravity(Some(850.0)).map(|g| g.value()), Some(34.97));
//! assert_eq!(beta_ratio(Some(50.8), Some(101.6)).map(|b| b.value()), Some(0.5));
//! assert!(beta_ratio(Some(50.8), None).is_none());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod controller;
pub mod definition;
pub mod derived;
pub mod engine;
pub mod entities;
pub mod error;
pub mod event;
pub mod permission;
pub mod record;
pub mod resource_client;
pub mod state;
pub mod status;
pub mod telemetry;

pub use config::{ApiConfig, DueConfig, LoggingConfig, SgmConfig};
pub use context::{ApprovalLevel, MovementType, TransitionContext};
pub use controller::TransitionController;
pub use definition::{
    DefinitionBuilder, FlagToggle, Guard, StandingAction, StatusWorkflowDefinition, ToggleAction,
    Transition,
};
pub use derived::{
    api_gravity, approx_reynolds, approx_reynolds_with, beta_ratio, days_overdue, due_status,
    due_status_at, roughness_class, ApiGravity, BetaRatio, DueKind, DueStatus, DueThresholds,
    ReynoldsEstimate, RoughnessClass,
};
pub use engine::{
    apply_toggle, apply_transition, available_actions, find_action, find_standing_action,
    standing_actions, toggle_actions, AvailableAction, ToggleOffer,
};
pub use entities::{
    ChangeControl, ChangeControlStatus, ChemicalAnalysis, ChemicalAnalysisStatus,
    MeasurementPoint, OrificePlate, StockItem, StockItemStatus, StockMovement,
    StockMovementStatus, StraightRun, UserAccount, UserAccountStatus, QUARANTINE_FLAG,
};
pub use error::{RejectionReason, Result, SgmError};
pub use event::WorkflowEvent;
pub use permission::{AllowAll, ModulePermission, PermissionAction, PermissionService, UserPermissions};
pub use record::{RecordId, WorkflowRecord};
pub use resource_client::{MemoryResourceClient, RecordedCall, ResourceClient};
pub use state::{EntityType, WorkflowState};
pub use status::ActionBoard;
pub use telemetry::init_tracing;

#[cfg(feature = "http")]
pub use resource_client::HttpResourceClient;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
