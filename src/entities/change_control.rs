//! Management-of-change (MOC) requests.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::lenient;
use crate::{
    ApprovalLevel, EntityType, Guard, RecordId, Result, StatusWorkflowDefinition,
    TransitionContext, WorkflowRecord, WorkflowState,
};

/// Status of a change-control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeControlStatus {
    /// Request opened.
    #[serde(rename = "Iniciada")]
    Started,
    /// Under technical analysis.
    #[serde(rename = "Em Analise", alias = "Em Análise")]
    InAnalysis,
    /// First-level approval granted.
    #[serde(rename = "Aprovada Nivel 1")]
    ApprovedL1,
    /// Second-level approval granted.
    #[serde(rename = "Aprovada Nivel 2")]
    ApprovedL2,
    /// Third-level approval granted.
    #[serde(rename = "Aprovada Nivel 3")]
    ApprovedL3,
    /// Refused during analysis.
    #[serde(rename = "Rejeitada")]
    Rejected,
    /// Change carried out in the field.
    #[serde(rename = "Implementada")]
    Implemented,
    /// Change closed.
    #[serde(rename = "Concluida", alias = "Concluída")]
    Completed,
    /// Request withdrawn.
    #[serde(rename = "Cancelada")]
    Cancelled,
}

impl WorkflowState for ChangeControlStatus {
    fn entity() -> EntityType {
        EntityType::ChangeControl
    }

    fn all() -> &'static [Self] {
        &[
            Self::Started,
            Self::InAnalysis,
            Self::ApprovedL1,
            Self::ApprovedL2,
            Self::ApprovedL3,
            Self::Rejected,
            Self::Implemented,
            Self::Completed,
            Self::Cancelled,
        ]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::InAnalysis => "In Analysis",
            Self::ApprovedL1 => "Approved L1",
            Self::ApprovedL2 => "Approved L2",
            Self::ApprovedL3 => "Approved L3",
            Self::Rejected => "Rejected",
            Self::Implemented => "Implemented",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Self::Started => "Iniciada",
            Self::InAnalysis => "Em Analise",
            Self::ApprovedL1 => "Aprovada Nivel 1",
            Self::ApprovedL2 => "Aprovada Nivel 2",
            Self::ApprovedL3 => "Aprovada Nivel 3",
            Self::Rejected => "Rejeitada",
            Self::Implemented => "Implementada",
            Self::Completed => "Concluida",
            Self::Cancelled => "Cancelada",
        }
    }

    fn progress_percent(&self) -> Option<u8> {
        Some(match self {
            Self::Started => 10,
            Self::InAnalysis => 25,
            Self::ApprovedL1 => 40,
            Self::ApprovedL2 => 60,
            Self::ApprovedL3 => 75,
            Self::Implemented => 90,
            Self::Completed => 100,
            Self::Rejected | Self::Cancelled => 0,
        })
    }

    fn definition() -> Result<StatusWorkflowDefinition<Self>> {
        use ChangeControlStatus::*;

        StatusWorkflowDefinition::builder()
            .states(Self::all().iter().copied())
            .initial(Started)
            .terminal([Rejected, Completed, Cancelled])
            .transition(Started, InAnalysis, "Analyze", "em-analise")
            .guarded_transition(
                InAnalysis,
                ApprovedL1,
                "Approve L1",
                "aprovada-nivel-1",
                Guard::ApprovalLevelIs(ApprovalLevel::Unapproved),
            )
            .transition(InAnalysis, Rejected, "Reject", "rejeitada")
            .transition(ApprovedL1, ApprovedL2, "Approve L2", "aprovada-nivel-2")
            .transition(ApprovedL2, ApprovedL3, "Approve L3", "aprovada-nivel-3")
            .transition(ApprovedL3, Implemented, "Implement", "implementada")
            .transition(Implemented, Completed, "Conclude", "concluida")
            .transition_from_each(
                &[Started, InAnalysis, ApprovedL1, ApprovedL2],
                Cancelled,
                "Cancel",
                "cancelada",
            )
            .build()
    }
}

impl fmt::Display for ChangeControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A change-control record as served by `controle-mudancas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeControl {
    /// Record identifier.
    pub id: RecordId,

    /// MOC number, e.g. `MOC-2024-001`.
    #[serde(default)]
    pub numero_moc: Option<String>,

    /// Short title.
    #[serde(default)]
    pub titulo_mudanca: Option<String>,

    /// Current status.
    pub status_moc: ChangeControlStatus,

    /// Date the first-level approval was recorded.
    #[serde(default, deserialize_with = "lenient::date")]
    pub data_aprovacao_nivel_1: Option<NaiveDate>,

    /// Date the second-level approval was recorded.
    #[serde(default, deserialize_with = "lenient::date")]
    pub data_aprovacao_nivel_2: Option<NaiveDate>,

    /// Date the third-level approval was recorded.
    #[serde(default, deserialize_with = "lenient::date")]
    pub data_aprovacao_nivel_3: Option<NaiveDate>,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChangeControl {
    /// Highest approval level with a recorded date.
    pub fn approval_level(&self) -> ApprovalLevel {
        ApprovalLevel::from_approval_dates(
            self.data_aprovacao_nivel_1,
            self.data_aprovacao_nivel_2,
            self.data_aprovacao_nivel_3,
        )
    }
}

impl WorkflowRecord for ChangeControl {
    type State = ChangeControlStatus;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn state(&self) -> Self::State {
        self.status_moc
    }

    fn transition_context(&self) -> TransitionContext {
        TransitionContext::new().with_approval_level(self.approval_level())
    }
}
