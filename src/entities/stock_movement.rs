//! Requests that move equipment in or out of stock.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::lenient;
use crate::{
    days_overdue, EntityType, Guard, MovementType, RecordId, Result, StatusWorkflowDefinition,
    TransitionContext, WorkflowRecord, WorkflowState,
};

/// Status of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StockMovementStatus {
    /// Awaiting approval.
    #[serde(rename = "Solicitada")]
    Requested,
    /// Approved, not yet carried out.
    #[serde(rename = "Aprovada")]
    Approved,
    /// Refused.
    #[serde(rename = "Rejeitada")]
    Rejected,
    /// Carried out.
    #[serde(rename = "Executada")]
    Executed,
    /// Loaned goods came back.
    #[serde(rename = "Devolvida")]
    Returned,
    /// Withdrawn before execution.
    #[serde(rename = "Cancelada")]
    Cancelled,
}

impl WorkflowState for StockMovementStatus {
    fn entity() -> EntityType {
        EntityType::StockMovement
    }

    fn all() -> &'static [Self] {
        &[
            Self::Requested,
            Self::Approved,
            Self::Rejected,
            Self::Executed,
            Self::Returned,
            Self::Cancelled,
        ]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Executed => "Executed",
            Self::Returned => "Returned",
            Self::Cancelled => "Cancelled",
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Self::Requested => "Solicitada",
            Self::Approved => "Aprovada",
            Self::Rejected => "Rejeitada",
            Self::Executed => "Executada",
            Self::Returned => "Devolvida",
            Self::Cancelled => "Cancelada",
        }
    }

    fn progress_percent(&self) -> Option<u8> {
        Some(match self {
            Self::Requested => 20,
            Self::Approved => 50,
            Self::Executed => 80,
            Self::Returned => 100,
            Self::Rejected | Self::Cancelled => 0,
        })
    }

    fn definition() -> Result<StatusWorkflowDefinition<Self>> {
        use StockMovementStatus::*;

        // Executed is not terminal: loans still have to come back.
        StatusWorkflowDefinition::builder()
            .states(Self::all().iter().copied())
            .initial(Requested)
            .terminal([Rejected, Returned, Cancelled])
            .transition(Requested, Approved, "Approve", "aprovada")
            .transition(Requested, Rejected, "Reject", "rejeitada")
            .transition(Approved, Executed, "Execute", "executada")
            .guarded_transition(
                Executed,
                Returned,
                "Return",
                "devolvida",
                Guard::MovementTypeIs(MovementType::Loan),
            )
            .transition_from_each(&[Requested, Approved], Cancelled, "Cancel", "cancelada")
            .build()
    }
}

impl fmt::Display for StockMovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stock movement as served by `movimentacao-estoque`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Record identifier.
    pub id: RecordId,

    /// Movement number.
    #[serde(default)]
    pub numero_movimentacao: Option<String>,

    /// Kind of movement; `None` when the backend sends an unknown kind.
    #[serde(default, deserialize_with = "movement_type")]
    pub tipo_movimentacao: Option<MovementType>,

    /// Current status.
    pub status_movimentacao: StockMovementStatus,

    /// Expected return date for loans.
    #[serde(default, deserialize_with = "lenient::date")]
    pub data_devolucao_prevista: Option<NaiveDate>,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn movement_type<'de, D>(deserializer: D) -> std::result::Result<Option<MovementType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl StockMovement {
    /// Days a loan is past its expected return, `None` when on time.
    ///
    /// Only loans that are still out count.
    pub fn days_overdue(&self, today: NaiveDate) -> Option<i64> {
        if self.tipo_movimentacao != Some(MovementType::Loan)
            || self.status_movimentacao != StockMovementStatus::Executed
        {
            return None;
        }
        days_overdue(self.data_devolucao_prevista, today)
    }
}

impl WorkflowRecord for StockMovement {
    type State = StockMovementStatus;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn state(&self) -> Self::State {
        self.status_movimentacao
    }

    fn transition_context(&self) -> TransitionContext {
        let ctx = TransitionContext::new();
        match self.tipo_movimentacao {
            Some(kind) => ctx.with_movement_type(kind),
            None => ctx,
        }
    }
}
