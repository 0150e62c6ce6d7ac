//! Equipment held in stock.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::lenient;
use crate::{
    due_status, DueStatus, DueThresholds, EntityType, RecordId, Result, StatusWorkflowDefinition,
    TransitionContext, WorkflowRecord, WorkflowState,
};

/// JSON field carrying the quarantine modifier.
pub const QUARANTINE_FLAG: &str = "em_quarentena";

/// Primary status of a stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StockItemStatus {
    /// On the shelf.
    #[serde(rename = "Disponivel", alias = "Disponível")]
    Available,
    /// Held for a pending movement.
    #[serde(rename = "Reservado")]
    Reserved,
    /// Out on loan.
    #[serde(rename = "Emprestado")]
    Loaned,
    /// Under repair or calibration.
    #[serde(rename = "Manutencao", alias = "Manutenção")]
    Maintenance,
    /// Written off.
    #[serde(rename = "Descartado", alias = "Descarte")]
    Discarded,
}

impl WorkflowState for StockItemStatus {
    fn entity() -> EntityType {
        EntityType::StockItem
    }

    fn all() -> &'static [Self] {
        &[
            Self::Available,
            Self::Reserved,
            Self::Loaned,
            Self::Maintenance,
            Self::Discarded,
        ]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Reserved => "Reserved",
            Self::Loaned => "Loaned",
            Self::Maintenance => "Maintenance",
            Self::Discarded => "Discarded",
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Self::Available => "Disponivel",
            Self::Reserved => "Reservado",
            Self::Loaned => "Emprestado",
            Self::Maintenance => "Manutencao",
            Self::Discarded => "Descartado",
        }
    }

    fn definition() -> Result<StatusWorkflowDefinition<Self>> {
        use StockItemStatus::*;

        // Loaned, Maintenance and Discarded are entered by movements and
        // maintenance orders, never by a button on the item itself.
        StatusWorkflowDefinition::builder()
            .states(Self::all().iter().copied())
            .initial(Available)
            .terminal([Loaned, Maintenance, Discarded])
            .transition(Available, Reserved, "Reserve", "reservar")
            .transition(Reserved, Available, "Release reservation", "liberar-reserva")
            .toggle(
                QUARANTINE_FLAG,
                ("Quarantine", "quarentena"),
                ("Release quarantine", "liberar-quarentena"),
                [Discarded],
            )
            .build()
    }
}

impl fmt::Display for StockItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stock item as served by `estoque`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    /// Record identifier.
    pub id: RecordId,

    /// Equipment serial number.
    #[serde(default)]
    pub numero_serie_equipamento: Option<String>,

    /// Current primary status.
    pub status_estoque: StockItemStatus,

    /// Quarantine modifier, orthogonal to the status.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub em_quarentena: bool,

    /// Reason given when quarantined.
    #[serde(default)]
    pub motivo_quarentena: Option<String>,

    /// Warranty expiry date.
    #[serde(default, deserialize_with = "lenient::date")]
    pub data_vencimento_garantia: Option<NaiveDate>,

    /// Next scheduled inspection.
    #[serde(default, deserialize_with = "lenient::date")]
    pub proxima_inspecao: Option<NaiveDate>,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StockItem {
    /// Warranty expiry classification.
    pub fn warranty_status(&self, today: NaiveDate, thresholds: &DueThresholds) -> DueStatus {
        due_status(self.data_vencimento_garantia, today, thresholds)
    }

    /// Next-inspection classification.
    pub fn inspection_status(&self, today: NaiveDate, thresholds: &DueThresholds) -> DueStatus {
        due_status(self.proxima_inspecao, today, thresholds)
    }
}

impl WorkflowRecord for StockItem {
    type State = StockItemStatus;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn state(&self) -> Self::State {
        self.status_estoque
    }

    fn transition_context(&self) -> TransitionContext {
        TransitionContext::new().with_flag(QUARANTINE_FLAG, self.em_quarentena)
    }
}
