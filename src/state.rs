//! State trait and entity descriptors.
//!
//! Every workflow entity has its own status enum implementing
//! [`WorkflowState`]. The enum serialises to the backend's wire label and
//! displays with its English label.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Result, StatusWorkflowDefinition};

/// The entity types governed by a status workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Laboratory chemical analyses of fluid samples.
    ChemicalAnalysis,
    /// Management-of-change requests.
    ChangeControl,
    /// Items held in equipment stock.
    StockItem,
    /// Requests that move equipment in or out of stock.
    StockMovement,
    /// System user accounts.
    UserAccount,
}

impl EntityType {
    /// Stable identifier, e.g. `"chemical_analysis"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChemicalAnalysis => "chemical_analysis",
            Self::ChangeControl => "change_control",
            Self::StockItem => "stock_item",
            Self::StockMovement => "stock_movement",
            Self::UserAccount => "user_account",
        }
    }

    /// REST resource path segment under the API base URL.
    pub fn resource_path(&self) -> &'static str {
        match self {
            Self::ChemicalAnalysis => "analises-quimicas",
            Self::ChangeControl => "controle-mudancas",
            Self::StockItem => "estoque",
            Self::StockMovement => "movimentacao-estoque",
            Self::UserAccount => "usuarios",
        }
    }

    /// JSON field holding the record's status.
    pub fn status_field(&self) -> &'static str {
        match self {
            Self::ChemicalAnalysis => "status_analise",
            Self::ChangeControl => "status_moc",
            Self::StockItem => "status_estoque",
            Self::StockMovement => "status_movimentacao",
            Self::UserAccount => "status_usuario",
        }
    }

    /// Key wrapping the record array in list responses, e.g. `{"itens": [...]}`.
    pub fn list_key(&self) -> &'static str {
        match self {
            Self::ChemicalAnalysis => "analises",
            Self::ChangeControl => "mudancas",
            Self::StockItem => "itens",
            Self::StockMovement => "movimentacoes",
            Self::UserAccount => "usuarios",
        }
    }

    /// Finds the entity served at a resource path.
    pub fn from_resource_path(resource: &str) -> Option<Self> {
        [
            Self::ChemicalAnalysis,
            Self::ChangeControl,
            Self::StockItem,
            Self::StockMovement,
            Self::UserAccount,
        ]
        .into_iter()
        .find(|entity| entity.resource_path() == resource)
    }

    /// Module name used by the permission service.
    pub fn permission_module(&self) -> &'static str {
        match self {
            Self::ChemicalAnalysis => "analises_quimicas",
            Self::ChangeControl => "controle_mudancas",
            Self::StockItem => "estoque",
            Self::StockMovement => "movimentacao_estoque",
            Self::UserAccount => "usuarios",
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status value of one entity's workflow.
///
/// Implementations are small `Copy` enums. `Serialize`/`Deserialize` must use
/// the backend's wire label; `Display` should print [`label`](Self::label).
pub trait WorkflowState:
    Copy + Eq + Hash + Ord + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The entity this state belongs to.
    fn entity() -> EntityType;

    /// Every state, in declaration order.
    fn all() -> &'static [Self];

    /// English display label, e.g. `"In Analysis"`.
    fn label(&self) -> &'static str;

    /// Backend wire label, e.g. `"Em Análise"`.
    fn wire_name(&self) -> &'static str;

    /// Completion percentage shown next to the status, if the entity has one.
    fn progress_percent(&self) -> Option<u8> {
        None
    }

    /// Builds the entity's workflow definition.
    ///
    /// # Errors
    ///
    /// Returns [`SgmError::InvalidDefinition`](crate::SgmError::InvalidDefinition)
    /// if the declared table violates a definition invariant.
    fn definition() -> Result<StatusWorkflowDefinition<Self>>;

    /// Looks a state up by wire label, legacy spelling or English label.
    ///
    /// Wire labels and their serde aliases are tried first, so every spelling
    /// the record deserialiser accepts is accepted here too.
    fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(value.to_string()))
            .ok()
            .or_else(|| {
                Self::all()
                    .iter()
                    .copied()
                    .find(|s| s.label().eq_ignore_ascii_case(value))
            })
    }
}
