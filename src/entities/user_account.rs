//! System user accounts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EntityType, RecordId, Result, StatusWorkflowDefinition, WorkflowRecord, WorkflowState};

/// Status of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UserAccountStatus {
    /// May sign in.
    #[serde(rename = "Ativo")]
    Active,
    /// Switched off by an administrator.
    #[serde(rename = "Inativo")]
    Inactive,
    /// Locked, typically after failed sign-ins.
    #[serde(rename = "Bloqueado")]
    Blocked,
    /// Awaiting activation.
    #[serde(rename = "Pendente")]
    Pending,
}

impl WorkflowState for UserAccountStatus {
    fn entity() -> EntityType {
        EntityType::UserAccount
    }

    fn all() -> &'static [Self] {
        &[Self::Active, Self::Inactive, Self::Blocked, Self::Pending]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Blocked => "Blocked",
            Self::Pending => "Pending",
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Self::Active => "Ativo",
            Self::Inactive => "Inativo",
            Self::Blocked => "Bloqueado",
            Self::Pending => "Pendente",
        }
    }

    fn definition() -> Result<StatusWorkflowDefinition<Self>> {
        use UserAccountStatus::*;

        StatusWorkflowDefinition::builder()
            .states(Self::all().iter().copied())
            .initial(Active)
            .terminal([Pending])
            .transition(Active, Blocked, "Block", "bloqueado")
            .transition(Active, Inactive, "Deactivate", "inativo")
            .transition(Inactive, Active, "Activate", "ativo")
            .transition(Blocked, Active, "Unblock", "ativo")
            .standing_action("Reset password", "reset-senha")
            .build()
    }
}

impl fmt::Display for UserAccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user account as served by `usuarios`.
///
/// Password fields are never part of this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Record identifier.
    pub id: RecordId,

    /// Full name.
    #[serde(default)]
    pub nome: Option<String>,

    /// Sign-in e-mail.
    #[serde(default)]
    pub email: Option<String>,

    /// Role profile.
    #[serde(default)]
    pub perfil: Option<String>,

    /// Current status.
    pub status_usuario: UserAccountStatus,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowRecord for UserAccount {
    type State = UserAccountStatus;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn state(&self) -> Self::State {
        self.status_usuario
    }
}
