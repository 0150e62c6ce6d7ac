//! Presentation-layer permission checks.
//!
//! The permission service decides whether controls are shown at all. It is
//! not a security boundary: the backend enforces authorization on its own.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An action a user may be granted on a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    /// See the module.
    Visualizar,
    /// Create records.
    Criar,
    /// Edit records and apply transitions.
    Editar,
    /// Delete records.
    Deletar,
    /// Approve records.
    Aprovar,
    /// Change module settings.
    Configurar,
}

impl PermissionAction {
    /// Wire name, e.g. `"editar"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visualizar => "visualizar",
            Self::Criar => "criar",
            Self::Editar => "editar",
            Self::Deletar => "deletar",
            Self::Aprovar => "aprovar",
            Self::Configurar => "configurar",
        }
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether the current user may perform an action on a module.
pub trait PermissionService: Send + Sync {
    /// Returns true if `action` is granted on `module`.
    fn has_permission(&self, module: &str, action: PermissionAction) -> bool;
}

/// Grants every action. Useful for tests and administrative tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionService for AllowAll {
    fn has_permission(&self, _module: &str, _action: PermissionAction) -> bool {
        true
    }
}

/// Grants of one module, as served in the user's `permissoes` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermission {
    /// Module name, e.g. `"estoque"`.
    pub modulo: String,
    /// May view.
    #[serde(default)]
    pub visualizar: bool,
    /// May create.
    #[serde(default)]
    pub criar: bool,
    /// May edit.
    #[serde(default)]
    pub editar: bool,
    /// May delete.
    #[serde(default)]
    pub deletar: bool,
    /// May approve.
    #[serde(default)]
    pub aprovar: bool,
    /// May configure.
    #[serde(default)]
    pub configurar: bool,
}

impl ModulePermission {
    /// Returns the grant for one action.
    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::Visualizar => self.visualizar,
            PermissionAction::Criar => self.criar,
            PermissionAction::Editar => self.editar,
            PermissionAction::Deletar => self.deletar,
            PermissionAction::Aprovar => self.aprovar,
            PermissionAction::Configurar => self.configurar,
        }
    }
}

/// The signed-in user's profile and grants.
///
/// A module without an entry grants nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissions {
    /// Profile name, e.g. `"Administrador"`.
    #[serde(default)]
    pub perfil: Option<String>,
    /// Grants per module.
    #[serde(default)]
    pub permissoes: Vec<ModulePermission>,
}

impl UserPermissions {
    /// Returns true for the administrator profile.
    pub fn is_admin(&self) -> bool {
        self.perfil.as_deref() == Some("Administrador")
    }

    /// Returns true for administrators and supervisors.
    pub fn is_supervisor(&self) -> bool {
        matches!(self.perfil.as_deref(), Some("Administrador" | "Supervisor"))
    }
}

impl PermissionService for UserPermissions {
    fn has_permission(&self, module: &str, action: PermissionAction) -> bool {
        self.permissoes
            .iter()
            .find(|p| p.modulo == module)
            .is_some_and(|p| p.allows(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserPermissions {
        serde_json::from_str(
            r#"{
                "nome": "Técnico",
                "perfil": "Supervisor",
                "permissoes": [
                    {"modulo": "estoque", "visualizar": true, "editar": true},
                    {"modulo": "usuarios", "visualizar": true}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_has_permission() {
        let user = user();
        assert!(user.has_permission("estoque", PermissionAction::Editar));
        assert!(!user.has_permission("estoque", PermissionAction::Deletar));
        assert!(!user.has_permission("usuarios", PermissionAction::Editar));
        assert!(!user.has_permission("controle_mudancas", PermissionAction::Visualizar));
    }

    #[test]
    fn test_profiles() {
        let user = user();
        assert!(user.is_supervisor());
        assert!(!user.is_admin());
        assert!(!UserPermissions::default().is_supervisor());
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.has_permission("anything", PermissionAction::Configurar));
    }

    #[test]
    fn test_action_names() {
        assert_eq!(PermissionAction::Deletar.to_string(), "deletar");
        assert_eq!(
            serde_json::to_string(&PermissionAction::Editar).unwrap(),
            "\"editar\""
        );
    }
}
