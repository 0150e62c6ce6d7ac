//! Context for conditional transitions.
//!
//! Some transitions depend on facts about the record besides its status:
//! the approval level recorded on a change control, the type of a stock
//! movement, or whether a stock item is quarantined. Callers derive these
//! facts from the record and hand them to the engine explicitly.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest approval level recorded on a change control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ApprovalLevel {
    /// No approval date recorded.
    #[default]
    Unapproved,
    /// First-level approval recorded.
    Level1,
    /// Second-level approval recorded.
    Level2,
    /// Third-level approval recorded.
    Level3,
}

impl ApprovalLevel {
    /// Derives the level from the three approval-date fields.
    ///
    /// The highest populated level wins, regardless of the lower ones.
    pub fn from_approval_dates<T>(level1: Option<T>, level2: Option<T>, level3: Option<T>) -> Self {
        if level3.is_some() {
            Self::Level3
        } else if level2.is_some() {
            Self::Level2
        } else if level1.is_some() {
            Self::Level1
        } else {
            Self::Unapproved
        }
    }

    /// Numeric level, 0 through 3.
    pub fn as_number(&self) -> u8 {
        match self {
            Self::Unapproved => 0,
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
        }
    }
}

impl fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.as_number())
    }
}

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    /// Goods received into stock.
    #[serde(rename = "Entrada")]
    Entry,
    /// Goods leaving stock.
    #[serde(rename = "Saida", alias = "Saída")]
    Exit,
    /// Temporary loan; the only type that can be returned.
    #[serde(rename = "Emprestimo", alias = "Empréstimo")]
    Loan,
    /// Transfer between locations.
    #[serde(rename = "Transferencia", alias = "Transferência")]
    Transfer,
    /// Return of previously moved goods.
    #[serde(rename = "Devolucao", alias = "Devolução")]
    Return,
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Entry => "Entry",
            Self::Exit => "Exit",
            Self::Loan => "Loan",
            Self::Transfer => "Transfer",
            Self::Return => "Return",
        };
        f.write_str(label)
    }
}

/// Facts consulted by transition guards and flag toggles.
///
/// The default context means approval level 0, no movement type and no
/// raised flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionContext {
    /// Approval level derived from the record's approval dates.
    pub approval_level: ApprovalLevel,

    /// Movement type, for stock movements.
    pub movement_type: Option<MovementType>,

    /// Boolean modifier flags currently raised on the record.
    pub raised_flags: BTreeSet<String>,
}

impl TransitionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the approval level.
    pub fn with_approval_level(mut self, level: ApprovalLevel) -> Self {
        self.approval_level = level;
        self
    }

    /// Sets the movement type.
    pub fn with_movement_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = Some(movement_type);
        self
    }

    /// Raises or lowers a flag.
    pub fn with_flag(mut self, flag: impl Into<String>, raised: bool) -> Self {
        let flag = flag.into();
        if raised {
            self.raised_flags.insert(flag);
        } else {
            self.raised_flags.remove(&flag);
        }
        self
    }

    /// Returns true if the flag is raised.
    pub fn flag(&self, flag: &str) -> bool {
        self.raised_flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_level_highest_wins() {
        let level = ApprovalLevel::from_approval_dates(None, None, Some("2024-03-01"));
        assert_eq!(level, ApprovalLevel::Level3);

        let level = ApprovalLevel::from_approval_dates(Some("2024-01-01"), Some("2024-02-01"), None);
        assert_eq!(level, ApprovalLevel::Level2);

        let level = ApprovalLevel::from_approval_dates(Some("2024-01-01"), None, None);
        assert_eq!(level, ApprovalLevel::Level1);

        let level = ApprovalLevel::from_approval_dates::<&str>(None, None, None);
        assert_eq!(level, ApprovalLevel::Unapproved);
        assert_eq!(level.as_number(), 0);
    }

    #[test]
    fn test_movement_type_wire_names() {
        let loan: MovementType = serde_json::from_str("\"Emprestimo\"").unwrap();
        assert_eq!(loan, MovementType::Loan);
        let accented: MovementType = serde_json::from_str("\"Empréstimo\"").unwrap();
        assert_eq!(accented, MovementType::Loan);
        assert_eq!(serde_json::to_string(&MovementType::Exit).unwrap(), "\"Saida\"");
    }

    #[test]
    fn test_context_flags() {
        let ctx = TransitionContext::new().with_flag("em_quarentena", true);
        assert!(ctx.flag("em_quarentena"));

        let ctx = ctx.with_flag("em_quarentena", false);
        assert!(!ctx.flag("em_quarentena"));
    }

    #[test]
    fn test_default_context() {
        let ctx = TransitionContext::default();
        assert_eq!(ctx.approval_level, ApprovalLevel::Unapproved);
        assert!(ctx.movement_type.is_none());
        assert!(ctx.raised_flags.is_empty());
    }
}
