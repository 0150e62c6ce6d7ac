//! Record trait for entities that carry a workflow status.
//!
//! This module defines the [`WorkflowRecord`] trait implemented by every
//! record type the controller can drive, the backend-agnostic [`RecordId`],
//! and lenient field decoders for the loosely typed JSON the backend emits.

use std::fmt::{self, Debug};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{TransitionContext, WorkflowState};

/// Identifier of a record, owned by the backend.
///
/// The backend uses integer keys, but string identifiers are accepted so the
/// same type works for any resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Integer primary key.
    Number(i64),
    /// Textual key.
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A record whose lifecycle is governed by a status workflow.
///
/// Implementations are plain serde structs mirroring the backend's JSON.
/// The record is never mutated by the engine; its state changes only when the
/// backend acknowledges a transition and the record is fetched again.
///
/// # Examples
///
/// ```
/// use sgm_workflow::{ChemicalAnalysis, ChemicalAnalysisStatus, WorkflowRecord};
///
/// let record: ChemicalAnalysis = serde_json::from_str(
///     r#"{"id": 12, "status_analise": "Recebida", "densidade_20c_kg_m3": "850.0"}"#,
/// )?;
/// assert_eq!(record.state(), ChemicalAnalysisStatus::Received);
/// assert_eq!(record.id().to_string(), "12");
/// # Ok::<(), serde_json::Error>(())
/// ```
pub trait WorkflowRecord: Debug + Clone + Send + Sync + Serialize + DeserializeOwned {
    /// The status enum of this record's workflow.
    type State: WorkflowState;

    /// Returns the record's identifier.
    fn id(&self) -> &RecordId;

    /// Returns the record's current status.
    fn state(&self) -> Self::State;

    /// Facts consulted by conditional transitions.
    fn transition_context(&self) -> TransitionContext {
        TransitionContext::default()
    }
}

/// Decoders tolerant of the backend's formatting habits.
pub(crate) mod lenient {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    /// Accepts a number, a numeric string (DECIMAL columns), `""` or `null`.
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<NumberOrText>::deserialize(deserializer)?;
        Ok(match value {
            Some(NumberOrText::Number(n)) => Some(n),
            Some(NumberOrText::Text(text)) => text.trim().parse().ok(),
            None => None,
        })
    }

    /// Accepts `YYYY-MM-DD`, a full ISO timestamp, `""` or `null`.
    pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.and_then(|text| {
            text.get(..10)
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        }))
    }

    /// Accepts a boolean, `0`/`1`, `"true"`/`"false"` or `null`.
    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Loose {
            Bool(bool),
            Number(i64),
            Text(String),
        }

        Ok(match Option::<Loose>::deserialize(deserializer)? {
            Some(Loose::Bool(b)) => b,
            Some(Loose::Number(n)) => n != 0,
            Some(Loose::Text(text)) => text.eq_ignore_ascii_case("true") || text == "1",
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient::number")]
        amount: Option<f64>,
        #[serde(default, deserialize_with = "lenient::date")]
        due: Option<NaiveDate>,
        #[serde(default, deserialize_with = "lenient::flag")]
        held: bool,
    }

    #[test]
    fn test_record_id_accepts_number_and_text() {
        let id: RecordId = serde_json::from_str("42").unwrap();
        assert_eq!(id, RecordId::Number(42));
        assert_eq!(id.to_string(), "42");

        let id: RecordId = serde_json::from_str("\"MOC-2024-001\"").unwrap();
        assert_eq!(id, RecordId::from("MOC-2024-001"));
        assert_eq!(serde_json::to_string(&RecordId::from(7)).unwrap(), "7");
    }

    #[test]
    fn test_lenient_number() {
        let sample: Sample = serde_json::from_str(r#"{"amount": "850.5000"}"#).unwrap();
        assert_eq!(sample.amount, Some(850.5));

        let sample: Sample = serde_json::from_str(r#"{"amount": 12}"#).unwrap();
        assert_eq!(sample.amount, Some(12.0));

        let sample: Sample = serde_json::from_str(r#"{"amount": ""}"#).unwrap();
        assert_eq!(sample.amount, None);

        let sample: Sample = serde_json::from_str(r#"{"amount": null}"#).unwrap();
        assert_eq!(sample.amount, None);
    }

    #[test]
    fn test_lenient_date() {
        let sample: Sample = serde_json::from_str(r#"{"due": "2024-03-10T00:00:00.000Z"}"#).unwrap();
        assert_eq!(sample.due, NaiveDate::from_ymd_opt(2024, 3, 10));

        let sample: Sample = serde_json::from_str(r#"{"due": "2024-03-10"}"#).unwrap();
        assert_eq!(sample.due, NaiveDate::from_ymd_opt(2024, 3, 10));

        let sample: Sample = serde_json::from_str(r#"{"due": ""}"#).unwrap();
        assert_eq!(sample.due, None);

        let sample: Sample = serde_json::from_str("{}").unwrap();
        assert_eq!(sample.due, None);
    }

    #[test]
    fn test_lenient_flag() {
        let sample: Sample = serde_json::from_str(r#"{"held": true}"#).unwrap();
        assert!(sample.held);
        let sample: Sample = serde_json::from_str(r#"{"held": 1}"#).unwrap();
        assert!(sample.held);
        let sample: Sample = serde_json::from_str(r#"{"held": "false"}"#).unwrap();
        assert!(!sample.held);
        let sample: Sample = serde_json::from_str(r#"{"held": null}"#).unwrap();
        assert!(!sample.held);
    }
}
