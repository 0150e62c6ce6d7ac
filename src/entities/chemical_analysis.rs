//! Laboratory chemical analysis of a fluid sample.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::lenient;
use crate::{
    api_gravity, ApiGravity, EntityType, RecordId, Result, StatusWorkflowDefinition,
    WorkflowRecord, WorkflowState,
};

/// Status of a chemical analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChemicalAnalysisStatus {
    /// Sample collected in the field.
    #[serde(rename = "Coletada")]
    Collected,
    /// Sample received by the laboratory.
    #[serde(rename = "Recebida")]
    Received,
    /// Analysis under way.
    #[serde(rename = "Em Análise", alias = "Em Analise")]
    InAnalysis,
    /// Results issued.
    #[serde(rename = "Concluída", alias = "Concluida")]
    Completed,
    /// Analysis abandoned.
    #[serde(rename = "Cancelada")]
    Cancelled,
}

impl WorkflowState for ChemicalAnalysisStatus {
    fn entity() -> EntityType {
        EntityType::ChemicalAnalysis
    }

    fn all() -> &'static [Self] {
        &[
            Self::Collected,
            Self::Received,
            Self::InAnalysis,
            Self::Completed,
            Self::Cancelled,
        ]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Collected => "Collected",
            Self::Received => "Received",
            Self::InAnalysis => "In Analysis",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Self::Collected => "Coletada",
            Self::Received => "Recebida",
            Self::InAnalysis => "Em Análise",
            Self::Completed => "Concluída",
            Self::Cancelled => "Cancelada",
        }
    }

    fn progress_percent(&self) -> Option<u8> {
        Some(match self {
            Self::Collected => 20,
            Self::Received => 40,
            Self::InAnalysis => 70,
            Self::Completed => 100,
            Self::Cancelled => 0,
        })
    }

    fn definition() -> Result<StatusWorkflowDefinition<Self>> {
        use ChemicalAnalysisStatus::*;

        StatusWorkflowDefinition::builder()
            .states(Self::all().iter().copied())
            .initial(Collected)
            .terminal([Completed, Cancelled])
            .transition(Collected, Received, "Receive", "recebida")
            .transition(Received, InAnalysis, "Start Analysis", "em-analise")
            .transition(InAnalysis, Completed, "Conclude", "concluida")
            .transition_from_each(&[Collected, Received, InAnalysis], Cancelled, "Cancel", "cancelada")
            .build()
    }
}

impl fmt::Display for ChemicalAnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A chemical analysis record as served by `analises-quimicas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalAnalysis {
    /// Record identifier.
    pub id: RecordId,

    /// Laboratory reference number.
    #[serde(default)]
    pub numero_analise: Option<String>,

    /// Current status.
    pub status_analise: ChemicalAnalysisStatus,

    /// Measurement point the sample was taken from.
    #[serde(default)]
    pub ponto_medicao_id: Option<RecordId>,

    /// Sample kind (oil, gas, water).
    #[serde(default)]
    pub tipo_amostra: Option<String>,

    /// Collection date.
    #[serde(default, deserialize_with = "lenient::date")]
    pub data_coleta: Option<NaiveDate>,

    /// Density at 20 °C in kg/m³.
    #[serde(default, deserialize_with = "lenient::number")]
    pub densidade_20c_kg_m3: Option<f64>,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChemicalAnalysis {
    /// °API gravity derived from the 20 °C density.
    pub fn api_gravity(&self) -> Option<ApiGravity> {
        api_gravity(self.densidade_20c_kg_m3)
    }
}

impl WorkflowRecord for ChemicalAnalysis {
    type State = ChemicalAnalysisStatus;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn state(&self) -> Self::State {
        self.status_analise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_builds() {
        let definition = ChemicalAnalysisStatus::definition().unwrap();
        assert_eq!(definition.initial_state(), ChemicalAnalysisStatus::Collected);
        assert!(definition.unreachable_states().is_empty());
    }

    #[test]
    fn test_wire_names_round_trip() {
        for &state in ChemicalAnalysisStatus::all() {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.wire_name()));
            let back: ChemicalAnalysisStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, state);
        }
        let unaccented: ChemicalAnalysisStatus = serde_json::from_str("\"Em Analise\"").unwrap();
        assert_eq!(unaccented, ChemicalAnalysisStatus::InAnalysis);
    }

    #[test]
    fn test_parse_accepts_label_or_wire_name() {
        assert_eq!(
            ChemicalAnalysisStatus::parse("in analysis"),
            Some(ChemicalAnalysisStatus::InAnalysis)
        );
        assert_eq!(
            ChemicalAnalysisStatus::parse("Concluída"),
            Some(ChemicalAnalysisStatus::Completed)
        );
        assert_eq!(ChemicalAnalysisStatus::parse("Pendente"), None);
    }

    #[test]
    fn test_progress() {
        assert_eq!(ChemicalAnalysisStatus::InAnalysis.progress_percent(), Some(70));
        assert_eq!(ChemicalAnalysisStatus::Cancelled.progress_percent(), Some(0));
    }

    #[test]
    fn test_record_decodes_and_keeps_extra_fields() {
        let json = r#"{
            "id": 3,
            "numero_analise": "AQ-2024-003",
            "status_analise": "Coletada",
            "densidade_20c_kg_m3": "850.0000",
            "data_coleta": "2024-05-02T00:00:00.000Z",
            "teor_agua_percentual": "0.12"
        }"#;
        let record: ChemicalAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(record.state(), ChemicalAnalysisStatus::Collected);
        assert_eq!(record.api_gravity().unwrap().value(), 34.97);
        assert_eq!(record.data_coleta, NaiveDate::from_ymd_opt(2024, 5, 2));
        assert_eq!(record.extra["teor_agua_percentual"], "0.12");

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["teor_agua_percentual"], "0.12");
        assert_eq!(out["status_analise"], "Coletada");
    }

    #[test]
    fn test_missing_density_has_no_gravity() {
        let record: ChemicalAnalysis =
            serde_json::from_str(r#"{"id": 1, "status_analise": "Recebida"}"#).unwrap();
        assert!(record.api_gravity().is_none());
    }
}
