//! Metering instruments: measurement points, orifice plates and straight
//! pipe runs. None of them has a status workflow; they are typed here for
//! their derived metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::lenient;
use crate::{
    approx_reynolds, beta_ratio, due_status, roughness_class, BetaRatio, DueStatus,
    DueThresholds, RecordId, ReynoldsEstimate, RoughnessClass,
};

/// A measurement point as served by `pontos-medicao`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    /// Record identifier.
    pub id: RecordId,

    /// Point tag, e.g. `FT-101`.
    #[serde(default)]
    pub tag_ponto: Option<String>,

    /// Installation the point belongs to.
    #[serde(default)]
    pub instalacao_id: Option<RecordId>,

    /// Next calibration due date.
    #[serde(default, deserialize_with = "lenient::date")]
    pub data_proxima_calibracao: Option<NaiveDate>,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MeasurementPoint {
    /// Calibration due classification.
    pub fn calibration_status(&self, today: NaiveDate, thresholds: &DueThresholds) -> DueStatus {
        due_status(self.data_proxima_calibracao, today, thresholds)
    }
}

/// An orifice plate as served by `placas-orificio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrificePlate {
    /// Record identifier.
    pub id: RecordId,

    /// Plate serial number.
    #[serde(default)]
    pub numero_serie_placa: Option<String>,

    /// Measurement point the plate is installed at.
    #[serde(default)]
    pub ponto_medicao_id: Option<RecordId>,

    /// Bore diameter in millimetres.
    #[serde(default, deserialize_with = "lenient::number")]
    pub diametro_orificio_mm: Option<f64>,

    /// Pipe internal diameter in millimetres.
    #[serde(default, deserialize_with = "lenient::number")]
    pub diametro_tubulacao_mm: Option<f64>,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OrificePlate {
    /// Beta ratio of bore to pipe diameter.
    pub fn beta_ratio(&self) -> Option<BetaRatio> {
        beta_ratio(self.diametro_orificio_mm, self.diametro_tubulacao_mm)
    }
}

/// A straight pipe run as served by `trechos-retos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StraightRun {
    /// Record identifier.
    pub id: RecordId,

    /// Measurement point the run belongs to.
    #[serde(default)]
    pub ponto_medicao_id: Option<RecordId>,

    /// Internal diameter in millimetres.
    #[serde(default, deserialize_with = "lenient::number")]
    pub diametro_interno_mm: Option<f64>,

    /// Absolute roughness in millimetres.
    #[serde(default, deserialize_with = "lenient::number")]
    pub rugosidade_mm: Option<f64>,

    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StraightRun {
    /// Reynolds number at the nominal velocity and viscosity.
    pub fn approx_reynolds(&self) -> Option<ReynoldsEstimate> {
        approx_reynolds(self.diametro_interno_mm)
    }

    /// Surface roughness band.
    pub fn roughness_class(&self) -> Option<RoughnessClass> {
        roughness_class(self.rugosidade_mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DueKind;

    #[test]
    fn test_orifice_plate_beta_ratio() {
        let plate: OrificePlate = serde_json::from_str(
            r#"{"id": 1, "diametro_orificio_mm": "50.8", "diametro_tubulacao_mm": 101.6}"#,
        )
        .unwrap();
        assert_eq!(plate.beta_ratio().unwrap().value(), 0.5);

        let plate: OrificePlate =
            serde_json::from_str(r#"{"id": 2, "diametro_orificio_mm": 50.8, "diametro_tubulacao_mm": 0}"#)
                .unwrap();
        assert!(plate.beta_ratio().is_none());
    }

    #[test]
    fn test_straight_run_metrics() {
        let run: StraightRun =
            serde_json::from_str(r#"{"id": 1, "diametro_interno_mm": "50", "rugosidade_mm": "0.1"}"#)
                .unwrap();
        assert_eq!(run.approx_reynolds().unwrap().to_string(), "2.78e+4");
        assert_eq!(run.roughness_class(), Some(RoughnessClass::Moderate));

        let bare: StraightRun = serde_json::from_str(r#"{"id": 2}"#).unwrap();
        assert!(bare.approx_reynolds().is_none());
        assert!(bare.roughness_class().is_none());
    }

    #[test]
    fn test_measurement_point_calibration() {
        let point: MeasurementPoint = serde_json::from_str(
            r#"{"id": 1, "tag_ponto": "FT-101", "data_proxima_calibracao": "2024-06-20T00:00:00.000Z"}"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let status = point.calibration_status(today, &DueThresholds::CALIBRATION);
        assert_eq!(status.kind, DueKind::AttentionNeeded);
        assert_eq!(status.days, Some(19));
    }
}
