//! Derived engineering metrics.
//!
//! Pure functions computed from record fields at display time. Every
//! calculator returns `None` for missing, zero or negative inputs instead of
//! producing `NaN` or infinities, so a display layer can render "n/a".

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Flow velocity assumed by [`approx_reynolds`], in m/s.
pub const DEFAULT_VELOCITY_MPS: f64 = 10.0;

/// Kinematic viscosity assumed by [`approx_reynolds`], in m²/s.
pub const DEFAULT_KINEMATIC_VISCOSITY: f64 = 0.000018;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Ratio of orifice bore to pipe internal diameter, rounded to 4 places.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct BetaRatio(f64);

impl BetaRatio {
    /// The rounded ratio.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for BetaRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Computes the beta ratio `d / D`.
pub fn beta_ratio(orifice_diameter_mm: Option<f64>, pipe_diameter_mm: Option<f64>) -> Option<BetaRatio> {
    let orifice = positive(orifice_diameter_mm)?;
    let pipe = positive(pipe_diameter_mm)?;
    Some(BetaRatio(round_to(orifice / pipe, 4)))
}

/// °API gravity, rounded to 2 places.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ApiGravity(f64);

impl ApiGravity {
    /// The rounded gravity in degrees API.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for ApiGravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Converts a density at 20 °C in kg/m³ to °API.
pub fn api_gravity(density_20c_kg_m3: Option<f64>) -> Option<ApiGravity> {
    let density_g_cm3 = positive(density_20c_kg_m3)? / 1000.0;
    Some(ApiGravity(round_to(141.5 / density_g_cm3 - 131.5, 2)))
}

/// Order-of-magnitude Reynolds number.
///
/// Computed from fixed illustrative velocity and viscosity, not from
/// measured flow conditions. Displays in scientific notation with two
/// decimals and a signed exponent, e.g. `2.78e+4`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ReynoldsEstimate(f64);

impl ReynoldsEstimate {
    /// The unrounded estimate.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for ReynoldsEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = format!("{:.2e}", self.0);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                write!(f, "{mantissa}e+{exponent}")
            }
            _ => f.write_str(&formatted),
        }
    }
}

/// Estimates the Reynolds number with the default velocity and viscosity.
pub fn approx_reynolds(internal_diameter_mm: Option<f64>) -> Option<ReynoldsEstimate> {
    approx_reynolds_with(
        internal_diameter_mm,
        DEFAULT_VELOCITY_MPS,
        DEFAULT_KINEMATIC_VISCOSITY,
    )
}

/// Estimates `v·D/ν` for a diameter in millimetres.
pub fn approx_reynolds_with(
    internal_diameter_mm: Option<f64>,
    velocity_mps: f64,
    kinematic_viscosity: f64,
) -> Option<ReynoldsEstimate> {
    let diameter_m = positive(internal_diameter_mm)? / 1000.0;
    let viscosity = positive(Some(kinematic_viscosity))?;
    if !velocity_mps.is_finite() {
        return None;
    }
    Some(ReynoldsEstimate(velocity_mps * diameter_m / viscosity))
}

/// Classification of a target date against today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DueKind {
    /// The date is today or in the past.
    Overdue,
    /// Within the urgent window.
    Urgent,
    /// Within the attention window.
    AttentionNeeded,
    /// Comfortably in the future.
    OnTrack,
    /// No date recorded.
    Unscheduled,
}

impl fmt::Display for DueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Overdue => "Overdue",
            Self::Urgent => "Urgent",
            Self::AttentionNeeded => "Attention needed",
            Self::OnTrack => "On track",
            Self::Unscheduled => "Unscheduled",
        };
        f.write_str(label)
    }
}

/// Day-count windows for [`due_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueThresholds {
    /// Days remaining at or below which the date is urgent.
    pub urgent_days: i64,
    /// Days remaining at or below which the date needs attention.
    #[serde(default)]
    pub attention_days: Option<i64>,
}

impl DueThresholds {
    /// Next calibration of a measurement point.
    pub const CALIBRATION: Self = Self {
        urgent_days: 7,
        attention_days: Some(30),
    };

    /// Warranty expiry of a stock item.
    pub const WARRANTY: Self = Self {
        urgent_days: 30,
        attention_days: None,
    };

    /// Next inspection of a stock item.
    pub const INSPECTION: Self = Self {
        urgent_days: 15,
        attention_days: None,
    };
}

/// Result of [`due_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueStatus {
    /// The classification.
    pub kind: DueKind,
    /// Signed days from today to the target; negative once past.
    pub days: Option<i64>,
}

impl DueStatus {
    /// Absolute day difference, handy for "n days overdue" labels.
    pub fn days_magnitude(&self) -> Option<i64> {
        self.days.map(i64::abs)
    }
}

/// Classifies a target date against `today`.
pub fn due_status(target: Option<NaiveDate>, today: NaiveDate, thresholds: &DueThresholds) -> DueStatus {
    let Some(target) = target else {
        return DueStatus {
            kind: DueKind::Unscheduled,
            days: None,
        };
    };

    let days = (target - today).num_days();
    let kind = if days <= 0 {
        DueKind::Overdue
    } else if days <= thresholds.urgent_days {
        DueKind::Urgent
    } else if thresholds.attention_days.is_some_and(|limit| days <= limit) {
        DueKind::AttentionNeeded
    } else {
        DueKind::OnTrack
    };

    DueStatus {
        kind,
        days: Some(days),
    }
}

/// [`due_status`] against the UTC calendar date of `now`.
pub fn due_status_at(target: Option<NaiveDate>, now: DateTime<Utc>, thresholds: &DueThresholds) -> DueStatus {
    due_status(target, now.date_naive(), thresholds)
}

/// Surface roughness band of a straight pipe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoughnessClass {
    /// ≤ 0.05 mm.
    Smooth,
    /// ≤ 0.15 mm.
    Moderate,
    /// ≤ 0.5 mm.
    Rough,
    /// Above 0.5 mm.
    VeryRough,
}

impl fmt::Display for RoughnessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Smooth => "smooth",
            Self::Moderate => "moderate",
            Self::Rough => "rough",
            Self::VeryRough => "very rough",
        };
        f.write_str(label)
    }
}

/// Bands an absolute roughness given in millimetres.
pub fn roughness_class(roughness_mm: Option<f64>) -> Option<RoughnessClass> {
    let value = positive(roughness_mm)?;
    let class = if value <= 0.05 {
        RoughnessClass::Smooth
    } else if value <= 0.15 {
        RoughnessClass::Moderate
    } else if value <= 0.5 {
        RoughnessClass::Rough
    } else {
        RoughnessClass::VeryRough
    };
    Some(class)
}

/// Days a loan is past its expected return date, if it is.
pub fn days_overdue(expected: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    let days = (today - expected?).num_days();
    (days > 0).then_some(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn days_from_today(days: i64) -> Option<NaiveDate> {
        Some(today() + Duration::days(days))
    }

    #[test]
    fn test_beta_ratio() {
        let beta = beta_ratio(Some(50.0), Some(100.0)).unwrap();
        assert_eq!(beta.value(), 0.5);
        assert_eq!(beta.to_string(), "0.5000");

        let beta = beta_ratio(Some(63.5), Some(154.05)).unwrap();
        assert_eq!(beta.to_string(), "0.4122");
    }

    #[test]
    fn test_beta_ratio_undefined_inputs() {
        assert!(beta_ratio(Some(50.0), Some(0.0)).is_none());
        assert!(beta_ratio(Some(50.0), Some(-10.0)).is_none());
        assert!(beta_ratio(None, Some(100.0)).is_none());
        assert!(beta_ratio(Some(0.0), Some(100.0)).is_none());
        assert!(beta_ratio(Some(f64::NAN), Some(100.0)).is_none());
    }

    #[test]
    fn test_api_gravity() {
        let api = api_gravity(Some(850.0)).unwrap();
        assert_eq!(api.value(), 34.97);
        assert_eq!(api.to_string(), "34.97");

        // Water is 10 °API by definition.
        let water = api_gravity(Some(1000.0)).unwrap();
        assert_eq!(water.value(), 10.0);
    }

    #[test]
    fn test_api_gravity_undefined_inputs() {
        assert!(api_gravity(None).is_none());
        assert!(api_gravity(Some(0.0)).is_none());
        assert!(api_gravity(Some(-850.0)).is_none());
    }

    #[test]
    fn test_approx_reynolds() {
        let re = approx_reynolds(Some(50.0)).unwrap();
        assert!((re.value() - 27_777.777).abs() < 0.01);
        assert_eq!(re.to_string(), "2.78e+4");

        let re = approx_reynolds(Some(254.0)).unwrap();
        assert_eq!(re.to_string(), "1.41e+5");

        assert!(approx_reynolds(None).is_none());
        assert!(approx_reynolds(Some(0.0)).is_none());
    }

    #[test]
    fn test_reynolds_negative_exponent_display() {
        let re = approx_reynolds_with(Some(0.001), 0.001, 1.0).unwrap();
        assert_eq!(re.to_string(), "1.00e-9");
        assert!(approx_reynolds_with(Some(50.0), 10.0, 0.0).is_none());
    }

    #[test]
    fn test_due_status_calibration_windows() {
        let t = &DueThresholds::CALIBRATION;

        let status = due_status(days_from_today(-1), today(), t);
        assert_eq!(status.kind, DueKind::Overdue);
        assert_eq!(status.days, Some(-1));
        assert_eq!(status.days_magnitude(), Some(1));

        assert_eq!(due_status(days_from_today(0), today(), t).kind, DueKind::Overdue);
        assert_eq!(due_status(days_from_today(1), today(), t).kind, DueKind::Urgent);
        assert_eq!(due_status(days_from_today(7), today(), t).kind, DueKind::Urgent);
        assert_eq!(due_status(days_from_today(8), today(), t).kind, DueKind::AttentionNeeded);
        assert_eq!(due_status(days_from_today(30), today(), t).kind, DueKind::AttentionNeeded);
        assert_eq!(due_status(days_from_today(31), today(), t).kind, DueKind::OnTrack);
    }

    #[test]
    fn test_due_status_warranty_and_inspection() {
        let warranty = &DueThresholds::WARRANTY;
        assert_eq!(due_status(days_from_today(30), today(), warranty).kind, DueKind::Urgent);
        assert_eq!(due_status(days_from_today(31), today(), warranty).kind, DueKind::OnTrack);

        let inspection = &DueThresholds::INSPECTION;
        assert_eq!(due_status(days_from_today(15), today(), inspection).kind, DueKind::Urgent);
        assert_eq!(due_status(days_from_today(16), today(), inspection).kind, DueKind::OnTrack);
        assert_eq!(due_status(days_from_today(-40), today(), inspection).kind, DueKind::Overdue);
    }

    #[test]
    fn test_due_status_unscheduled() {
        let status = due_status(None, today(), &DueThresholds::CALIBRATION);
        assert_eq!(status.kind, DueKind::Unscheduled);
        assert_eq!(status.days, None);
    }

    #[test]
    fn test_due_status_at_uses_utc_date() {
        let now = today().and_hms_opt(23, 59, 0).unwrap().and_utc();
        let status = due_status_at(days_from_today(-1), now, &DueThresholds::CALIBRATION);
        assert_eq!(status.kind, DueKind::Overdue);
        assert_eq!(status.days_magnitude(), Some(1));
    }

    #[test]
    fn test_roughness_class() {
        assert_eq!(roughness_class(Some(0.045)), Some(RoughnessClass::Smooth));
        assert_eq!(roughness_class(Some(0.15)), Some(RoughnessClass::Moderate));
        assert_eq!(roughness_class(Some(0.3)), Some(RoughnessClass::Rough));
        assert_eq!(roughness_class(Some(1.2)), Some(RoughnessClass::VeryRough));
        assert_eq!(roughness_class(None), None);
        assert_eq!(roughness_class(Some(0.0)), None);
    }

    #[test]
    fn test_days_overdue() {
        assert_eq!(days_overdue(days_from_today(-3), today()), Some(3));
        assert_eq!(days_overdue(days_from_today(0), today()), None);
        assert_eq!(days_overdue(days_from_today(5), today()), None);
        assert_eq!(days_overdue(None, today()), None);
    }
}
