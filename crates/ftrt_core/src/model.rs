use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

/// Risk classification attached to an FTRT value.
///
/// Upstream services emit free-form strings (English and Spanish, mixed
/// case); `from_label` folds them through a fixed lookup table. Anything
/// outside the table degrades to `Nominal` with a recorded warning rather
/// than being escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Nominal,
    Elevated,
    Critical,
    Extreme,
}

impl AlertLevel {
    /// Canonical presentational tag for the level.
    pub fn color_tag(self) -> &'static str {
        match self {
            AlertLevel::Nominal => "🟢",
            AlertLevel::Elevated => "🟠",
            AlertLevel::Critical => "🔴",
            AlertLevel::Extreme => "💜",
        }
    }

    /// Threshold classification for a raw FTRT value.
    ///
    /// Used only for derived summaries (e.g. ranking the prediction peak);
    /// live alert levels always come from the upstream label so a garbled
    /// payload can never escalate itself.
    pub fn classify(ftrt: f64) -> AlertLevel {
        if ftrt >= 4.0 {
            AlertLevel::Extreme
        } else if ftrt >= 2.5 {
            AlertLevel::Critical
        } else if ftrt >= 1.2 {
            AlertLevel::Elevated
        } else {
            AlertLevel::Nominal
        }
    }

    pub(crate) fn from_label(raw: &str) -> Option<AlertLevel> {
        let folded: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'á' => 'a',
                'é' => 'e',
                'í' => 'i',
                'ó' => 'o',
                'ú' => 'u',
                other => other,
            })
            .collect();
        match folded.as_str() {
            "normal" | "nominal" | "bajo" | "low" => Some(AlertLevel::Nominal),
            "moderado" | "moderate" | "elevado" | "elevated" | "medio" | "medium" => {
                Some(AlertLevel::Elevated)
            }
            "alto" | "high" | "critico" | "critical" => Some(AlertLevel::Critical),
            "extremo" | "extreme" => Some(AlertLevel::Extreme),
            _ => None,
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Nominal => write!(f, "NOMINAL"),
            AlertLevel::Elevated => write!(f, "ELEVATED"),
            AlertLevel::Critical => write!(f, "CRITICAL"),
            AlertLevel::Extreme => write!(f, "EXTREME"),
        }
    }
}

/// Normalized risk classification plus its presentational tag.
///
/// `color_tag` is carried through from upstream when present and is not
/// semantically load-bearing.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertBadge {
    pub level: AlertLevel,
    pub color_tag: String,
}

impl AlertBadge {
    pub fn canonical(level: AlertLevel) -> Self {
        Self {
            level,
            color_tag: level.color_tag().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanetaryContribution {
    pub planet: String,
    /// Share of the total tidal force, in [0, 100].
    pub percentage: f64,
    pub constellation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalEvent {
    pub name: String,
    pub ftrt_value: f64,
    pub level: AlertLevel,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionPoint {
    pub date: NaiveDate,
    pub ftrt_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedAlert {
    pub date: NaiveDate,
    pub ftrt_value: f64,
    pub level: AlertLevel,
}

/// Non-fatal degradation recorded while normalizing a payload.
///
/// Warnings ride on the successfully produced model; they are never
/// treated as failures.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationWarning {
    /// Upstream alert-level string not in the lookup table; defaulted to Nominal.
    UnknownAlertLevel { raw: String },
    /// Numeric field outside its valid range; clamped.
    ValueClamped { field: String, raw: f64 },
    /// Map or array entry dropped because it was not usable.
    EntryDropped { field: String },
    /// Prediction entry dropped because its date duplicated an earlier one.
    DuplicatePredictionDate { date: NaiveDate },
}

/// The canonical view model every upstream schema variant converges to.
///
/// Immutable once constructed: each refresh cycle builds a new instance
/// that atomically replaces the previous one in the store, so readers
/// never observe a model assembled from two different cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardModel {
    pub ftrt_value: f64,
    pub alert: AlertBadge,
    pub as_of: NaiveDate,
    /// Category name to percentage in [0, 100], sorted by name. Empty when
    /// upstream omits it.
    pub energy_levels: Vec<(String, f64)>,
    /// Ordered descending by percentage for display.
    pub planetary_contributions: Vec<PlanetaryContribution>,
    /// Static reference set, independent of live upstream data.
    pub historical_events: Vec<HistoricalEvent>,
    /// Chronological, strictly increasing dates.
    pub prediction_series: Vec<PredictionPoint>,
    /// Threshold-crossing subset of the prediction horizon, chronological.
    pub predicted_alerts: Vec<PredictedAlert>,
    pub warnings: Vec<NormalizationWarning>,
}

impl DashboardModel {
    /// Highest point of the prediction horizon, recomputed from the series
    /// rather than trusted from upstream summary fields.
    pub fn peak_prediction(&self) -> Option<PredictionPoint> {
        self.prediction_series
            .iter()
            .copied()
            .max_by(|a, b| {
                a.ftrt_value
                    .partial_cmp(&b.ftrt_value)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

/// Reference events displayed for comparison against the live index.
pub fn historical_events() -> Vec<HistoricalEvent> {
    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid historical date")
    }

    vec![
        HistoricalEvent {
            name: "Carrington 1859".to_owned(),
            ftrt_value: 3.21,
            level: AlertLevel::Extreme,
            date: date(1859, 9, 1),
        },
        HistoricalEvent {
            name: "Halloween 2003".to_owned(),
            ftrt_value: 4.87,
            level: AlertLevel::Extreme,
            date: date(2003, 10, 29),
        },
        HistoricalEvent {
            name: "May 2024 storm".to_owned(),
            ftrt_value: 2.94,
            level: AlertLevel::Critical,
            date: date(2024, 5, 10),
        },
    ]
}
