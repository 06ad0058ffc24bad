use chrono::NaiveDate;
use serde_json::Value;

use crate::model::{
    historical_events, AlertBadge, AlertLevel, DashboardModel, NormalizationWarning,
    PlanetaryContribution, PredictedAlert, PredictionPoint,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("payload matches no known upstream schema")]
    UnrecognizedSchema,
    #[error("payload is missing required field {field}")]
    IncompleteData { field: String },
}

/// Outcome of a successful normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Model(DashboardModel),
    /// The upstream answered with no usable documents. This is the expected
    /// empty case that routes to the fallback resolver, not an error.
    EmptyPayload,
}

/// Map raw upstream documents onto the canonical view model.
///
/// Shape detection is payload-driven: characteristic keys are probed in a
/// fixed priority order (combined-report keys before split-payload keys)
/// and the first match wins. `fetched_on` stamps payloads that omit their
/// own date; it is the only context injected from outside, keeping the
/// function pure and idempotent.
pub fn normalize(documents: &[Value], fetched_on: NaiveDate) -> Result<Normalized, NormalizeError> {
    if documents.iter().all(is_empty_document) {
        return Ok(Normalized::EmptyPayload);
    }

    if let Some(doc) = documents.iter().find(|doc| looks_like_combined(doc)) {
        return normalize_combined(doc, fetched_on).map(Normalized::Model);
    }

    if let Some(current) = documents.iter().find(|doc| looks_like_current_state(doc)) {
        let prediction = documents.iter().find(|doc| looks_like_prediction(doc));
        return normalize_split(current, prediction, fetched_on).map(Normalized::Model);
    }

    Err(NormalizeError::UnrecognizedSchema)
}

// Covers the empty slice as well: `all` is vacuously true.
fn is_empty_document(doc: &Value) -> bool {
    match doc {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn looks_like_combined(doc: &Value) -> bool {
    doc.get("ftrt").is_some() || doc.get("ftrt_total").is_some()
}

fn looks_like_current_state(doc: &Value) -> bool {
    doc.get("ftrt_valor").is_some()
}

fn looks_like_prediction(doc: &Value) -> bool {
    doc.get("valores_diarios").is_some()
}

fn missing(field: &str) -> NormalizeError {
    NormalizeError::IncompleteData {
        field: field.to_owned(),
    }
}

/// Shape A: flat combined report.
///
/// `{ftrt | ftrt_total, alert_level: {level, color}, date, energy_levels?}`
/// with percentage fields already scaled to [0, 100].
fn normalize_combined(doc: &Value, fetched_on: NaiveDate) -> Result<DashboardModel, NormalizeError> {
    let mut warnings = Vec::new();

    let raw_ftrt = doc
        .get("ftrt")
        .or_else(|| doc.get("ftrt_total"))
        .and_then(Value::as_f64)
        .ok_or_else(|| missing("ftrt"))?;
    let ftrt_value = clamp_non_negative(raw_ftrt, "ftrt", &mut warnings);

    let level_label = doc
        .pointer("/alert_level/level")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("alert_level.level"))?;
    let level = parse_alert_level(level_label, &mut warnings);
    let color_tag = doc
        .pointer("/alert_level/color")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| level.color_tag().to_owned());

    let as_of = optional_date(doc.get("date"), "date", fetched_on)?;

    let mut energy_levels = Vec::new();
    if let Some(map) = doc.get("energy_levels").and_then(Value::as_object) {
        for (name, value) in map {
            match value.as_f64() {
                Some(raw) => {
                    let field = format!("energy_levels.{name}");
                    energy_levels.push((name.clone(), clamp_percentage(raw, &field, &mut warnings)));
                }
                None => warnings.push(NormalizationWarning::EntryDropped {
                    field: format!("energy_levels.{name}"),
                }),
            }
        }
    }
    energy_levels.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(DashboardModel {
        ftrt_value,
        alert: AlertBadge { level, color_tag },
        as_of,
        energy_levels,
        planetary_contributions: Vec::new(),
        historical_events: historical_events(),
        prediction_series: Vec::new(),
        predicted_alerts: Vec::new(),
        warnings,
    })
}

/// Shape B: split current-state plus prediction pair.
///
/// Current: `{ftrt_valor, nivel_riesgo, fecha?, contribuciones_planetarias?}`
/// where contributions are fractions in [0, 1] rescaled ×100 — the rescaling
/// rule is bound to this shape, never inferred from value magnitude.
/// Prediction: `{valores_diarios: [{fecha, ftrt}], alertas: [{fecha, ftrt,
/// nivel}]}`; absent prediction document yields an empty series.
fn normalize_split(
    current: &Value,
    prediction: Option<&Value>,
    fetched_on: NaiveDate,
) -> Result<DashboardModel, NormalizeError> {
    let mut warnings = Vec::new();

    let raw_ftrt = current
        .get("ftrt_valor")
        .and_then(Value::as_f64)
        .ok_or_else(|| missing("ftrt_valor"))?;
    let ftrt_value = clamp_non_negative(raw_ftrt, "ftrt_valor", &mut warnings);

    let level_label = current
        .get("nivel_riesgo")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("nivel_riesgo"))?;
    let level = parse_alert_level(level_label, &mut warnings);

    let as_of = optional_date(current.get("fecha"), "fecha", fetched_on)?;

    let mut planetary_contributions = Vec::new();
    if let Some(map) = current
        .get("contribuciones_planetarias")
        .and_then(Value::as_object)
    {
        for (planet, value) in map {
            match value.as_f64() {
                Some(fraction) => {
                    let field = format!("contribuciones_planetarias.{planet}");
                    planetary_contributions.push(PlanetaryContribution {
                        planet: planet.clone(),
                        percentage: clamp_percentage(fraction * 100.0, &field, &mut warnings),
                        constellation: None,
                    });
                }
                None => warnings.push(NormalizationWarning::EntryDropped {
                    field: format!("contribuciones_planetarias.{planet}"),
                }),
            }
        }
    }
    sort_contributions(&mut planetary_contributions);

    let (prediction_series, predicted_alerts) = match prediction {
        Some(doc) => normalize_prediction(doc, &mut warnings),
        None => (Vec::new(), Vec::new()),
    };

    Ok(DashboardModel {
        ftrt_value,
        alert: AlertBadge::canonical(level),
        as_of,
        energy_levels: Vec::new(),
        planetary_contributions,
        historical_events: historical_events(),
        prediction_series,
        predicted_alerts,
        warnings,
    })
}

fn normalize_prediction(
    doc: &Value,
    warnings: &mut Vec<NormalizationWarning>,
) -> (Vec<PredictionPoint>, Vec<PredictedAlert>) {
    let mut series = Vec::new();
    if let Some(entries) = doc.get("valores_diarios").and_then(Value::as_array) {
        for entry in entries {
            let date = entry
                .get("fecha")
                .and_then(Value::as_str)
                .and_then(parse_calendar_date);
            let ftrt = entry.get("ftrt").and_then(Value::as_f64);
            match (date, ftrt) {
                (Some(date), Some(raw)) => series.push(PredictionPoint {
                    date,
                    ftrt_value: clamp_non_negative(raw, "valores_diarios.ftrt", warnings),
                }),
                _ => warnings.push(NormalizationWarning::EntryDropped {
                    field: "valores_diarios".to_owned(),
                }),
            }
        }
    }
    // Input order is not trusted: sort, then drop duplicate dates so the
    // strictly-increasing invariant always holds on output.
    series.sort_by_key(|point| point.date);
    let mut deduped: Vec<PredictionPoint> = Vec::with_capacity(series.len());
    for point in series {
        if deduped.last().is_some_and(|prev| prev.date == point.date) {
            warnings.push(NormalizationWarning::DuplicatePredictionDate { date: point.date });
        } else {
            deduped.push(point);
        }
    }

    let mut alerts = Vec::new();
    if let Some(entries) = doc.get("alertas").and_then(Value::as_array) {
        for entry in entries {
            let date = entry
                .get("fecha")
                .and_then(Value::as_str)
                .and_then(parse_calendar_date);
            let ftrt = entry.get("ftrt").and_then(Value::as_f64);
            let level = entry.get("nivel").and_then(Value::as_str);
            match (date, ftrt, level) {
                (Some(date), Some(raw), Some(label)) => alerts.push(PredictedAlert {
                    date,
                    ftrt_value: clamp_non_negative(raw, "alertas.ftrt", warnings),
                    level: parse_alert_level(label, warnings),
                }),
                _ => warnings.push(NormalizationWarning::EntryDropped {
                    field: "alertas".to_owned(),
                }),
            }
        }
    }
    alerts.sort_by_key(|alert| alert.date);

    (deduped, alerts)
}

fn parse_alert_level(raw: &str, warnings: &mut Vec<NormalizationWarning>) -> AlertLevel {
    match AlertLevel::from_label(raw) {
        Some(level) => level,
        None => {
            warnings.push(NormalizationWarning::UnknownAlertLevel {
                raw: raw.to_owned(),
            });
            AlertLevel::Nominal
        }
    }
}

/// A present-but-unparsable date is reported as incomplete data naming the
/// field; an absent date falls back to the acquisition date, matching the
/// upstream services that stamp "now" on every response.
fn optional_date(
    value: Option<&Value>,
    field: &str,
    fetched_on: NaiveDate,
) -> Result<NaiveDate, NormalizeError> {
    match value {
        None | Some(Value::Null) => Ok(fetched_on),
        Some(value) => value
            .as_str()
            .and_then(parse_calendar_date)
            .ok_or_else(|| missing(field)),
    }
}

/// Parse `YYYY-MM-DD`, tolerating an appended time component as emitted by
/// the prediction service.
fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn clamp_non_negative(raw: f64, field: &str, warnings: &mut Vec<NormalizationWarning>) -> f64 {
    if raw < 0.0 {
        warnings.push(NormalizationWarning::ValueClamped {
            field: field.to_owned(),
            raw,
        });
        0.0
    } else {
        raw
    }
}

fn clamp_percentage(raw: f64, field: &str, warnings: &mut Vec<NormalizationWarning>) -> f64 {
    if !(0.0..=100.0).contains(&raw) {
        warnings.push(NormalizationWarning::ValueClamped {
            field: field.to_owned(),
            raw,
        });
        raw.clamp(0.0, 100.0)
    } else {
        raw
    }
}

fn sort_contributions(contributions: &mut [PlanetaryContribution]) {
    contributions.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.planet.cmp(&b.planet))
    });
}
