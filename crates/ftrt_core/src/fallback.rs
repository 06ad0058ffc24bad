use chrono::NaiveDate;

use crate::model::{
    historical_events, AlertBadge, AlertLevel, DashboardModel, PlanetaryContribution,
};

/// Deterministic illustrative model served when no live data is available:
/// upstream unreachable, normalization failed, empty payload, or no endpoint
/// configured. Everything is fixed apart from the injected `as_of` date.
pub fn fallback_model(as_of: NaiveDate) -> DashboardModel {
    DashboardModel {
        ftrt_value: 2.943,
        alert: AlertBadge::canonical(AlertLevel::Critical),
        as_of,
        energy_levels: vec![
            ("integration".to_owned(), 44.1),
            ("intensity".to_owned(), 53.0),
            ("revelation".to_owned(), 64.7),
            ("transformation".to_owned(), 58.9),
        ],
        planetary_contributions: contributions(),
        historical_events: historical_events(),
        prediction_series: Vec::new(),
        predicted_alerts: Vec::new(),
        warnings: Vec::new(),
    }
}

// Representative configuration from the reference dashboard, descending by
// contribution.
fn contributions() -> Vec<PlanetaryContribution> {
    let table = [
        ("jupiter", 28.7, "Tauro"),
        ("saturn", 18.3, "Piscis"),
        ("mercury", 15.8, "Tauro"),
        ("venus", 12.4, "Aries"),
        ("earth", 9.2, "Tauro"),
        ("uranus", 8.5, "Tauro"),
        ("neptune", 4.2, "Piscis"),
        ("mars", 3.1, "Piscis"),
    ];
    table
        .into_iter()
        .map(|(planet, percentage, constellation)| PlanetaryContribution {
            planet: planet.to_owned(),
            percentage,
            constellation: Some(constellation.to_owned()),
        })
        .collect()
}
