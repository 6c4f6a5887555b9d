use crate::models::customer::InstallationType;

/// Baseline deal value in pounds for an installation type.
pub fn estimated_value(kind: InstallationType) -> f64 {
    match kind {
        InstallationType::HeatPump => 12_000.0,
        InstallationType::Solar => 15_000.0,
        InstallationType::Battery => 8_000.0,
        InstallationType::HeatPumpSolar => 25_000.0,
        InstallationType::HeatPumpSolarBattery => 35_000.0,
        InstallationType::Mvhr => 5_000.0,
        InstallationType::GreenBuild => 50_000.0,
    }
}

/// Same lookup keyed by the raw form value; anything unrecognized is worth 0.
pub fn estimated_value_for(raw: &str) -> f64 {
    InstallationType::try_from(raw.trim())
        .map(estimated_value)
        .unwrap_or(0.0)
}
