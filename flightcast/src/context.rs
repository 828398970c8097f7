//! Flight context snapshot handed to the prompt builder.
//!
//! The pipeline treats context as an opaque JSON value. This module is the
//! typed shape front ends fill in before serializing it with
//! [`FlightContext::to_value`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Probability at or below which a predicted delay is not shown.
pub const DELAY_PROBABILITY_FLOOR: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightContext {
    pub flight: FlightInfo,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub prediction: Option<DelayPrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightInfo {
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    /// Scheduled departure as `HHMM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_departure: Option<u16>,
}

/// Destination weather at departure time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature_f: f64,
    pub humidity_pct: f64,
    pub pressure_mb: f64,
    pub wind_mph: f64,
    pub cloudiness_pct: f64,
    pub visibility_mi: f64,
    pub precip_in: f64,
    pub snow_in: f64,
}

impl WeatherSnapshot {
    pub fn is_bad_weather(&self) -> bool {
        self.wind_mph > 15.0 || self.precip_in > 0.1 || self.visibility_mi < 5.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a probability in `[0, 1]`.
    pub fn from_probability(probability: f64) -> Self {
        let percent = probability * 100.0;
        if percent < 30.0 {
            RiskLevel::Low
        } else if percent < 60.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw model output for one flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayPrediction {
    pub departure_delay_minutes: f64,
    pub departure_probability: f64,
    pub arrival_delay_minutes: f64,
    pub arrival_probability: f64,
}

impl DelayPrediction {
    pub fn effective_departure_delay(&self) -> f64 {
        effective_delay(self.departure_delay_minutes, self.departure_probability)
    }

    pub fn effective_arrival_delay(&self) -> f64 {
        effective_delay(self.arrival_delay_minutes, self.arrival_probability)
    }

    pub fn departure_risk(&self) -> RiskLevel {
        RiskLevel::from_probability(self.departure_probability)
    }

    pub fn arrival_risk(&self) -> RiskLevel {
        RiskLevel::from_probability(self.arrival_probability)
    }
}

fn effective_delay(minutes: f64, probability: f64) -> f64 {
    if probability > DELAY_PROBABILITY_FLOOR {
        minutes.max(0.0)
    } else {
        0.0
    }
}

impl FlightContext {
    pub fn new(flight: FlightInfo) -> Self {
        Self {
            flight,
            weather: None,
            prediction: None,
        }
    }

    pub fn with_weather(mut self, weather: WeatherSnapshot) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_prediction(mut self, prediction: DelayPrediction) -> Self {
        self.prediction = Some(prediction);
        self
    }

    /// Serialize for the prompt, with a derived `summary` block.
    ///
    /// Missing weather or prediction stays `null` so the model reports it as
    /// unavailable.
    pub fn to_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);

        let summary = json!({
            "badWeather": self.weather.as_ref().map(WeatherSnapshot::is_bad_weather),
            "departureRisk": self.prediction.as_ref().map(|p| p.departure_risk().as_str()),
            "arrivalRisk": self.prediction.as_ref().map(|p| p.arrival_risk().as_str()),
            "expectedDepartureDelayMinutes": self
                .prediction
                .as_ref()
                .map(|p| p.effective_departure_delay().round()),
            "expectedArrivalDelayMinutes": self
                .prediction
                .as_ref()
                .map(|p| p.effective_arrival_delay().round()),
        });

        if let Value::Object(map) = &mut value {
            map.insert("summary".to_string(), summary);
        }
        value
    }
}

/// Parse `HHMM` into a validated departure time.
pub fn parse_hhmm(raw: &str) -> Result<u16, String> {
    let trimmed = raw.trim();
    if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("expected HHMM, got '{}'", raw));
    }
    let value: u16 = trimmed
        .parse()
        .map_err(|_| format!("expected HHMM, got '{}'", raw))?;
    if value / 100 > 23 || value % 100 > 59 {
        return Err(format!("'{}' is not a valid time of day", raw));
    }
    Ok(value)
}
