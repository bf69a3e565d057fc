//! Telemetry backend interface
//!
//! Transport, authentication and vendor decoding live behind `VehicleApi`.
//! The cache treats every method as an opaque fallible getter.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::AnyValue;

/// Errors returned by a telemetry backend
///
/// `Clone` so a failed call can be memoized and replayed to later readers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Request to the backend failed
    #[error("request failed: {0}")]
    Request(String),

    /// Backend answered but has no data for the vehicle
    #[error("vehicle unavailable")]
    Unavailable,

    /// Backend answered with a value that cannot be represented
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Battery and charging state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargerResponse {
    /// State of charge in percent
    pub state_of_charge: i64,
    /// Remaining charging time in minutes
    pub remaining_charging_time: i64,
    /// Charging state, e.g. "off" or "charging"
    pub charging_state: String,
    /// Plug state, e.g. "connected" or "disconnected"
    pub plug_state: String,
    /// Electric range in km
    pub primary_engine_range: i64,
}

/// Climatisation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimaterResponse {
    /// Climatisation state, e.g. "off" or "heating"
    pub climatisation_state: String,
    /// Target cabin temperature in Celsius
    pub target_temperature: f64,
    /// Outdoor temperature in Celsius
    pub outdoor_temperature: f64,
}

/// Vehicle telemetry backend
pub trait VehicleApi: Send + Sync + Debug {
    /// Fetches battery and charging state
    fn charger(&self) -> Result<ChargerResponse, ApiError>;

    /// Fetches climatisation state
    fn climater(&self) -> Result<ClimaterResponse, ApiError>;

    /// Fetches an endpoint without a typed schema
    ///
    /// `path` is relative to the vehicle, e.g. `"rolesrights/operations"`.
    /// Consumers downcast the returned value to the type the backend
    /// documents for that endpoint.
    fn any(&self, path: &str) -> Result<AnyValue, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charger_response_uses_camel_case() {
        let json = r#"{
            "stateOfCharge": 55,
            "remainingChargingTime": 95,
            "chargingState": "charging",
            "plugState": "connected",
            "primaryEngineRange": 210
        }"#;

        let res: ChargerResponse = serde_json::from_str(json).expect("Failed to parse charger response");

        assert_eq!(res.state_of_charge, 55);
        assert_eq!(res.remaining_charging_time, 95);
        assert_eq!(res.charging_state, "charging");
        assert_eq!(res.plug_state, "connected");
        assert_eq!(res.primary_engine_range, 210);
    }

    #[test]
    fn test_api_error_messages() {
        assert_eq!(
            ApiError::Request("timeout".to_string()).to_string(),
            "request failed: timeout"
        );
        assert_eq!(ApiError::Unavailable.to_string(), "vehicle unavailable");
        assert_eq!(
            ApiError::Decode("bad minutes".to_string()).to_string(),
            "failed to decode response: bad minutes"
        );
    }
}
