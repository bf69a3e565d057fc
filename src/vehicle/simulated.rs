//! Deterministic in-process telemetry backend
//!
//! Stands in for a real vendor API. Every charger call advances the state of
//! charge by a fixed step, which makes upstream calls visible in the readings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::json;

use super::api::{ApiError, ChargerResponse, ClimaterResponse, VehicleApi};
use crate::cache::AnyValue;
use crate::config::SimulationConfig;

/// Charging minutes needed per percent of charge
pub const MINUTES_PER_PERCENT: i64 = 3;

/// Electric range per percent of charge
pub const KM_PER_PERCENT: i64 = 4;

/// Simulated vehicle backend that counts its calls
#[derive(Debug)]
pub struct SimulatedApi {
    config: SimulationConfig,
    charger_calls: AtomicU64,
    climater_calls: AtomicU64,
    any_calls: AtomicU64,
}

impl SimulatedApi {
    /// Creates a backend starting at `config.initial_soc`
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            charger_calls: AtomicU64::new(0),
            climater_calls: AtomicU64::new(0),
            any_calls: AtomicU64::new(0),
        }
    }

    /// Number of charger calls so far
    pub fn charger_calls(&self) -> u64 {
        self.charger_calls.load(Ordering::SeqCst)
    }

    /// Number of climater calls so far
    pub fn climater_calls(&self) -> u64 {
        self.climater_calls.load(Ordering::SeqCst)
    }

    /// Number of untyped endpoint calls so far
    pub fn any_calls(&self) -> u64 {
        self.any_calls.load(Ordering::SeqCst)
    }

    fn should_fail(&self, call: u64) -> bool {
        self.config.fail_every > 0 && call % self.config.fail_every == 0
    }

    /// State of charge reported on the given (1-based) call
    fn soc_at(&self, call: u64) -> i64 {
        let gained = if self.config.plugged {
            i64::from(self.config.soc_step).saturating_mul((call - 1) as i64)
        } else {
            0
        };
        (i64::from(self.config.initial_soc) + gained).min(100)
    }
}

impl VehicleApi for SimulatedApi {
    fn charger(&self) -> Result<ChargerResponse, ApiError> {
        let call = self.charger_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_fail(call) {
            return Err(ApiError::Request(format!("simulated failure on call {}", call)));
        }

        let soc = self.soc_at(call);
        let charging = self.config.plugged && soc < 100;

        Ok(ChargerResponse {
            state_of_charge: soc,
            remaining_charging_time: if charging {
                (100 - soc) * MINUTES_PER_PERCENT
            } else {
                0
            },
            charging_state: if charging { "charging" } else { "off" }.to_string(),
            plug_state: if self.config.plugged {
                "connected"
            } else {
                "disconnected"
            }
            .to_string(),
            primary_engine_range: soc * KM_PER_PERCENT,
        })
    }

    fn climater(&self) -> Result<ClimaterResponse, ApiError> {
        let call = self.climater_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_fail(call) {
            return Err(ApiError::Unavailable);
        }

        Ok(ClimaterResponse {
            climatisation_state: if self.config.climatisation {
                "heating"
            } else {
                "off"
            }
            .to_string(),
            target_temperature: 21.0,
            outdoor_temperature: 8.5,
        })
    }

    /// Answers every path with a JSON document echoing the path and call
    ///
    /// The value is a `serde_json::Value` behind the `AnyValue`.
    fn any(&self, path: &str) -> Result<AnyValue, ApiError> {
        let call = self.any_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_fail(call) {
            return Err(ApiError::Unavailable);
        }

        let value = json!({
            "path": path,
            "call": call,
            "plugged": self.config.plugged,
        });
        Ok(Arc::new(value))
    }
}
