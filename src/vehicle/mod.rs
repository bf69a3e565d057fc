//! Vehicle telemetry behind caches
//!
//! The telemetry backend is rate limited, so every API call a `Vehicle`
//! makes goes through a `Cached` getter. All readings derived from the same
//! response share one upstream call per TTL window.

mod api;
pub mod simulated;

pub use api::{ApiError, ChargerResponse, ClimaterResponse, VehicleApi};
pub use simulated::SimulatedApi;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::cache::{AnyCache, Cached};
use crate::clock::Clock;
use crate::reset::ResetRegistry;

/// Charge point status as seen from the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChargeStatus {
    /// Not plugged in
    A,
    /// Plugged in, not charging
    B,
    /// Charging
    C,
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChargeStatus::A => "A",
            ChargeStatus::B => "B",
            ChargeStatus::C => "C",
        };
        f.write_str(s)
    }
}

/// All readings taken at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    /// State of charge in percent
    pub soc: f64,
    /// Charge status
    pub status: ChargeStatus,
    /// Remaining range in km
    pub range: i64,
    /// Remaining charge time in minutes
    pub remaining_minutes: i64,
    /// Estimated end of charge
    pub finish_time: DateTime<Utc>,
    /// Whether climatisation is running
    pub climater_active: bool,
    /// When this snapshot was taken
    pub taken_at: DateTime<Utc>,
}

/// A vehicle whose API calls are cached
#[derive(Debug)]
pub struct Vehicle {
    api: Arc<dyn VehicleApi>,
    ttl: Duration,
    charger: Arc<Cached<ChargerResponse, ApiError>>,
    climater: Arc<Cached<ClimaterResponse, ApiError>>,
    clock: Arc<dyn Clock>,
}

impl Vehicle {
    /// Wraps each call of `api` in a cache with the given TTL
    ///
    /// # Arguments
    /// * `api` - Telemetry backend
    /// * `ttl` - Cache duration for every API call
    /// * `resets` - Registry the caches subscribe to
    /// * `clock` - Time source for TTL checks and finish time estimates
    pub fn new(
        api: Arc<dyn VehicleApi>,
        ttl: Duration,
        resets: &ResetRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let charger_api = Arc::clone(&api);
        let charger = Cached::with_clock(
            move || charger_api.charger(),
            ttl,
            resets,
            Arc::clone(&clock),
        );

        let climater_api = Arc::clone(&api);
        let climater = Cached::with_clock(
            move || climater_api.climater(),
            ttl,
            resets,
            Arc::clone(&clock),
        );

        Self {
            api,
            ttl,
            charger,
            climater,
            clock,
        }
    }

    /// State of charge in percent
    pub fn soc(&self) -> Result<f64, ApiError> {
        self.charger.get().map(|res| soc(&res))
    }

    /// Charge status derived from plug and charging state
    pub fn status(&self) -> Result<ChargeStatus, ApiError> {
        self.charger.get().map(|res| charge_status(&res))
    }

    /// Remaining range in km
    pub fn range(&self) -> Result<i64, ApiError> {
        self.charger.get().map(|res| res.primary_engine_range)
    }

    /// Remaining charge time
    pub fn remaining_time(&self) -> Result<Duration, ApiError> {
        remaining_time(&self.charger.get()?)
    }

    /// Estimated end of charge
    pub fn finish_time(&self) -> Result<DateTime<Utc>, ApiError> {
        let remaining = self.remaining_time()?;
        finish_time(self.clock.now(), remaining)
    }

    /// Whether climatisation is running
    pub fn climater_active(&self) -> Result<bool, ApiError> {
        self.climater.get().map(|res| climater_active(&res))
    }

    /// Raw charger response as last memoized
    pub fn charger_raw(&self) -> Result<ChargerResponse, ApiError> {
        self.charger.get()
    }

    /// Takes every reading from one charger and one climater response
    pub fn snapshot(&self) -> Result<VehicleSnapshot, ApiError> {
        let charger = self.charger.get()?;
        let climater = self.climater.get()?;
        let now = self.clock.now();
        let remaining = remaining_time(&charger)?;

        Ok(VehicleSnapshot {
            soc: soc(&charger),
            status: charge_status(&charger),
            range: charger.primary_engine_range,
            remaining_minutes: remaining.num_minutes(),
            finish_time: finish_time(now, remaining)?,
            climater_active: climater_active(&climater),
            taken_at: now,
        })
    }

    /// Caches an opaque endpoint of the backend
    ///
    /// The returned cache uses this vehicle's TTL and clock and subscribes to
    /// `resets` like the built-in calls.
    pub fn endpoint(&self, path: &str, resets: &ResetRegistry) -> Arc<AnyCache<ApiError>> {
        let api = Arc::clone(&self.api);
        let path = path.to_string();
        Cached::with_clock(
            move || api.any(&path),
            self.ttl,
            resets,
            Arc::clone(&self.clock),
        )
    }

    /// Cache wrapping the charger call
    pub fn charger_cache(&self) -> &Arc<Cached<ChargerResponse, ApiError>> {
        &self.charger
    }

    /// Cache wrapping the climater call
    pub fn climater_cache(&self) -> &Arc<Cached<ClimaterResponse, ApiError>> {
        &self.climater
    }
}

fn soc(res: &ChargerResponse) -> f64 {
    res.state_of_charge as f64
}

fn charge_status(res: &ChargerResponse) -> ChargeStatus {
    if res.plug_state != "connected" {
        ChargeStatus::A
    } else if res.charging_state == "charging" {
        ChargeStatus::C
    } else {
        ChargeStatus::B
    }
}

fn remaining_time(res: &ChargerResponse) -> Result<Duration, ApiError> {
    Duration::try_minutes(res.remaining_charging_time).ok_or_else(|| {
        ApiError::Decode(format!(
            "remaining charging time out of range: {} min",
            res.remaining_charging_time
        ))
    })
}

fn finish_time(now: DateTime<Utc>, remaining: Duration) -> Result<DateTime<Utc>, ApiError> {
    now.checked_add_signed(remaining)
        .ok_or_else(|| ApiError::Decode(format!("finish time out of range: {} from {}", remaining, now)))
}

fn climater_active(res: &ClimaterResponse) -> bool {
    matches!(res.climatisation_state.as_str(), "heating" | "cooling" | "on")
}
