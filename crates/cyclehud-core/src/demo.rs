//! Demo Mode - Simulated ride telemetry for testing
//!
//! Generates plausible bicycle telemetry for overlay testing without a bus or
//! sensors. Simulates a rider cruising at ~28 km/h with occasional sprints;
//! gears follow cadence, heart rate follows power with a lag.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::telemetry::TelemetryEvent;

const CRUISE_SPEED_KMH: f64 = 28.0;
const WHEEL_CIRCUMFERENCE_M: f64 = 2.1;
const TOP_GEAR: u8 = 11;
const RIDER_MASS_KG: f64 = 85.0;

/// Demo ride simulator
pub struct DemoRide {
    /// First update time (ms)
    start_time_ms: Option<u64>,
    /// Last update time (ms)
    last_update_ms: u64,
    /// Time of next sprint (ms from start)
    next_sprint_at_ms: u64,
    /// Current sprint state
    sprint_state: SprintState,
    /// Current speed (smoothed, km/h)
    current_speed: f64,
    /// Target speed for current sprint
    sprint_target_speed: f64,
    /// Distance covered (km)
    distance_km: f64,
    /// Heart rate (smoothed, bpm)
    heart_rate: f64,
    /// Engaged gear, 1 is the easiest
    gear: u8,
    rng: StdRng,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SprintState {
    /// Steady riding
    Cruise,
    /// Accelerating
    RampUp { start_ms: u64 },
    /// Holding top speed
    Hold { start_ms: u64 },
    /// Easing off
    RampDown { start_ms: u64 },
}

impl Default for DemoRide {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoRide {
    /// Create a simulator seeded from entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let first_sprint = rng.gen_range(20_000..40_000);
        Self {
            start_time_ms: None,
            last_update_ms: 0,
            next_sprint_at_ms: first_sprint,
            sprint_state: SprintState::Cruise,
            current_speed: CRUISE_SPEED_KMH,
            sprint_target_speed: 0.0,
            distance_km: 0.0,
            heart_rate: 95.0,
            gear: 6,
            rng,
        }
    }

    /// Advance the simulation and return one event per overlay field
    ///
    /// # Arguments
    /// * `elapsed_ms` - Milliseconds on any monotonic clock
    pub fn update(&mut self, elapsed_ms: u64) -> Vec<TelemetryEvent> {
        let start = *self.start_time_ms.get_or_insert(elapsed_ms);
        let sim_time = elapsed_ms.saturating_sub(start);
        let delta_ms = elapsed_ms.saturating_sub(self.last_update_ms.max(start));
        self.last_update_ms = elapsed_ms;
        let dt = delta_ms as f64 / 1000.0;

        self.update_sprint_state(sim_time);

        // Speed approaches the target at a bounded acceleration
        let t = sim_time as f64 / 1000.0;
        let target = self.calculate_target_speed(sim_time) + 0.8 * (t * 0.4).sin();
        let previous_speed = self.current_speed;
        let max_change = 6.0 * dt; // km/h per second
        self.current_speed += (target - self.current_speed).clamp(-max_change, max_change);
        let speed = self.current_speed.max(0.0);

        self.distance_km += speed * dt / 3600.0;

        // Shift to keep cadence between 75 and 100 rpm
        let mut cadence = cadence_for(speed, self.gear);
        if cadence > 100.0 && self.gear < TOP_GEAR {
            self.gear += 1;
            cadence = cadence_for(speed, self.gear);
        } else if cadence < 75.0 && self.gear > 1 {
            self.gear -= 1;
            cadence = cadence_for(speed, self.gear);
        }

        let v = speed / 3.6;
        let accel = if dt > 0.0 {
            (speed - previous_speed) / 3.6 / dt
        } else {
            0.0
        };
        let rolling = 0.005 * RIDER_MASS_KG * 9.81 * v;
        let aero = 0.5 * 1.225 * 0.3 * v.powi(3);
        let power = (rolling + aero + RIDER_MASS_KG * accel * v).max(0.0);

        // Heart rate lags behind effort
        let hr_target = 90.0 + power * 0.25;
        let alpha = (dt / 15.0).min(1.0);
        self.heart_rate += (hr_target - self.heart_rate) * alpha;

        vec![
            TelemetryEvent::new("speed", round_to(speed, 1)),
            TelemetryEvent::new("distance", round_to(self.distance_km, 2)),
            TelemetryEvent::new("power", power.round()),
            TelemetryEvent::new("heartrate", self.heart_rate.round()),
            TelemetryEvent::new("cadence", cadence.round()),
            TelemetryEvent::new("gear", self.gear as f64),
            TelemetryEvent::new("time", sim_time as f64 / 1000.0),
        ]
    }

    /// Update the sprint state machine
    fn update_sprint_state(&mut self, sim_time: u64) {
        const RAMP_UP_MS: u64 = 4_000;
        const HOLD_MS: u64 = 8_000;
        const RAMP_DOWN_MS: u64 = 6_000;

        match self.sprint_state {
            SprintState::Cruise => {
                if sim_time >= self.next_sprint_at_ms {
                    self.sprint_target_speed = self.rng.gen_range(40.0..50.0);
                    self.sprint_state = SprintState::RampUp { start_ms: sim_time };
                }
            }
            SprintState::RampUp { start_ms } => {
                if sim_time >= start_ms + RAMP_UP_MS {
                    self.sprint_state = SprintState::Hold { start_ms: sim_time };
                }
            }
            SprintState::Hold { start_ms } => {
                if sim_time >= start_ms + HOLD_MS {
                    self.sprint_state = SprintState::RampDown { start_ms: sim_time };
                }
            }
            SprintState::RampDown { start_ms } => {
                if sim_time >= start_ms + RAMP_DOWN_MS {
                    self.sprint_state = SprintState::Cruise;
                    self.next_sprint_at_ms = sim_time + self.rng.gen_range(30_000..60_000);
                }
            }
        }
    }

    /// Target speed for the current sprint state
    fn calculate_target_speed(&self, sim_time: u64) -> f64 {
        const RAMP_UP_MS: u64 = 4_000;
        const RAMP_DOWN_MS: u64 = 6_000;

        match self.sprint_state {
            SprintState::Cruise => CRUISE_SPEED_KMH,
            SprintState::RampUp { start_ms } => {
                let progress = ((sim_time - start_ms) as f64 / RAMP_UP_MS as f64).min(1.0);
                CRUISE_SPEED_KMH + (self.sprint_target_speed - CRUISE_SPEED_KMH) * progress
            }
            SprintState::Hold { .. } => self.sprint_target_speed,
            SprintState::RampDown { start_ms } => {
                let progress = ((sim_time - start_ms) as f64 / RAMP_DOWN_MS as f64).min(1.0);
                self.sprint_target_speed + (CRUISE_SPEED_KMH - self.sprint_target_speed) * progress
            }
        }
    }
}

/// Gear ratio, chainring teeth over sprocket teeth
fn gear_ratio(gear: u8) -> f64 {
    1.2 + 0.25 * (gear.saturating_sub(1)) as f64
}

/// Pedal rpm needed to hold `speed_kmh` in `gear`
fn cadence_for(speed_kmh: f64, gear: u8) -> f64 {
    let wheel_rpm = speed_kmh / 3.6 / WHEEL_CIRCUMFERENCE_M * 60.0;
    wheel_rpm / gear_ratio(gear)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(events: &[TelemetryEvent], sensor: &str) -> f64 {
        events
            .iter()
            .find(|e| e.sensor == sensor)
            .map(|e| e.value)
            .unwrap()
    }

    #[test]
    fn test_ride_emits_every_field() {
        let mut ride = DemoRide::with_seed(7);
        let events = ride.update(0);

        let sensors: Vec<&str> = events.iter().map(|e| e.sensor.as_str()).collect();
        assert_eq!(
            sensors,
            vec!["speed", "distance", "power", "heartrate", "cadence", "gear", "time"]
        );
    }

    #[test]
    fn test_cruise_speed_range() {
        let mut ride = DemoRide::with_seed(1);

        for ms in (0..15_000).step_by(500) {
            let speed = value(&ride.update(ms), "speed");
            assert!(speed > 25.0 && speed < 31.0, "speed {} out of cruise range", speed);
        }
    }

    #[test]
    fn test_distance_accumulates() {
        let mut ride = DemoRide::with_seed(3);
        ride.update(1_000);

        // Ten minutes at ~28 km/h
        let mut distance = 0.0;
        for ms in (2_000..=601_000).step_by(1_000) {
            let next = value(&ride.update(ms), "distance");
            assert!(next >= distance);
            distance = next;
        }
        assert!(distance > 4.0 && distance < 7.0, "distance {}", distance);
    }

    #[test]
    fn test_time_counts_from_first_update() {
        let mut ride = DemoRide::with_seed(5);
        ride.update(10_000);
        assert_eq!(value(&ride.update(135_000), "time"), 125.0);
    }

    #[test]
    fn test_values_fit_wire_format() {
        let mut ride = DemoRide::with_seed(11);
        for ms in (0..300_000).step_by(250) {
            for event in ride.update(ms) {
                assert!(event.value >= 0.0, "{} went negative", event.sensor);
                assert!(!event.to_line().contains('-'));
            }
        }
    }

    #[test]
    fn test_gear_stays_in_range() {
        let mut ride = DemoRide::with_seed(13);
        for ms in (0..300_000).step_by(1_000) {
            let gear = value(&ride.update(ms), "gear");
            assert!((1.0..=TOP_GEAR as f64).contains(&gear));
        }
    }
}
