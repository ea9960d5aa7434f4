use crate::geo::{distance_km, Location};

/// Floor RSSI reported once a unit has moved past a subsite's coverage edge.
pub const MIN_RSSI_DBM: f64 = -125.0;
const MAX_RSSI_DBM: f64 = -50.0;

/// A subsite's coverage, decoupled from `trunksim-config`'s richer `Subsite`
/// type so this model stays a pure function of geometry.
#[derive(Debug, Clone, Copy)]
pub struct Coverage {
    pub location: Location,
    pub operating_radius_km: f64,
}

/// Result of scoring one subsite against a unit's location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalReport {
    pub distance_km: f64,
    pub rssi_dbm: f64,
    pub level: u8,
}

/// Distance-linear RSSI approximation with bounded jitter, as the deterministic
/// stand-in for real RF propagation.
///
/// `jitter` must return a value in `[-5.0, 5.0]`; callers inject it so tests
/// can use a seeded source and reproduce a scan exactly.
pub fn estimate_rssi(distance: f64, coverage: Coverage, jitter: f64) -> SignalReport {
    let max_distance = coverage.operating_radius_km;
    if max_distance <= 0.0 || distance >= max_distance {
        return SignalReport {
            distance_km: distance,
            rssi_dbm: MIN_RSSI_DBM,
            level: 0,
        };
    }

    let base_dbm = -50.0 - 75.0 * (distance / max_distance);
    let rssi_dbm = (base_dbm + jitter).clamp(MIN_RSSI_DBM, MAX_RSSI_DBM);
    SignalReport {
        distance_km: distance,
        rssi_dbm,
        level: level_bars(rssi_dbm),
    }
}

fn level_bars(rssi_dbm: f64) -> u8 {
    if rssi_dbm >= -70.0 {
        4
    } else if rssi_dbm >= -90.0 {
        3
    } else if rssi_dbm >= -110.0 {
        2
    } else {
        1
    }
}

pub fn scan_one(unit_location: Location, coverage: Coverage, jitter: f64) -> SignalReport {
    let d = distance_km(unit_location, coverage.location);
    estimate_rssi(d, coverage, jitter)
}

/// Source of bounded jitter for RF estimation, injected so scans are
/// reproducible in tests (a fixed-seed `rand::rngs::StdRng` satisfies this).
pub trait JitterSource {
    /// Returns a value in `[-5.0, 5.0]`.
    fn next_jitter(&mut self) -> f64;
}

impl<R: rand::RngCore> JitterSource for R {
    fn next_jitter(&mut self) -> f64 {
        use rand::Rng;
        self.gen_range(-5.0..=5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_or_beyond_radius_is_floor() {
        let cov = Coverage {
            location: Location::new(0.0, 0.0),
            operating_radius_km: 10.0,
        };
        let r = estimate_rssi(10.0, cov, 0.0);
        assert_eq!(r.rssi_dbm, MIN_RSSI_DBM);
        assert_eq!(r.level, 0);

        let r = estimate_rssi(15.0, cov, 3.0);
        assert_eq!(r.rssi_dbm, MIN_RSSI_DBM);
        assert_eq!(r.level, 0);
    }

    #[test]
    fn close_range_is_strong() {
        let cov = Coverage {
            location: Location::new(0.0, 0.0),
            operating_radius_km: 10.0,
        };
        let r = estimate_rssi(0.0, cov, 0.0);
        assert_eq!(r.rssi_dbm, -50.0);
        assert_eq!(r.level, 4);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_bars(-70.0), 4);
        assert_eq!(level_bars(-70.1), 3);
        assert_eq!(level_bars(-90.0), 3);
        assert_eq!(level_bars(-90.1), 2);
        assert_eq!(level_bars(-110.0), 2);
        assert_eq!(level_bars(-110.1), 1);
    }

    #[test]
    fn jitter_is_clamped_into_valid_range() {
        let cov = Coverage {
            location: Location::new(0.0, 0.0),
            operating_radius_km: 10.0,
        };
        let r = estimate_rssi(0.0, cov, 5.0);
        assert_eq!(r.rssi_dbm, -50.0);
        let r = estimate_rssi(9.999, cov, -5.0);
        assert!(r.rssi_dbm >= MIN_RSSI_DBM);
    }
}
