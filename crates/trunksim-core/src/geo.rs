use serde::{Deserialize, Serialize};

/// Earth radius in kilometers, used by `distance_km`.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Location { lat, lon }
    }
}

/// Rectangular area used to bound the random placement of a freshly
/// powered-on unit that has no location yet.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct OperationalArea {
    pub top_left: Location,
    pub bottom_right: Location,
}

impl OperationalArea {
    /// Picks a uniformly random point inside the rectangle using the given
    /// RNG, so unit placement is reproducible under a seeded source.
    pub fn random_point(&self, rng: &mut dyn rand::RngCore) -> Location {
        use rand::Rng;
        let lat = rng.gen_range(self.bottom_right.lat..=self.top_left.lat);
        let lon = rng.gen_range(self.top_left.lon..=self.bottom_right.lon);
        Location::new(lat, lon)
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn distance_km(a: Location, b: Location) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
