//! Geodesic distance matrix (fallback when the network service is unavailable).
//!
//! Uses great-circle distance scaled by an empirical urban detour factor.
//! Less accurate than network distances (ignores roads) but always available.

use rayon::prelude::*;

/// Multiplier correcting straight-line distance for real road networks.
const ROAD_DETOUR_FACTOR: f64 = 1.4;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geodesic distance matrix source.
///
/// Estimates road distance as great-circle distance times a detour factor,
/// truncated to whole meters. Matrices produced here are symmetric.
#[derive(Debug, Clone)]
pub struct GeodesicMatrix {
    /// Road detour multiplier applied to the great-circle distance.
    pub detour_factor: f64,
}

impl Default for GeodesicMatrix {
    fn default() -> Self {
        Self {
            detour_factor: ROAD_DETOUR_FACTOR,
        }
    }
}

impl GeodesicMatrix {
    pub fn new(detour_factor: f64) -> Self {
        Self { detour_factor }
    }

    /// Great-circle distance between two (lat, lng) points in meters.
    fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }

    /// Estimated road distance between two points, truncated to meters.
    fn estimate_m(&self, from: (f64, f64), to: (f64, f64)) -> i64 {
        (Self::haversine_m(from, to) * self.detour_factor) as i64
    }

    /// Full pairwise matrix over the given (lat, lng) points, diagonal zero.
    pub fn matrix_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<i64>> {
        (0..locations.len())
            .into_par_iter()
            .map(|i| {
                (0..locations.len())
                    .map(|j| {
                        if i == j {
                            0
                        } else {
                            self.estimate_m(locations[i], locations[j])
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
