//! Distance matrix construction: network strategy with geodesic fallback.
//!
//! The builder prefers network distances for accuracy but treats the service
//! as unreliable: one attempt, and any failure selects the geodesic branch.
//! A matrix is always produced.

use tracing::{debug, warn};

use crate::haversine::GeodesicMatrix;
use crate::osrm::OsrmClient;

/// Largest point count submitted to the network service in one table call.
pub const MAX_TABLE_NODES: usize = 100;

/// Which strategy produced a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixSource {
    Network,
    Geodesic,
}

/// Square travel-cost matrix in integer meters, indexed by node order.
///
/// Diagonal is zero and every entry is populated. Network-sourced matrices
/// may be asymmetric (one-way streets); geodesic ones are symmetric.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    costs: Vec<Vec<i64>>,
    source: MatrixSource,
}

impl DistanceMatrix {
    pub fn new(costs: Vec<Vec<i64>>, source: MatrixSource) -> Self {
        debug_assert!(costs.iter().all(|row| row.len() == costs.len()));
        Self { costs, source }
    }

    /// Node count (the matrix is N×N).
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Travel cost from node `from` to node `to` in meters.
    pub fn cost(&self, from: usize, to: usize) -> i64 {
        self.costs[from][to]
    }

    pub fn source(&self) -> MatrixSource {
        self.source
    }
}

/// Two-branch matrix builder: network table when feasible, geodesic otherwise.
#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    osrm: Option<OsrmClient>,
    geodesic: GeodesicMatrix,
}

impl MatrixBuilder {
    pub fn new(osrm: Option<OsrmClient>) -> Self {
        Self {
            osrm,
            geodesic: GeodesicMatrix::default(),
        }
    }

    pub fn with_geodesic(mut self, geodesic: GeodesicMatrix) -> Self {
        self.geodesic = geodesic;
        self
    }

    /// Builds the full pairwise matrix for (lat, lng) points in stable order.
    ///
    /// The network branch is attempted only when a client is configured and
    /// the point count fits one table call. Its failure is absorbed here,
    /// never surfaced: the geodesic branch guarantees a usable matrix.
    pub fn build(&self, locations: &[(f64, f64)]) -> DistanceMatrix {
        if locations.len() > MAX_TABLE_NODES {
            debug!(
                nodes = locations.len(),
                limit = MAX_TABLE_NODES,
                "node count exceeds table limit, using geodesic estimate"
            );
        } else if let Some(client) = &self.osrm {
            match client.distance_table(locations) {
                Ok(costs) => {
                    debug!(nodes = locations.len(), "network distance table received");
                    return DistanceMatrix::new(costs, MatrixSource::Network);
                }
                Err(err) => {
                    warn!(error = %err, "network distance table unavailable, using geodesic estimate");
                }
            }
        }

        DistanceMatrix::new(
            self.geodesic.matrix_for(locations),
            MatrixSource::Geodesic,
        )
    }
}
