//! Node registry: the unified depot + pickup index space for one run.
//!
//! Depots come first, pickups after; indices are assigned by that
//! concatenation order and never reordered. Every downstream component
//! (matrix, problem, solver, extractor) refers to nodes by index only.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Depot input record, as supplied by the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotRecord {
    pub depot_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Vehicle input record. Start/end name depots by identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub vehicle_id: String,
    pub capacity: f64,
    pub start_depot_id: String,
    pub end_depot_id: String,
}

/// Pickup input record. Missing demand defaults to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupRecord {
    pub pickup_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub demand: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Depot,
    Pickup,
}

/// A routable location with its demand, addressed by index downstream.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub demand: f64,
    pub role: NodeRole,
}

/// A vehicle with its depot references resolved to node indices.
#[derive(Debug, Clone)]
pub struct VehicleSpec {
    pub id: String,
    pub capacity: f64,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
pub enum RegistryError {
    /// A vehicle names a depot that is not in the depot set.
    UnresolvedDepotReference {
        vehicle_id: String,
        depot_id: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnresolvedDepotReference {
                vehicle_id,
                depot_id,
            } => write!(
                f,
                "vehicle {vehicle_id} references unknown depot {depot_id}"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Owns the canonical node index space for one optimization run.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    depot_count: usize,
    depot_index: HashMap<String, usize>,
}

impl NodeRegistry {
    /// Builds the unified node array: depots first, then pickups.
    pub fn build(depots: &[DepotRecord], pickups: &[PickupRecord]) -> Self {
        let mut nodes = Vec::with_capacity(depots.len() + pickups.len());
        let mut depot_index = HashMap::with_capacity(depots.len());

        for depot in depots {
            depot_index.insert(depot.depot_id.clone(), nodes.len());
            nodes.push(Node {
                id: depot.depot_id.clone(),
                latitude: depot.latitude,
                longitude: depot.longitude,
                demand: 0.0,
                role: NodeRole::Depot,
            });
        }

        for pickup in pickups {
            nodes.push(Node {
                id: pickup.pickup_id.clone(),
                latitude: pickup.latitude,
                longitude: pickup.longitude,
                demand: pickup.demand.unwrap_or(0.0),
                role: NodeRole::Pickup,
            });
        }

        Self {
            nodes,
            depot_count: depots.len(),
            depot_index,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn depot_count(&self) -> usize {
        self.depot_count
    }

    /// Node index of a depot identifier, if present.
    pub fn depot_node(&self, depot_id: &str) -> Option<usize> {
        self.depot_index.get(depot_id).copied()
    }

    /// Coordinates in index order, as (latitude, longitude) pairs.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.nodes
            .iter()
            .map(|node| (node.latitude, node.longitude))
            .collect()
    }

    /// Demand vector in index order (0 for depots).
    pub fn demands(&self) -> Vec<f64> {
        self.nodes.iter().map(|node| node.demand).collect()
    }

    /// Resolves each vehicle's depot references to node indices.
    ///
    /// Fails before any matrix or search work when a vehicle names a depot
    /// absent from the depot set.
    pub fn resolve_vehicles(
        &self,
        vehicles: &[VehicleRecord],
    ) -> Result<Vec<VehicleSpec>, RegistryError> {
        vehicles
            .iter()
            .map(|vehicle| {
                let start = self.depot_node(&vehicle.start_depot_id).ok_or_else(|| {
                    RegistryError::UnresolvedDepotReference {
                        vehicle_id: vehicle.vehicle_id.clone(),
                        depot_id: vehicle.start_depot_id.clone(),
                    }
                })?;
                let end = self.depot_node(&vehicle.end_depot_id).ok_or_else(|| {
                    RegistryError::UnresolvedDepotReference {
                        vehicle_id: vehicle.vehicle_id.clone(),
                        depot_id: vehicle.end_depot_id.clone(),
                    }
                })?;
                Ok(VehicleSpec {
                    id: vehicle.vehicle_id.clone(),
                    capacity: vehicle.capacity,
                    start,
                    end,
                })
            })
            .collect()
    }
}
