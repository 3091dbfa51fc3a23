//! Routing problem model: the single optimization input.
//!
//! Aggregates the node space, per-vehicle start/end anchors, demands,
//! capacities, and the cost matrix. One side constraint: cumulative demand
//! along a route must stay within the vehicle's capacity at every prefix,
//! zero slack. The objective is the sum of matrix costs along every
//! vehicle's visited sequence; an unused vehicle contributes its direct
//! start-to-end arc (zero when start equals end).

use std::ops::Range;

use crate::matrix::DistanceMatrix;
use crate::nodes::VehicleSpec;

#[derive(Debug, Clone)]
pub struct RoutingProblem {
    matrix: DistanceMatrix,
    demands: Vec<f64>,
    starts: Vec<usize>,
    ends: Vec<usize>,
    capacities: Vec<f64>,
    depot_count: usize,
}

impl RoutingProblem {
    /// Assembles the model. Node indices in `vehicles` must be valid depot
    /// indices within the matrix, as produced by the node registry.
    pub fn new(
        matrix: DistanceMatrix,
        demands: Vec<f64>,
        vehicles: &[VehicleSpec],
        depot_count: usize,
    ) -> Self {
        debug_assert_eq!(matrix.len(), demands.len());
        Self {
            starts: vehicles.iter().map(|v| v.start).collect(),
            ends: vehicles.iter().map(|v| v.end).collect(),
            capacities: vehicles.iter().map(|v| v.capacity).collect(),
            matrix,
            demands,
            depot_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.demands.len()
    }

    pub fn vehicle_count(&self) -> usize {
        self.capacities.len()
    }

    pub fn start(&self, vehicle: usize) -> usize {
        self.starts[vehicle]
    }

    pub fn end(&self, vehicle: usize) -> usize {
        self.ends[vehicle]
    }

    pub fn capacity(&self, vehicle: usize) -> f64 {
        self.capacities[vehicle]
    }

    pub fn demand(&self, node: usize) -> f64 {
        self.demands[node]
    }

    /// Travel cost of the (from, to) arc in meters.
    pub fn arc(&self, from: usize, to: usize) -> i64 {
        self.matrix.cost(from, to)
    }

    /// Indices of the pickup nodes (everything after the depot block).
    pub fn pickup_indices(&self) -> Range<usize> {
        self.depot_count..self.node_count()
    }

    pub fn total_pickup_demand(&self) -> f64 {
        self.pickup_indices().map(|i| self.demands[i]).sum()
    }

    pub fn total_capacity(&self) -> f64 {
        self.capacities.iter().sum()
    }

    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }
}
