//! Route extraction: stop tables, cumulative load/distance, polylines.
//!
//! Replays each vehicle's sequence against the cost matrix, producing the
//! stop-by-stop table handed to reporting and the coordinate polylines
//! handed to map rendering. Vehicles that never left their start/end pair
//! are excluded from the active plan.

use serde::Serialize;

use crate::nodes::{Node, VehicleSpec};
use crate::polyline::Polyline;
use crate::problem::RoutingProblem;
use crate::solver::RouteAssignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopAction {
    Departure,
    Pickup,
    Return,
}

impl std::fmt::Display for StopAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopAction::Departure => write!(f, "Departure"),
            StopAction::Pickup => write!(f, "Pickup"),
            StopAction::Return => write!(f, "Return"),
        }
    }
}

/// One visited location on a vehicle's route.
#[derive(Debug, Clone, Serialize)]
pub struct Stop {
    pub vehicle_id: String,
    pub step: usize,
    pub location_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub action: StopAction,
    /// Load on board after serving this stop.
    pub cumulative_load: f64,
    /// Distance traveled up to arrival at this stop, in meters.
    pub cumulative_distance_m: i64,
}

/// Flattened report row for the export collaborator, distances in km.
#[derive(Debug, Clone, Serialize)]
pub struct StopRow {
    pub vehicle_id: String,
    pub step_index: usize,
    pub location_id: String,
    pub action: StopAction,
    pub cumulative_load: f64,
    pub cumulative_distance_km: f64,
}

/// An active vehicle's ordered stops plus its map geometry.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleRoute {
    pub vehicle_id: String,
    pub stops: Vec<Stop>,
    pub polyline: Polyline,
    pub distance_m: i64,
}

/// The final artifact of one optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePlan {
    pub routes: Vec<VehicleRoute>,
    pub total_distance_m: i64,
}

impl RoutePlan {
    /// Ordered stop table across all active vehicles.
    pub fn rows(&self) -> Vec<StopRow> {
        self.routes
            .iter()
            .flat_map(|route| {
                route.stops.iter().map(|stop| StopRow {
                    vehicle_id: stop.vehicle_id.clone(),
                    step_index: stop.step,
                    location_id: stop.location_id.clone(),
                    action: stop.action,
                    cumulative_load: stop.cumulative_load,
                    cumulative_distance_km: km(stop.cumulative_distance_m),
                })
            })
            .collect()
    }

    /// Total operative distance of the fleet in km, rounded to 2 decimals.
    pub fn total_distance_km(&self) -> f64 {
        km(self.total_distance_m)
    }

    /// Routes worth drawing: at least one pickup between the anchors.
    pub fn map_routes(&self) -> impl Iterator<Item = &VehicleRoute> {
        self.routes.iter().filter(|route| route.stops.len() > 2)
    }
}

fn km(meters: i64) -> f64 {
    (meters as f64 / 1000.0 * 100.0).round() / 100.0
}

/// Replays an assignment into the final route plan.
///
/// Walks each sequence accumulating load and distance; a vehicle whose
/// final cumulative distance is zero performed no useful work and is
/// dropped from the plan.
pub fn extract_plan(
    assignment: &RouteAssignment,
    problem: &RoutingProblem,
    nodes: &[Node],
    vehicles: &[VehicleSpec],
) -> RoutePlan {
    let mut routes = Vec::new();
    let mut total_distance_m = 0;

    for (vehicle, spec) in vehicles.iter().enumerate() {
        let sequence = &assignment.sequences[vehicle];
        let mut stops = Vec::with_capacity(sequence.len());
        let mut load = 0.0;
        let mut distance_m = 0;

        for (step, &node_index) in sequence.iter().enumerate() {
            if step > 0 {
                distance_m += problem.arc(sequence[step - 1], node_index);
            }
            load += problem.demand(node_index);

            let node = &nodes[node_index];
            let action = if step == 0 {
                StopAction::Departure
            } else if step + 1 == sequence.len() {
                StopAction::Return
            } else {
                StopAction::Pickup
            };

            stops.push(Stop {
                vehicle_id: spec.id.clone(),
                step,
                location_id: node.id.clone(),
                latitude: node.latitude,
                longitude: node.longitude,
                action,
                cumulative_load: load,
                cumulative_distance_m: distance_m,
            });
        }

        if distance_m == 0 {
            // Never left its start/end pair.
            continue;
        }

        total_distance_m += distance_m;
        let polyline = Polyline::new(
            stops
                .iter()
                .map(|stop| (stop.latitude, stop.longitude))
                .collect(),
        );
        routes.push(VehicleRoute {
            vehicle_id: spec.id.clone(),
            stops,
            polyline,
            distance_m,
        });
    }

    RoutePlan {
        routes,
        total_distance_m,
    }
}
