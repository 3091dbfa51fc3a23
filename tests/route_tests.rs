//! Route extraction tests
//!
//! Replayed cumulative distances must reproduce matrix arc sums exactly,
//! and degenerate vehicles must be dropped from the active plan.

use fleet_router::matrix::{DistanceMatrix, MatrixSource};
use fleet_router::nodes::{Node, NodeRole, VehicleSpec};
use fleet_router::problem::RoutingProblem;
use fleet_router::route::{extract_plan, StopAction};
use fleet_router::solver::RouteAssignment;

// ============================================================================
// Test Fixtures
// ============================================================================

fn node(id: &str, lat: f64, lng: f64, demand: f64, role: NodeRole) -> Node {
    Node {
        id: id.to_string(),
        latitude: lat,
        longitude: lng,
        demand,
        role,
    }
}

fn vehicle(id: &str, capacity: f64, start: usize, end: usize) -> VehicleSpec {
    VehicleSpec {
        id: id.to_string(),
        capacity,
        start,
        end,
    }
}

/// One depot, two pickups, asymmetric arc costs.
fn small_world() -> (RoutingProblem, Vec<Node>) {
    let costs = vec![
        vec![0, 10, 20], //
        vec![7, 0, 5],
        vec![9, 4, 0],
    ];
    let nodes = vec![
        node("D1", 4.60, -74.08, 0.0, NodeRole::Depot),
        node("P1", 4.61, -74.07, 3.0, NodeRole::Pickup),
        node("P2", 4.62, -74.06, 4.0, NodeRole::Pickup),
    ];
    let specs = vec![vehicle("T1", 10.0, 0, 0)];
    let problem = RoutingProblem::new(
        DistanceMatrix::new(costs, MatrixSource::Network),
        vec![0.0, 3.0, 4.0],
        &specs,
        1,
    );
    (problem, nodes)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn cumulative_distance_matches_matrix_arcs_exactly() {
    let (problem, nodes) = small_world();
    let specs = vec![vehicle("T1", 10.0, 0, 0)];
    let assignment = RouteAssignment {
        sequences: vec![vec![0, 1, 2, 0]],
        total_cost: 10 + 5 + 9,
    };

    let plan = extract_plan(&assignment, &problem, &nodes, &specs);
    assert_eq!(plan.routes.len(), 1);

    let stops = &plan.routes[0].stops;
    let distances: Vec<i64> = stops.iter().map(|s| s.cumulative_distance_m).collect();
    assert_eq!(distances, vec![0, 10, 15, 24]);

    let loads: Vec<f64> = stops.iter().map(|s| s.cumulative_load).collect();
    assert_eq!(loads, vec![0.0, 3.0, 7.0, 7.0]);

    assert_eq!(plan.total_distance_m, 24);
    assert_eq!(plan.routes[0].distance_m, 24);
}

#[test]
fn stops_carry_action_labels_and_locations() {
    let (problem, nodes) = small_world();
    let specs = vec![vehicle("T1", 10.0, 0, 0)];
    let assignment = RouteAssignment {
        sequences: vec![vec![0, 2, 1, 0]],
        total_cost: 20 + 4 + 7,
    };

    let plan = extract_plan(&assignment, &problem, &nodes, &specs);
    let stops = &plan.routes[0].stops;

    let actions: Vec<StopAction> = stops.iter().map(|s| s.action).collect();
    assert_eq!(
        actions,
        vec![
            StopAction::Departure,
            StopAction::Pickup,
            StopAction::Pickup,
            StopAction::Return
        ]
    );

    let ids: Vec<&str> = stops.iter().map(|s| s.location_id.as_str()).collect();
    assert_eq!(ids, vec!["D1", "P2", "P1", "D1"]);

    let polyline = plan.routes[0].polyline.points();
    assert_eq!(polyline.len(), 4);
    assert_eq!(polyline[1], (4.62, -74.06));
}

#[test]
fn report_rows_convert_to_kilometers() {
    let costs = vec![
        vec![0, 1_234, 5_000],
        vec![1_234, 0, 2_766],
        vec![5_000, 2_766, 0],
    ];
    let nodes = vec![
        node("D1", 0.0, 0.0, 0.0, NodeRole::Depot),
        node("P1", 0.1, 0.1, 5.0, NodeRole::Pickup),
        node("P2", 0.2, 0.2, 5.0, NodeRole::Pickup),
    ];
    let specs = vec![vehicle("T1", 20.0, 0, 0)];
    let problem = RoutingProblem::new(
        DistanceMatrix::new(costs, MatrixSource::Geodesic),
        vec![0.0, 5.0, 5.0],
        &specs,
        1,
    );
    let assignment = RouteAssignment {
        sequences: vec![vec![0, 1, 2, 0]],
        total_cost: 1_234 + 2_766 + 5_000,
    };

    let plan = extract_plan(&assignment, &problem, &nodes, &specs);
    let rows = plan.rows();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1].cumulative_distance_km, 1.23);
    assert_eq!(rows[2].cumulative_distance_km, 4.0);
    assert_eq!(rows[3].cumulative_distance_km, 9.0);
    assert_eq!(plan.total_distance_km(), 9.0);
    assert_eq!(rows[0].vehicle_id, "T1");
    assert_eq!(rows[2].step_index, 2);
}

#[test]
fn degenerate_closed_route_is_dropped() {
    let (problem, nodes) = small_world();
    let specs = vec![vehicle("T1", 10.0, 0, 0), vehicle("T2", 10.0, 0, 0)];
    let assignment = RouteAssignment {
        sequences: vec![vec![0, 1, 2, 0], vec![0, 0]],
        total_cost: 24,
    };

    let plan = extract_plan(&assignment, &problem, &nodes, &specs);
    assert_eq!(plan.routes.len(), 1);
    assert_eq!(plan.routes[0].vehicle_id, "T1");
    assert_eq!(plan.total_distance_m, 24);
}

#[test]
fn empty_open_route_stays_active_but_off_the_map() {
    let costs = vec![vec![0, 100], vec![80, 0]];
    let nodes = vec![
        node("D1", 0.0, 0.0, 0.0, NodeRole::Depot),
        node("D2", 1.0, 1.0, 0.0, NodeRole::Depot),
    ];
    let specs = vec![vehicle("T1", 50.0, 0, 1)];
    let problem = RoutingProblem::new(
        DistanceMatrix::new(costs, MatrixSource::Geodesic),
        vec![0.0, 0.0],
        &specs,
        2,
    );
    let assignment = RouteAssignment {
        sequences: vec![vec![0, 1]],
        total_cost: 100,
    };

    let plan = extract_plan(&assignment, &problem, &nodes, &specs);
    // The vehicle moved, so it stays in the plan and its arc counts.
    assert_eq!(plan.routes.len(), 1);
    assert_eq!(plan.total_distance_m, 100);
    assert_eq!(plan.routes[0].stops.len(), 2);
    assert_eq!(plan.routes[0].stops[1].action, StopAction::Return);
    // But a two-point route has nothing to draw.
    assert_eq!(plan.map_routes().count(), 0);
}
