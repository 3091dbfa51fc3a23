//! Planner pipeline: registry → matrix → problem → search → plan.
//!
//! One synchronous optimization run per call. The returned plan is a plain
//! owned value; concurrent runs should construct independent planners and
//! keep their own results.

use std::fmt;

use tracing::{info, warn};

use crate::matrix::MatrixBuilder;
use crate::nodes::{DepotRecord, NodeRegistry, PickupRecord, RegistryError, VehicleRecord};
use crate::osrm::{OsrmClient, OsrmConfig};
use crate::problem::RoutingProblem;
use crate::route::{extract_plan, RoutePlan};
use crate::solver::{solve, SolveOptions, SolveOutcome};

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Network distance service; None disables the network branch outright.
    pub osrm: Option<OsrmConfig>,
    pub solve: SolveOptions,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            osrm: Some(OsrmConfig::default()),
            solve: SolveOptions::default(),
        }
    }
}

#[derive(Debug)]
pub enum PlanError {
    /// A vehicle names a depot absent from the depot set.
    UnresolvedDepotReference {
        vehicle_id: String,
        depot_id: String,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::UnresolvedDepotReference {
                vehicle_id,
                depot_id,
            } => write!(
                f,
                "vehicle {vehicle_id} references unknown depot {depot_id}"
            ),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<RegistryError> for PlanError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnresolvedDepotReference {
                vehicle_id,
                depot_id,
            } => PlanError::UnresolvedDepotReference {
                vehicle_id,
                depot_id,
            },
        }
    }
}

/// Outcome of one optimization run. Infeasibility is a state to surface to
/// the caller ("no solution with the current vehicle capacities"), not an
/// error.
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Planned(RoutePlan),
    NoFeasibleAssignment,
}

pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Runs the full pipeline over one input snapshot.
    ///
    /// Input-shape errors fail here, before any matrix or search work.
    /// Network-distance failures are absorbed by the matrix builder.
    pub fn plan(
        &self,
        depots: &[DepotRecord],
        vehicles: &[VehicleRecord],
        pickups: &[PickupRecord],
    ) -> Result<PlanOutcome, PlanError> {
        let registry = NodeRegistry::build(depots, pickups);
        let specs = registry.resolve_vehicles(vehicles)?;

        info!(
            nodes = registry.len(),
            depots = registry.depot_count(),
            vehicles = specs.len(),
            "optimizing routes"
        );

        let client = match &self.config.osrm {
            Some(config) => match OsrmClient::new(config.clone()) {
                Ok(client) => Some(client),
                Err(err) => {
                    warn!(error = %err, "distance service client unavailable");
                    None
                }
            },
            None => None,
        };

        let matrix = MatrixBuilder::new(client).build(&registry.coordinates());
        info!(source = ?matrix.source(), "distance matrix ready");

        let problem = RoutingProblem::new(
            matrix,
            registry.demands(),
            &specs,
            registry.depot_count(),
        );

        match solve(&problem, &self.config.solve) {
            SolveOutcome::Feasible(assignment) => {
                let plan = extract_plan(&assignment, &problem, registry.nodes(), &specs);
                info!(
                    active_routes = plan.routes.len(),
                    total_km = plan.total_distance_km(),
                    "route plan ready"
                );
                Ok(PlanOutcome::Planned(plan))
            }
            SolveOutcome::NoFeasibleAssignment => {
                info!("no feasible assignment for the given capacities");
                Ok(PlanOutcome::NoFeasibleAssignment)
            }
        }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}
