//! Search engine: cheapest-insertion construction plus guided local search.
//!
//! An anytime heuristic. Construction produces a capacity-feasible
//! assignment; the improvement loop refines it on an augmented cost (true
//! cost plus arc penalties) until the wall-clock budget expires, and the
//! best assignment found by true cost is returned. Infeasibility is a
//! normal outcome, not an error.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::problem::RoutingProblem;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget for the improvement phase.
    pub time_budget: Duration,
    /// Penalty scale for the guided search, relative to the mean arc cost
    /// of the constructed solution.
    pub penalty_factor: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            penalty_factor: 0.2,
        }
    }
}

/// Ordered node sequence per vehicle, start and end anchors included.
#[derive(Debug, Clone)]
pub struct RouteAssignment {
    pub sequences: Vec<Vec<usize>>,
    /// Sum of matrix costs along all sequences.
    pub total_cost: i64,
}

#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Feasible(RouteAssignment),
    /// No complete assignment satisfies the capacity constraints.
    NoFeasibleAssignment,
}

/// Assigns every pickup to exactly one vehicle and orders each route,
/// minimizing total travel cost within the time budget.
pub fn solve(problem: &RoutingProblem, options: &SolveOptions) -> SolveOutcome {
    let deadline = Instant::now() + options.time_budget;

    if problem.total_pickup_demand() > problem.total_capacity() {
        return SolveOutcome::NoFeasibleAssignment;
    }
    let max_capacity = (0..problem.vehicle_count())
        .map(|v| problem.capacity(v))
        .fold(0.0_f64, f64::max);
    if problem
        .pickup_indices()
        .any(|p| problem.demand(p) > max_capacity)
    {
        return SolveOutcome::NoFeasibleAssignment;
    }

    let mut routes = match construct(problem) {
        Some(routes) => routes,
        None => return SolveOutcome::NoFeasibleAssignment,
    };

    if routes.iter().any(|route| !route.is_empty()) {
        improve(problem, &mut routes, deadline, options);
    }

    SolveOutcome::Feasible(to_assignment(problem, &routes))
}

/// Cheapest feasible insertion over all unassigned pickups.
///
/// Each step inserts the pickup with the globally least marginal cost at
/// its best (route, position) among routes with remaining capacity. Returns
/// pickup-only sequences per vehicle, or None when some pickup admits no
/// feasible insertion.
fn construct(problem: &RoutingProblem) -> Option<Vec<Vec<usize>>> {
    let vehicle_count = problem.vehicle_count();
    let mut routes: Vec<Vec<usize>> = vec![Vec::new(); vehicle_count];
    let mut loads = vec![0.0_f64; vehicle_count];
    let mut unassigned: Vec<usize> = problem.pickup_indices().collect();
    // Heavier pickups scanned first so cost ties pack tight instances.
    unassigned.sort_by(|a, b| {
        problem
            .demand(*b)
            .partial_cmp(&problem.demand(*a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    while !unassigned.is_empty() {
        let mut best: Option<(usize, usize, usize, i64)> = None;
        for (slot, &node) in unassigned.iter().enumerate() {
            for vehicle in 0..vehicle_count {
                if loads[vehicle] + problem.demand(node) > problem.capacity(vehicle) {
                    continue;
                }
                for pos in 0..=routes[vehicle].len() {
                    let delta = insertion_delta(problem, &routes[vehicle], vehicle, pos, node);
                    if best.map_or(true, |(_, _, _, cost)| delta < cost) {
                        best = Some((slot, vehicle, pos, delta));
                    }
                }
            }
        }

        let (slot, vehicle, pos, _) = best?;
        let node = unassigned.remove(slot);
        routes[vehicle].insert(pos, node);
        loads[vehicle] += problem.demand(node);
    }

    Some(routes)
}

/// Marginal true cost of inserting `node` at `pos` of a vehicle's route.
fn insertion_delta(
    problem: &RoutingProblem,
    route: &[usize],
    vehicle: usize,
    pos: usize,
    node: usize,
) -> i64 {
    let prev = if pos == 0 {
        problem.start(vehicle)
    } else {
        route[pos - 1]
    };
    let next = if pos == route.len() {
        problem.end(vehicle)
    } else {
        route[pos]
    };
    problem.arc(prev, node) + problem.arc(node, next) - problem.arc(prev, next)
}

/// Guided improvement: first-improvement descent on the augmented cost,
/// penalizing the highest-utility arcs at every local optimum. Keeps the
/// best solution by true cost and restores it at the deadline.
fn improve(
    problem: &RoutingProblem,
    routes: &mut Vec<Vec<usize>>,
    deadline: Instant,
    options: &SolveOptions,
) {
    let mut best = routes.clone();
    let mut best_cost = solution_cost(problem, routes);

    let arc_count: usize = routes.iter().map(|route| route.len() + 1).sum();
    let mean_arc = best_cost / arc_count.max(1) as i64;
    let lambda = ((options.penalty_factor * mean_arc as f64) as i64).max(1);

    let mut search = Search {
        problem,
        penalties: Penalties::new(problem.node_count(), lambda),
    };
    let mut loads = route_loads(problem, routes);

    let mut rounds: u64 = 0;
    while Instant::now() < deadline {
        rounds += 1;
        if search.descend_step(routes, &mut loads, deadline) {
            let cost = solution_cost(problem, routes);
            if cost < best_cost {
                best_cost = cost;
                best = routes.clone();
            }
        } else if Instant::now() >= deadline || !search.penalize(routes) {
            break;
        }
    }
    debug!(rounds, best_cost, "improvement budget exhausted");

    *routes = best;
}

/// Arc penalty counters for the guided phase.
struct Penalties {
    counts: Vec<i64>,
    node_count: usize,
    lambda: i64,
}

impl Penalties {
    fn new(node_count: usize, lambda: i64) -> Self {
        Self {
            counts: vec![0; node_count * node_count],
            node_count,
            lambda,
        }
    }

    fn count(&self, from: usize, to: usize) -> i64 {
        self.counts[from * self.node_count + to]
    }

    fn bump(&mut self, from: usize, to: usize) {
        self.counts[from * self.node_count + to] += 1;
    }
}

struct Search<'a> {
    problem: &'a RoutingProblem,
    penalties: Penalties,
}

impl Search<'_> {
    /// Arc cost augmented with accumulated penalties.
    fn aug(&self, from: usize, to: usize) -> i64 {
        self.problem.arc(from, to) + self.penalties.lambda * self.penalties.count(from, to)
    }

    /// Applies the first augmented-improving move found, if any.
    fn descend_step(
        &self,
        routes: &mut [Vec<usize>],
        loads: &mut [f64],
        deadline: Instant,
    ) -> bool {
        self.try_relocate(routes, loads, deadline)
            || self.try_exchange(routes, loads, deadline)
            || self.try_two_opt(routes, deadline)
    }

    /// Augmented cost of a full route for a vehicle, anchors included.
    fn route_aug_cost(&self, route: &[usize], vehicle: usize) -> i64 {
        let mut prev = self.problem.start(vehicle);
        let mut cost = 0;
        for &node in route {
            cost += self.aug(prev, node);
            prev = node;
        }
        cost + self.aug(prev, self.problem.end(vehicle))
    }

    /// Augmented marginal cost of inserting `node` at `pos`.
    fn insert_aug_delta(&self, route: &[usize], vehicle: usize, pos: usize, node: usize) -> i64 {
        let problem = self.problem;
        let prev = if pos == 0 {
            problem.start(vehicle)
        } else {
            route[pos - 1]
        };
        let next = if pos == route.len() {
            problem.end(vehicle)
        } else {
            route[pos]
        };
        self.aug(prev, node) + self.aug(node, next) - self.aug(prev, next)
    }

    /// Move one pickup to a cheaper position, within or across routes.
    fn try_relocate(
        &self,
        routes: &mut [Vec<usize>],
        loads: &mut [f64],
        deadline: Instant,
    ) -> bool {
        let problem = self.problem;
        for from in 0..routes.len() {
            if Instant::now() >= deadline {
                return false;
            }
            for pos in 0..routes[from].len() {
                let node = routes[from][pos];
                let demand = problem.demand(node);
                let mut shortened = routes[from].clone();
                shortened.remove(pos);
                let base_cost = self.route_aug_cost(&routes[from], from);
                let removal_delta = self.route_aug_cost(&shortened, from) - base_cost;

                for to in 0..routes.len() {
                    if to == from {
                        for target in 0..=shortened.len() {
                            // Inserting back at the removal slot recreates the route.
                            if target == pos {
                                continue;
                            }
                            let delta = removal_delta
                                + self.insert_aug_delta(&shortened, from, target, node);
                            if delta < 0 {
                                let mut moved = shortened.clone();
                                moved.insert(target, node);
                                routes[from] = moved;
                                return true;
                            }
                        }
                    } else {
                        if loads[to] + demand > problem.capacity(to) {
                            continue;
                        }
                        for target in 0..=routes[to].len() {
                            let delta = removal_delta
                                + self.insert_aug_delta(&routes[to], to, target, node);
                            if delta < 0 {
                                routes[from].remove(pos);
                                routes[to].insert(target, node);
                                loads[from] -= demand;
                                loads[to] += demand;
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }

    /// Swap two pickups between different routes.
    fn try_exchange(
        &self,
        routes: &mut [Vec<usize>],
        loads: &mut [f64],
        deadline: Instant,
    ) -> bool {
        let problem = self.problem;
        for a in 0..routes.len() {
            if Instant::now() >= deadline {
                return false;
            }
            for b in a + 1..routes.len() {
                for i in 0..routes[a].len() {
                    for j in 0..routes[b].len() {
                        let node_a = routes[a][i];
                        let node_b = routes[b][j];
                        let demand_a = problem.demand(node_a);
                        let demand_b = problem.demand(node_b);
                        if loads[a] - demand_a + demand_b > problem.capacity(a)
                            || loads[b] - demand_b + demand_a > problem.capacity(b)
                        {
                            continue;
                        }

                        let delta = self.replace_delta(&routes[a], a, i, node_b)
                            + self.replace_delta(&routes[b], b, j, node_a);
                        if delta < 0 {
                            routes[a][i] = node_b;
                            routes[b][j] = node_a;
                            loads[a] += demand_b - demand_a;
                            loads[b] += demand_a - demand_b;
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    /// Augmented cost change from replacing `route[pos]` with `node`.
    fn replace_delta(&self, route: &[usize], vehicle: usize, pos: usize, node: usize) -> i64 {
        let problem = self.problem;
        let prev = if pos == 0 {
            problem.start(vehicle)
        } else {
            route[pos - 1]
        };
        let next = if pos + 1 == route.len() {
            problem.end(vehicle)
        } else {
            route[pos + 1]
        };
        let old = route[pos];
        self.aug(prev, node) + self.aug(node, next) - self.aug(prev, old) - self.aug(old, next)
    }

    /// Reverse a route segment when that shortens the augmented cost.
    fn try_two_opt(&self, routes: &mut [Vec<usize>], deadline: Instant) -> bool {
        for vehicle in 0..routes.len() {
            if Instant::now() >= deadline {
                return false;
            }
            let len = routes[vehicle].len();
            if len < 2 {
                continue;
            }
            for i in 0..len - 1 {
                for j in i + 1..len {
                    if self.reversal_delta(&routes[vehicle], vehicle, i, j) < 0 {
                        routes[vehicle][i..=j].reverse();
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Augmented cost change from reversing `route[i..=j]`.
    ///
    /// Walks the whole segment: with an asymmetric matrix the interior arcs
    /// change direction, so the boundary arcs alone are not enough.
    fn reversal_delta(&self, route: &[usize], vehicle: usize, i: usize, j: usize) -> i64 {
        let problem = self.problem;
        let prev = if i == 0 {
            problem.start(vehicle)
        } else {
            route[i - 1]
        };
        let next = if j + 1 == route.len() {
            problem.end(vehicle)
        } else {
            route[j + 1]
        };

        let mut old = self.aug(prev, route[i]);
        let mut new = self.aug(prev, route[j]);
        for k in i..j {
            old += self.aug(route[k], route[k + 1]);
            new += self.aug(route[k + 1], route[k]);
        }
        old += self.aug(route[j], next);
        new += self.aug(route[i], next);
        new - old
    }

    /// Bumps the penalty on the highest-utility arcs of the current
    /// solution (utility = true cost / (1 + penalty)). Returns false when
    /// no arc carries positive cost, meaning further guidance is pointless.
    fn penalize(&mut self, routes: &[Vec<usize>]) -> bool {
        let problem = self.problem;
        let mut top = 0.0_f64;
        let mut targets: Vec<(usize, usize)> = Vec::new();

        for (vehicle, route) in routes.iter().enumerate() {
            let mut prev = problem.start(vehicle);
            for step in 0..=route.len() {
                let node = if step == route.len() {
                    problem.end(vehicle)
                } else {
                    route[step]
                };
                let utility = problem.arc(prev, node) as f64
                    / (1.0 + self.penalties.count(prev, node) as f64);
                if utility > top {
                    top = utility;
                    targets.clear();
                    targets.push((prev, node));
                } else if utility == top && top > 0.0 {
                    targets.push((prev, node));
                }
                prev = node;
            }
        }

        for (from, to) in &targets {
            self.penalties.bump(*from, *to);
        }
        !targets.is_empty()
    }
}

/// True (unpenalized) objective over all vehicle sequences.
fn solution_cost(problem: &RoutingProblem, routes: &[Vec<usize>]) -> i64 {
    routes
        .iter()
        .enumerate()
        .map(|(vehicle, route)| route_cost(problem, route, vehicle))
        .sum()
}

fn route_cost(problem: &RoutingProblem, route: &[usize], vehicle: usize) -> i64 {
    let mut prev = problem.start(vehicle);
    let mut cost = 0;
    for &node in route {
        cost += problem.arc(prev, node);
        prev = node;
    }
    cost + problem.arc(prev, problem.end(vehicle))
}

fn route_loads(problem: &RoutingProblem, routes: &[Vec<usize>]) -> Vec<f64> {
    routes
        .iter()
        .map(|route| route.iter().map(|&node| problem.demand(node)).sum())
        .collect()
}

fn to_assignment(problem: &RoutingProblem, routes: &[Vec<usize>]) -> RouteAssignment {
    let sequences: Vec<Vec<usize>> = routes
        .iter()
        .enumerate()
        .map(|(vehicle, route)| {
            let mut sequence = Vec::with_capacity(route.len() + 2);
            sequence.push(problem.start(vehicle));
            sequence.extend_from_slice(route);
            sequence.push(problem.end(vehicle));
            sequence
        })
        .collect();

    RouteAssignment {
        total_cost: solution_cost(problem, routes),
        sequences,
    }
}
