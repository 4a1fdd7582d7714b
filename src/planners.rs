// Different planner implementations to order the coins an agent collects.
//
// Every planner returns a tour 0, p1, ..., pN, 0. The last three are exact and
// exponential in the worst case, so they run behind size guards.

use clap::ValueEnum;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PlanError;
use crate::graph::{DistanceMatrix, Tour, VertexId, ORIGIN};
use crate::search::{exhaustive_search, BestFirstSearch, MstBound, NoBound,
                    SearchStats, MAX_SEARCH_COINS};

pub trait Planner {
    // Name to display for this planner.
    fn name(&self) -> &str;

    // Implementation of the planner.
    fn do_plan(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError>;

    // Wrapper to do_plan, to log timing and cost information.
    fn plan(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError> {
        let start = Instant::now();
        let tour = self.do_plan(graph);
        info!("Planner {} took {:?}", self.name(), start.elapsed());
        match &tour {
            Ok(tour) => {
                assert!(tour.is_valid(graph),
                        "Planner {} produced a malformed tour: {:?}",
                        self.name(), tour.vertices);
                info!("Planner {} found a tour of cost {:.3} through {} coins",
                      self.name(), tour.cost, graph.coins());
            },
            Err(err) => warn!("Planner {} did NOT find a tour: {}", self.name(), err),
        };
        tour
    }
}

/// Guards against instances too large to search. Unset fields mean no limit.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SearchLimits {
    /// Refuse instances with more coins than this.
    pub max_coins: Option<usize>,
    /// Abort best-first search after this many expansions.
    pub max_expansions: Option<usize>,
}

impl SearchLimits {
    pub fn unlimited() -> Self {
        SearchLimits::default()
    }

    /// Fields set here win, unset ones are taken from 'fallback'.
    pub fn or(self, fallback: SearchLimits) -> SearchLimits {
        SearchLimits {
            max_coins: self.max_coins.or(fallback.max_coins),
            max_expansions: self.max_expansions.or(fallback.max_expansions),
        }
    }

    fn check_size(&self, strategy: &str, graph: &DistanceMatrix) -> Result<(), PlanError> {
        let coins = graph.coins();
        if coins > MAX_SEARCH_COINS {
            return Err(PlanError::exceeded(strategy, format!(
                "{coins} coins, at most {MAX_SEARCH_COINS} can be searched")));
        }
        match self.max_coins {
            Some(max) if coins > max => Err(PlanError::exceeded(
                strategy, format!("{coins} coins, limit is {max}"))),
            _ => Ok(()),
        }
    }
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Uniformly random order, a baseline to compare against.
    #[value(alias = "example")]
    RandomOrder,
    /// Greedy, always goes to the closest unvisited coin.
    #[value(alias = "aki")]
    NearestNeighbor,
    /// Exact, enumerates every tour.
    #[value(alias = "jocke")]
    Exhaustive,
    /// Exact, best-first search on accumulated cost.
    #[value(alias = "uki")]
    UniformCost,
    /// Exact, best-first search on cost plus an MST lower bound.
    #[value(alias = "micko")]
    Bounded,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::RandomOrder,
        Strategy::NearestNeighbor,
        Strategy::Exhaustive,
        Strategy::UniformCost,
        Strategy::Bounded,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::RandomOrder => RandomOrderPlanner::NAME,
            Strategy::NearestNeighbor => NearestNeighborPlanner::NAME,
            Strategy::Exhaustive => ExhaustivePlanner::NAME,
            Strategy::UniformCost => UniformCostPlanner::NAME,
            Strategy::Bounded => BoundedPlanner::NAME,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Strategy::Exhaustive | Strategy::UniformCost | Strategy::Bounded)
    }

    pub fn default_limits(&self) -> SearchLimits {
        match self {
            Strategy::RandomOrder | Strategy::NearestNeighbor => SearchLimits::unlimited(),
            // Holds all N! tours in memory at once.
            Strategy::Exhaustive => SearchLimits { max_coins: Some(9), max_expansions: None },
            Strategy::UniformCost | Strategy::Bounded => SearchLimits {
                max_coins: None,
                max_expansions: Some(20_000_000),
            },
        }
    }

    /// Builds the planner. 'limits' override this strategy's defaults, 'seed'
    /// only matters for the random order.
    pub fn planner(&self, limits: SearchLimits, seed: Option<u64>) -> Box<dyn Planner> {
        let limits = limits.or(self.default_limits());
        debug!("Building planner {} with {:?}", self.name(), limits);
        match self {
            Strategy::RandomOrder => Box::new(RandomOrderPlanner::new(seed)),
            Strategy::NearestNeighbor => Box::new(NearestNeighborPlanner),
            Strategy::Exhaustive => Box::new(ExhaustivePlanner::new(limits)),
            Strategy::UniformCost => Box::new(UniformCostPlanner::new(limits)),
            Strategy::Bounded => Box::new(BoundedPlanner::new(limits)),
        }
    }
}

// Visits coins in a uniformly random order. No guarantee whatsoever, only
// useful as a floor when comparing other planners.
pub struct RandomOrderPlanner {
    rng: SmallRng,
}

// Greedy algorithm that always moves to the closest unvisited coin, then goes
// home. O(N²), never backtracks.
pub struct NearestNeighborPlanner;

// Enumerates all N! tours and keeps the cheapest one. Exact, but only usable
// on a handful of coins.
pub struct ExhaustivePlanner {
    limits: SearchLimits,
}

// Branch-and-bound without a heuristic: always expands the cheapest prefix.
// Exact, explores the whole permutation space in the worst case.
pub struct UniformCostPlanner {
    limits: SearchLimits,
    pub stats: SearchStats,
}

// Branch-and-bound ordered by cost plus the MST of what's left to visit.
// Exact, usually expands far fewer prefixes than UniformCostPlanner.
pub struct BoundedPlanner {
    limits: SearchLimits,
    pub stats: SearchStats,
}

impl RandomOrderPlanner {
    const NAME: &'static str = "random-order";

    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        RandomOrderPlanner { rng }
    }
}

impl Planner for RandomOrderPlanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn do_plan(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError> {
        let mut coins: Vec<VertexId> = (1..=graph.coins()).collect();
        coins.shuffle(&mut self.rng);
        let mut vertices = Vec::with_capacity(coins.len() + 2);
        vertices.push(ORIGIN);
        vertices.extend(coins);
        vertices.push(ORIGIN);
        Ok(Tour::new(graph, vertices))
    }
}

impl NearestNeighborPlanner {
    const NAME: &'static str = "nearest-neighbor";
}

impl Planner for NearestNeighborPlanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn do_plan(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError> {
        let mut seen = vec![false; graph.len()];
        seen[ORIGIN] = true;
        let mut current = ORIGIN;
        let mut vertices = Vec::with_capacity(graph.len() + 1);
        vertices.push(ORIGIN);

        loop {
            // Argmin over unseen vertices only, ties go to the smallest id.
            let closest = graph.others(current)
                .filter(|&v| !seen[v])
                .min_by(|&a, &b| graph.cost(current, a).total_cmp(&graph.cost(current, b)));
            let next = match closest {
                Some(next) => next,
                None => break,  // Everything collected, we are done.
            };
            seen[next] = true;
            vertices.push(next);
            current = next;
        }
        vertices.push(ORIGIN);
        Ok(Tour::new(graph, vertices))
    }
}

impl ExhaustivePlanner {
    const NAME: &'static str = "exhaustive";

    pub fn new(limits: SearchLimits) -> Self {
        ExhaustivePlanner { limits }
    }
}

impl Planner for ExhaustivePlanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn do_plan(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError> {
        self.limits.check_size(Self::NAME, graph)?;
        Ok(exhaustive_search(graph))
    }
}

impl UniformCostPlanner {
    const NAME: &'static str = "uniform-cost";

    pub fn new(limits: SearchLimits) -> Self {
        UniformCostPlanner { limits, stats: SearchStats::default() }
    }
}

impl Planner for UniformCostPlanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn do_plan(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError> {
        self.limits.check_size(Self::NAME, graph)?;
        let mut search = BestFirstSearch::new(
            Self::NAME, NoBound, self.limits.max_expansions);
        let tour = search.run(graph);
        self.stats = search.stats;
        tour
    }
}

impl BoundedPlanner {
    const NAME: &'static str = "bounded";

    pub fn new(limits: SearchLimits) -> Self {
        BoundedPlanner { limits, stats: SearchStats::default() }
    }
}

impl Planner for BoundedPlanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn do_plan(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError> {
        self.limits.check_size(Self::NAME, graph)?;
        let mut search = BestFirstSearch::new(
            Self::NAME, MstBound::new(), self.limits.max_expansions);
        let tour = search.run(graph);
        self.stats = search.stats;
        debug!("[{}] {} MST estimates memoized", Self::NAME, search.bound().memoized());
        tour
    }
}
