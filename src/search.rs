// Best-first search over partial tours, as used by branch-and-bound.
// See https://en.wikipedia.org/wiki/Branch_and_bound
//
// Every node of the search space is a prefix of a tour starting at the origin.
// We always expand the prefix with the lowest priority (accumulated cost, plus
// an optional lower bound on what's left to travel). Since edge costs are
// non-negative and the bound never overestimates, the first complete tour we
// pop is optimal.
//
// The exhaustive search at the bottom of this file enumerates every tour one
// generation at a time instead, and is kept as a reference for the others.

use log::{debug, info};
use priority_queue::PriorityQueue;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::error::PlanError;
use crate::graph::{Cost, DistanceMatrix, Tour, VertexId, ORIGIN};
use crate::mst::mst_cost;

/// Coins visited so far, bit 'v' for coin 'v'. The origin has no bit.
pub type Mask = u64;

/// Largest number of coins a partial path can track in its mask.
pub const MAX_SEARCH_COINS: usize = Mask::BITS as usize - 1;

fn all_coins(coins: usize) -> Mask {
    if coins == 0 {
        0
    } else {
        ((1 as Mask) << coins).wrapping_sub(1) << 1
    }
}

#[derive(Clone, Debug)]
pub struct PartialPath {
    pub vertices: Vec<VertexId>,
    /// Sum of distances along 'vertices'.
    pub cost: Cost,
    /// Lower bound on the cost left to complete the tour.
    pub bound: Cost,
    pub visited: Mask,
}

// Two distinct prefixes never share a vertex sequence, so it is their identity.
impl PartialEq for PartialPath {
    fn eq(&self, other: &Self) -> bool {
        self.vertices == other.vertices
    }
}

impl Eq for PartialPath {}

impl Hash for PartialPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vertices.hash(state);
    }
}

impl PartialPath {
    pub fn root() -> Self {
        PartialPath { vertices: vec![ORIGIN], cost: 0.0, bound: 0.0, visited: 0 }
    }

    #[inline]
    pub fn last(&self) -> VertexId {
        self.vertices[self.vertices.len() - 1]
    }

    pub fn priority(&self) -> Cost {
        self.cost + self.bound
    }

    pub fn all_visited(&self, graph: &DistanceMatrix) -> bool {
        self.visited == all_coins(graph.coins())
    }

    /// Back at the origin after visiting every coin.
    pub fn is_complete(&self, graph: &DistanceMatrix) -> bool {
        self.vertices.len() == graph.coins() + 2 && self.last() == ORIGIN
    }

    pub fn unvisited<'a>(
        &'a self, graph: &'a DistanceMatrix
        ) -> impl Iterator<Item=VertexId> + 'a {
        (1..=graph.coins()).filter(move |&v| self.visited & (1 << v) == 0)
    }

    /// New path going one step further. The bound is left for the caller.
    pub fn extend(&self, graph: &DistanceMatrix, next: VertexId) -> PartialPath {
        let mut vertices = Vec::with_capacity(self.vertices.len() + 1);
        vertices.extend_from_slice(&self.vertices);
        vertices.push(next);
        let visited = if next == ORIGIN { self.visited } else { self.visited | (1 << next) };
        PartialPath {
            vertices,
            cost: self.cost + graph.cost(self.last(), next),
            bound: 0.0,
            visited,
        }
    }

    /// One successor per unvisited coin in increasing id order, or the return
    /// home once all coins are visited.
    pub fn successors(&self, graph: &DistanceMatrix) -> Vec<PartialPath> {
        if self.all_visited(graph) {
            vec![self.extend(graph, ORIGIN)]
        } else {
            self.unvisited(graph).map(|v| self.extend(graph, v)).collect()
        }
    }

    pub fn into_tour(self) -> Tour {
        Tour { vertices: self.vertices, cost: self.cost }
    }
}

/// Estimates the cost left to complete a partial path. Must never
/// overestimate, otherwise best-first search loses optimality.
pub trait LowerBound {
    fn estimate(&mut self, graph: &DistanceMatrix, path: &PartialPath) -> Cost;
}

/// No estimate: the search is ordered by accumulated cost alone.
pub struct NoBound;

impl LowerBound for NoBound {
    fn estimate(&mut self, _graph: &DistanceMatrix, _path: &PartialPath) -> Cost {
        0.0
    }
}

/// MST over every node the rest of the tour still has to touch: the current
/// node, the unvisited coins and the origin.
#[derive(Default)]
pub struct MstBound {
    // Keyed by the coins in the spanned set, the origin is always in it.
    memo: FxHashMap<Mask, Cost>,
}

impl MstBound {
    pub fn new() -> Self {
        MstBound { memo: FxHashMap::default() }
    }

    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}

impl LowerBound for MstBound {
    fn estimate(&mut self, graph: &DistanceMatrix, path: &PartialPath) -> Cost {
        if path.is_complete(graph) {
            return 0.0;
        }
        let unvisited = all_coins(graph.coins()) & !path.visited;
        let current = path.last();
        let key = if current == ORIGIN { unvisited } else { unvisited | (1 << current) };
        *self.memo.entry(key).or_insert_with(|| {
            let nodes: Vec<VertexId> = std::iter::once(ORIGIN)
                .chain((1..=graph.coins()).filter(|&v| key & (1 << v) != 0))
                .collect();
            mst_cost(graph, &nodes)
        })
    }
}

/// Frontier ordering, the "largest" rank gets popped first.
/// Lower priority wins; on ties the longer path, then the smaller last id,
/// then whichever was inserted first.
#[derive(Debug, Clone, Copy)]
pub struct Rank {
    pub priority: Cost,
    pub len: usize,
    pub last: VertexId,
    pub order: u64,
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.total_cmp(&self.priority)
            .then(self.len.cmp(&other.len))
            .then(other.last.cmp(&self.last))
            .then(other.order.cmp(&self.order))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

pub struct Frontier {
    queue: PriorityQueue<PartialPath, Rank>,
    inserted: u64,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier {
    pub fn new() -> Self {
        Frontier { queue: PriorityQueue::new(), inserted: 0 }
    }

    pub fn push(&mut self, path: PartialPath) {
        let rank = Rank {
            priority: path.priority(),
            len: path.vertices.len(),
            last: path.last(),
            order: self.inserted,
        };
        self.inserted += 1;
        self.queue.push(path, rank);
    }

    pub fn pop(&mut self) -> Option<PartialPath> {
        self.queue.pop().map(|(path, _)| path)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SearchStats {
    /// Candidates popped and expanded.
    pub expansions: usize,
    pub max_frontier: usize,
}

pub struct BestFirstSearch<B: LowerBound> {
    name: &'static str,
    bound: B,
    max_expansions: Option<usize>,
    pub stats: SearchStats,
}

impl<B: LowerBound> BestFirstSearch<B> {
    pub fn new(name: &'static str, bound: B, max_expansions: Option<usize>) -> Self {
        BestFirstSearch { name, bound, max_expansions, stats: SearchStats::default() }
    }

    pub fn bound(&self) -> &B {
        &self.bound
    }

    pub fn run(&mut self, graph: &DistanceMatrix) -> Result<Tour, PlanError> {
        self.stats = SearchStats::default();
        let mut frontier = Frontier::new();
        let mut root = PartialPath::root();
        root.bound = self.bound.estimate(graph, &root);
        debug!("[{}] Root lower bound: {}", self.name, root.bound);
        frontier.push(root);

        while let Some(candidate) = frontier.pop() {
            if candidate.is_complete(graph) {
                info!("[{}] Optimal tour after {} expansions (frontier peaked at {})",
                      self.name, self.stats.expansions, self.stats.max_frontier);
                return Ok(candidate.into_tour());
            }
            self.stats.expansions += 1;
            if let Some(max) = self.max_expansions {
                if self.stats.expansions > max {
                    return Err(PlanError::exceeded(
                        self.name, format!("more than {max} expansions")));
                }
            }
            for mut next in candidate.successors(graph) {
                next.bound = self.bound.estimate(graph, &next);
                frontier.push(next);
            }
            self.stats.max_frontier = usize::max(self.stats.max_frontier,
                                                 frontier.len());
        }
        // Can't happen on a complete graph: the frontier always holds a
        // prefix of some tour.
        Err(PlanError::invalid("search space exhausted without a complete tour"))
    }
}

/// Enumerates every tour, growing all prefixes one coin per round. Among
/// tours of equal minimal cost, the first generated wins (successors are
/// generated in increasing id order).
pub fn exhaustive_search(graph: &DistanceMatrix) -> Tour {
    let mut generation = vec![PartialPath::root()];
    for round in 0..graph.coins() {
        let next: Vec<PartialPath> = generation.iter()
            .flat_map(|path| path.successors(graph))
            .collect();
        debug!("[exhaustive] Round {}: {} partial paths", round + 1, next.len());
        generation = next;
    }
    let mut best: Option<PartialPath> = None;
    for path in &generation {
        let tour = path.extend(graph, ORIGIN);
        let better = match &best {
            Some(best) => tour.cost < best.cost,
            None => true,
        };
        if better {
            best = Some(tour);
        }
    }
    match best {
        Some(best) => best.into_tour(),
        // Unreachable: generation always has at least one path.
        None => Tour { vertices: vec![ORIGIN, ORIGIN], cost: 0.0 },
    }
}
