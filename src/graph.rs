use itertools::Itertools;
use log::{debug};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

pub type Cost = f64;
pub type VertexId = usize;

/// The origin is always vertex 0, coins are 1..=N.
pub const ORIGIN: VertexId = 0;

// Relative tolerance when checking caller-supplied matrices for symmetry.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: &Point) -> Cost {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A planning request: where the agent starts and where the coins lie.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Instance {
    pub origin: Point,
    pub coins: Vec<Point>,
}

impl Instance {
    /// Origin and coins placed uniformly on a 'width' x 'height' field.
    pub fn random<R: Rng>(rng: &mut R, coins: usize, width: f64, height: f64) -> Self {
        let mut point = || Point::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height));
        let origin = point();
        let coins = (0..coins).map(|_| point()).collect();
        Instance { origin, coins }
    }

    pub fn graph(&self) -> Result<DistanceMatrix, PlanError> {
        DistanceMatrix::from_points(&self.origin, &self.coins)
    }
}

/// Symmetric matrix of travel costs between the origin (0) and each coin.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    // distances[from][to]
    distances: Vec<Vec<Cost>>,
}

impl DistanceMatrix {
    pub fn from_points(origin: &Point, coins: &[Point]) -> Result<Self, PlanError> {
        let points: Vec<Point> = std::iter::once(*origin)
            .chain(coins.iter().cloned()).collect();
        if let Some(id) = points.iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(PlanError::invalid(
                format!("point {id} has non-finite coordinates")));
        }
        let distances: Vec<Vec<Cost>> = points.iter()
            .map(|from| points.iter().map(|to| from.distance(to)).collect())
            .collect();
        // Finite coordinates far enough apart still overflow to infinity.
        for (from, row) in distances.iter().enumerate() {
            if let Some(to) = row.iter().position(|cost| !cost.is_finite()) {
                return Err(PlanError::invalid(
                    format!("distance {from}->{to} is not finite")));
            }
        }
        debug!("Distance matrix built from {} coins", coins.len());
        Ok(DistanceMatrix { distances })
    }

    /// Validates a caller-supplied matrix: square, finite, non-negative,
    /// symmetric, with a zero diagonal.
    pub fn from_rows(rows: Vec<Vec<Cost>>) -> Result<Self, PlanError> {
        let size = rows.len();
        if size == 0 {
            return Err(PlanError::invalid("matrix is empty, the origin is required"));
        }
        for (from, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(PlanError::invalid(format!(
                    "matrix is not square: row {from} has {} entries, expected {size}",
                    row.len())));
            }
            for (to, &cost) in row.iter().enumerate() {
                if !cost.is_finite() {
                    return Err(PlanError::invalid(
                        format!("distance {from}->{to} is not finite")));
                }
                if cost < 0.0 {
                    return Err(PlanError::invalid(
                        format!("distance {from}->{to} is negative: {cost}")));
                }
            }
            if row[from] != 0.0 {
                return Err(PlanError::invalid(
                    format!("distance {from}->{from} should be 0, got {}", row[from])));
            }
        }
        for (from, to) in (0..size).tuple_combinations() {
            let (there, back) = (rows[from][to], rows[to][from]);
            let scale = there.abs().max(back.abs()).max(1.0);
            if (there - back).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(PlanError::invalid(format!(
                    "matrix is not symmetric: {from}->{to} is {there}, {to}->{from} is {back}")));
            }
        }
        Ok(DistanceMatrix { distances: rows })
    }

    /// Number of vertices, including the origin.
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Number of coins to collect (N).
    #[inline]
    pub fn coins(&self) -> usize {
        self.len() - 1
    }

    #[inline]
    pub fn cost(&self, from: VertexId, to: VertexId) -> Cost {
        self.distances[from][to]
    }

    #[inline]
    pub fn others(&self, from: VertexId) -> impl Iterator<Item=VertexId> + '_ {
        (0..self.len()).filter(move |&v| v != from)
    }

    /// Sum of consecutive distances along the given sequence.
    pub fn path_cost(&self, vertices: &[VertexId]) -> Cost {
        vertices.iter().tuple_windows()
            .map(|(&from, &to)| self.cost(from, to))
            .sum()
    }

    pub fn rows(&self) -> &[Vec<Cost>] {
        &self.distances
    }
}

/// A complete plan: 0, then every coin once, then back to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub vertices: Vec<VertexId>,
    pub cost: Cost,
}

impl Tour {
    pub fn new(graph: &DistanceMatrix, vertices: Vec<VertexId>) -> Self {
        let cost = graph.path_cost(&vertices);
        Tour { vertices, cost }
    }

    pub fn is_valid(&self, graph: &DistanceMatrix) -> bool {
        let n = graph.coins();
        if self.vertices.len() != n + 2
            || self.vertices.first() != Some(&ORIGIN)
            || self.vertices.last() != Some(&ORIGIN) {
            return false;
        }
        let mut seen = vec![false; n + 1];
        for &v in &self.vertices[1..=n] {
            if v == ORIGIN || v > n || seen[v] {
                return false;
            }
            seen[v] = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    fn square() -> DistanceMatrix {
        DistanceMatrix::from_points(
            &Point::new(0.0, 0.0),
            &[Point::new(10.0, 0.0), Point::new(10.0, 10.0), Point::new(0.0, 10.0)],
        ).unwrap()
    }

    #[test]
    fn test_euclidean_distances() {
        let graph = square();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.coins(), 3);
        assert_eq!(graph.cost(0, 1), 10.0);
        assert_eq!(graph.cost(1, 2), 10.0);
        assert!((graph.cost(0, 2) - 200f64.sqrt()).abs() < 1e-12);
        for from in 0..graph.len() {
            assert_eq!(graph.cost(from, from), 0.0);
            for to in 0..graph.len() {
                assert_eq!(graph.cost(from, to), graph.cost(to, from));
            }
        }
    }

    #[test]
    fn test_origin_only() {
        let graph = DistanceMatrix::from_points(&Point::new(3.0, 4.0), &[]).unwrap();
        assert_eq!(graph.coins(), 0);
        let tour = Tour::new(&graph, vec![0, 0]);
        assert_eq!(tour.cost, 0.0);
        assert!(tour.is_valid(&graph));
    }

    #[test]
    fn test_rejects_non_finite_coordinates() {
        let err = DistanceMatrix::from_points(
            &Point::new(0.0, 0.0), &[Point::new(f64::NAN, 1.0)]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_overflowing_distances() {
        let err = DistanceMatrix::from_points(
            &Point::new(-1e308, 0.0),
            &[Point::new(1e308, 0.0), Point::new(0.0, 1.0)],
        ).unwrap_err();
        assert_eq!(err, PlanError::invalid("distance 0->1 is not finite"));
    }

    #[test]
    fn test_rejects_malformed_matrices() {
        let cases = vec![
            vec![],
            vec![vec![0.0, 1.0], vec![1.0]],
            vec![vec![0.0, -1.0], vec![-1.0, 0.0]],
            vec![vec![0.0, f64::INFINITY], vec![f64::INFINITY, 0.0]],
            vec![vec![0.0, 1.0], vec![2.0, 0.0]],
            vec![vec![1.0, 1.0], vec![1.0, 0.0]],
        ];
        for rows in cases {
            let result = DistanceMatrix::from_rows(rows.clone());
            assert!(matches!(result, Err(PlanError::InvalidInput(_))),
                    "accepted {:?}", rows);
        }
    }

    #[test]
    fn test_accepts_valid_matrix() {
        let rows = square().rows().to_vec();
        let graph = DistanceMatrix::from_rows(rows).unwrap();
        assert_eq!(graph, square());
    }

    #[test]
    fn test_random_instance() {
        let mut rng = SmallRng::seed_from_u64(4);
        let instance = Instance::random(&mut rng, 6, 800.0, 600.0);
        assert_eq!(instance.coins.len(), 6);
        assert!(instance.coins.iter().all(|c| (0.0..800.0).contains(&c.x)
                                          && (0.0..600.0).contains(&c.y)));
        assert_eq!(instance.graph().unwrap().coins(), 6);

        let json = serde_json::to_string(&instance).unwrap();
        let parsed: Instance = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.coins, instance.coins);
    }

    #[test]
    fn test_tour_validity() {
        let graph = square();
        assert!(Tour::new(&graph, vec![0, 1, 2, 3, 0]).is_valid(&graph));
        assert!(Tour::new(&graph, vec![0, 3, 2, 1, 0]).is_valid(&graph));
        assert!(!Tour::new(&graph, vec![0, 1, 1, 3, 0]).is_valid(&graph));
        assert!(!Tour::new(&graph, vec![0, 1, 2, 0]).is_valid(&graph));
        assert!(!Tour::new(&graph, vec![1, 0, 2, 3, 1]).is_valid(&graph));
        // Out of range ids have no cost, only the shape is checked.
        let unknown = Tour { vertices: vec![0, 1, 2, 4, 0], cost: 0.0 };
        assert!(!unknown.is_valid(&graph));
        assert_eq!(Tour::new(&graph, vec![0, 1, 2, 3, 0]).cost, 40.0);
    }
}
