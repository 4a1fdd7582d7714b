// Minimum spanning tree cost with Prim's algorithm.
// See https://en.wikipedia.org/wiki/Prim%27s_algorithm
//
// Any path through every node of a set is itself a spanning tree of that set,
// so the MST cost never exceeds the cost of such a path. That makes it a valid
// lower bound on what's left to travel in a partial tour.

use crate::graph::{Cost, DistanceMatrix, VertexId};

/// Total edge weight of a minimum spanning tree over `nodes`.
/// The tree is grown from `nodes[0]`. Empty and single-node sets cost 0.
pub fn mst_cost(graph: &DistanceMatrix, nodes: &[VertexId]) -> Cost {
    if nodes.len() < 2 {
        return 0.0;
    }
    let mut in_tree = vec![false; nodes.len()];
    // Cheapest known edge from the tree to each node (by position in 'nodes').
    let mut link: Vec<Cost> = nodes.iter()
        .map(|&v| graph.cost(nodes[0], v)).collect();
    in_tree[0] = true;
    let mut total = 0.0;
    for _ in 1..nodes.len() {
        let closest = link.iter().enumerate()
            .filter(|&(i, _)| !in_tree[i])
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, &cost)| (i, cost));
        let Some((selected, cost)) = closest else { break };
        total += cost;
        in_tree[selected] = true;
        for (i, &v) in nodes.iter().enumerate() {
            if !in_tree[i] {
                let cost = graph.cost(nodes[selected], v);
                if cost < link[i] {
                    link[i] = cost;
                }
            }
        }
    }
    total
}
