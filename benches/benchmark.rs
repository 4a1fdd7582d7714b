use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use coin_tour::graph::{DistanceMatrix, Instance};
use coin_tour::mst::mst_cost;
use coin_tour::planners::{Planner, SearchLimits, Strategy};


fn make_graph(coins: usize) -> DistanceMatrix {
    let mut rng = SmallRng::seed_from_u64(35334);
    Instance::random(&mut rng, coins, 800.0, 600.0).graph()
        .expect("Couldn't build a graph from a random instance")
}

fn bench_mst(c: &mut Criterion) {
    let graph = make_graph(20);
    let nodes: Vec<usize> = (0..graph.len()).collect();
    c.bench_function("mst 21 nodes", |b| b.iter(|| mst_cost(&graph, &nodes)));
}

fn bench_heuristics(c: &mut Criterion) {
    let graph = make_graph(50);
    let mut group = c.benchmark_group("heuristics");
    for strategy in [Strategy::RandomOrder, Strategy::NearestNeighbor] {
        group.bench_function(strategy.name(), |b| b.iter(|| {
            strategy.planner(SearchLimits::unlimited(), Some(1)).do_plan(&graph)
        }));
    }
    group.finish();
}

fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact");
    for coins in [6, 8] {
        let graph = make_graph(coins);
        for strategy in [Strategy::Exhaustive, Strategy::UniformCost, Strategy::Bounded] {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), coins), &graph, |b, graph| b.iter(|| {
                    strategy.planner(SearchLimits::unlimited(), None).do_plan(graph)
                }));
        }
    }
    group.finish();
}

criterion_group!{
    name = benches;
    // Limit sample size given the slow processing. Results will be noisy.
    config = Criterion::default().sample_size(20);
    targets = bench_mst, bench_heuristics, bench_exact,
}
criterion_main!(benches);
