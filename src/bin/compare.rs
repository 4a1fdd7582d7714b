// Binary that runs every planner on a set of instances, to compare how far the
// heuristics are from the optimum and how long each planner takes.
//
// Instances are either read from a folder of JSON files, or generated from a
// seed. Exact planners that hit their size guard are reported as skipped.

use clap::Parser;
use env_logger::Env;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::Error as JSONError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

use coin_tour::error::PlanError;
use coin_tour::graph::Instance;
use coin_tour::planners::{Planner, SearchLimits, Strategy};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder of JSON instances to evaluate.
    #[arg(required_unless_present = "random")]
    directory: Option<String>,

    /// Generate this many coins per instance instead of reading a folder.
    #[arg(long)]
    random: Option<usize>,

    /// Number of random instances to generate.
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// Seed for generated instances and the random-order planner.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Clone)]
struct NamedInstance {
    name: String,
    instance: Instance,
}

#[derive(Error, Debug)]
enum InstanceError {
    #[error("Failed reading the instance")]
    ReadError(#[from] std::io::Error),
    #[error("Failed parsing the instance")]
    ParseError(#[from] JSONError),
    #[error("Failed planning: {0}")]
    PlanError(#[from] PlanError),
}

#[derive(Default)]
struct Totals {
    runs: usize,
    skipped: usize,
    time: Duration,
    // Sum of cost / optimum, over instances where an optimum is known.
    ratio_sum: f64,
    ratio_count: usize,
}

fn read_instances(directory: &str) -> Result<Vec<NamedInstance>, InstanceError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let data = std::fs::read_to_string(&path)?;
        let instance: Instance = serde_json::from_str(&data)?;
        let name = path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        out.push(NamedInstance { name, instance });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn random_instances(coins: usize, count: usize, seed: u64) -> Vec<NamedInstance> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count).map(|i| NamedInstance {
        name: format!("random-{i}"),
        instance: Instance::random(&mut rng, coins, 800.0, 600.0),
    }).collect()
}

fn evaluate(
    named: &NamedInstance, seed: u64, totals: &mut HashMap<Strategy, Totals>
    ) -> Result<(), InstanceError> {
    let graph = named.instance.graph()?;
    println!("{} ({} coins)", named.name, graph.coins());
    let mut costs: Vec<(Strategy, Option<f64>)> = Vec::new();
    for strategy in Strategy::ALL {
        let mut planner = strategy.planner(SearchLimits::unlimited(), Some(seed));
        let start = Instant::now();
        let result = planner.plan(&graph);
        let elapsed = start.elapsed();
        let entry = totals.entry(strategy).or_default();
        match result {
            Ok(tour) => {
                println!("  {:<18} {:>12.3}  {:?}", strategy.name(), tour.cost, elapsed);
                entry.runs += 1;
                entry.time += elapsed;
                costs.push((strategy, Some(tour.cost)));
            },
            Err(err @ PlanError::ResourceExceeded { .. }) => {
                println!("  {:<18} {:>12}  ({err})", strategy.name(), "skipped");
                entry.skipped += 1;
                costs.push((strategy, None));
            },
            Err(err) => return Err(err.into()),
        }
    }
    let optimum = costs.iter()
        .filter(|(strategy, _)| strategy.is_exact())
        .find_map(|&(_, cost)| cost);
    if let Some(optimum) = optimum.filter(|&optimum| optimum > 0.0) {
        for (strategy, cost) in costs {
            if let Some(cost) = cost {
                let entry = totals.entry(strategy).or_default();
                entry.ratio_sum += cost / optimum;
                entry.ratio_count += 1;
            }
        }
    }
    Ok(())
}

fn main() {
    // Quiet by default, the planners log every run at info level.
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let instances = match (&cli.directory, cli.random) {
        (_, Some(coins)) => random_instances(coins, cli.count, cli.seed),
        (Some(directory), None) => match read_instances(directory) {
            Ok(instances) => instances,
            Err(err) => {
                eprintln!("error: {err:?}");
                std::process::exit(1);
            },
        },
        (None, None) => unreachable!("clap requires a directory or --random"),
    };
    println!("{} instance(s)", instances.len());

    let mut totals: HashMap<Strategy, Totals> = HashMap::new();
    for named in &instances {
        if let Err(err) = evaluate(named, cli.seed, &mut totals) {
            println!("  error: {err:?} Skipping.");
        }
    }

    println!();
    println!("{:<18} {:>6} {:>8} {:>14} {:>12}",
             "planner", "runs", "skipped", "avg time", "vs optimum");
    for strategy in Strategy::ALL {
        let Some(entry) = totals.get(&strategy) else { continue };
        let avg_time = if entry.runs > 0 {
            entry.time / entry.runs as u32
        } else {
            Duration::ZERO
        };
        let ratio = if entry.ratio_count > 0 {
            format!("{:.3}", entry.ratio_sum / entry.ratio_count as f64)
        } else {
            "-".to_string()
        };
        println!("{:<18} {:>6} {:>8} {:>14} {:>12}",
                 strategy.name(), entry.runs, entry.skipped,
                 format!("{avg_time:?}"), ratio);
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_random_instances_are_seeded() {
        let first = random_instances(5, 3, 7);
        let again = random_instances(5, 3, 7);
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].name, "random-2");
        for (a, b) in first.iter().zip(&again) {
            assert_eq!(a.instance.origin, b.instance.origin);
            assert_eq!(a.instance.coins, b.instance.coins);
            assert_eq!(a.instance.coins.len(), 5);
        }
        assert_ne!(random_instances(5, 1, 8)[0].instance.coins, first[0].instance.coins);
    }

    #[test]
    fn test_read_instances_sorted_json_only() {
        let dir = tempdir().unwrap();
        let square = std::fs::read_to_string("instances/square.json").unwrap();
        std::fs::write(dir.path().join("b.json"), &square).unwrap();
        std::fs::write(dir.path().join("a.json"), &square).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an instance").unwrap();

        let instances = read_instances(dir.path().to_str().unwrap()).unwrap();
        let names: Vec<&str> = instances.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(instances[0].instance.coins.len(), 3);
    }

    #[test]
    fn test_read_instances_bad_json() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        let result = read_instances(dir.path().to_str().unwrap());
        assert!(matches!(result, Err(InstanceError::ParseError(_))));
    }

    #[test]
    fn test_evaluate_totals() {
        let mut totals = HashMap::new();
        for named in random_instances(4, 2, 3) {
            evaluate(&named, 3, &mut totals).unwrap();
        }
        for strategy in Strategy::ALL {
            let entry = &totals[&strategy];
            assert_eq!(entry.runs, 2);
            assert_eq!(entry.skipped, 0);
            assert_eq!(entry.ratio_count, 2);
            assert!(entry.ratio_sum / 2.0 >= 1.0 - 1e-9);
        }
        let exact = &totals[&Strategy::Bounded];
        assert!((exact.ratio_sum - 2.0).abs() < 1e-9);
    }
}
