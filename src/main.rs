use clap::Parser;
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use thiserror::Error;

use coin_tour::error::PlanError;
use coin_tour::graph::{Instance, Point, VertexId};
use coin_tour::planners::{Planner, SearchLimits, Strategy};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Planner implementation to use to order the coins.
    #[arg(short, long, value_enum, default_value_t = Strategy::Bounded)]
    strategy: Strategy,

    /// JSON file with the origin and coins, e.g.
    /// {"origin": {"x": 0, "y": 0}, "coins": [{"x": 10, "y": 0}]}
    #[arg(short, long, conflicts_with_all = ["origin", "coins"])]
    instance: Option<String>,

    /// Where the agent starts and ends, as "x,y".
    #[arg(long, value_parser = parse_point, default_value = "0,0")]
    origin: Point,

    /// A coin to collect, as "x,y". Repeat for each coin.
    #[arg(long = "coin", value_parser = parse_point)]
    coins: Vec<Point>,

    /// Seed for the random-order planner.
    #[arg(long)]
    seed: Option<u64>,

    /// Refuse instances with more coins than this (exact planners only).
    #[arg(long)]
    max_coins: Option<usize>,

    /// Give up after this many expansions (best-first planners only).
    #[arg(long)]
    max_expansions: Option<usize>,

    /// JSON file with search limits. Flags above take precedence.
    #[arg(long)]
    limits_file: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed reading {0}")]
    ReadError(String, #[source] std::io::Error),
    #[error("Failed parsing {0}")]
    ParseError(String, #[source] serde_json::Error),
    #[error("Failed writing the result")]
    WriteError(#[source] serde_json::Error),
    #[error(transparent)]
    PlanError(#[from] PlanError),
}

#[derive(Serialize)]
struct Output {
    strategy: Strategy,
    tour: Vec<VertexId>,
    cost: f64,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s.split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{s}\""))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x in \"{s}\": {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y in \"{s}\": {e}"))?;
    Ok(Point::new(x, y))
}

fn read_json<T: serde::de::DeserializeOwned>(filename: &str) -> Result<T, CliError> {
    let data = std::fs::read_to_string(filename)
        .map_err(|e| CliError::ReadError(filename.to_string(), e))?;
    serde_json::from_str(&data)
        .map_err(|e| CliError::ParseError(filename.to_string(), e))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let instance = match &cli.instance {
        Some(filename) => {
            info!("Loading instance from {filename}");
            read_json::<Instance>(filename)?
        },
        None => Instance { origin: cli.origin, coins: cli.coins.clone() },
    };
    let file_limits = match &cli.limits_file {
        Some(filename) => {
            info!("Loading search limits from {filename}");
            read_json::<SearchLimits>(filename)?
        },
        None => SearchLimits::unlimited(),
    };
    let limits = SearchLimits {
        max_coins: cli.max_coins,
        max_expansions: cli.max_expansions,
    }.or(file_limits);

    let graph = instance.graph()?;
    let mut planner = cli.strategy.planner(limits, cli.seed);
    let tour = planner.plan(&graph)?;

    if cli.json {
        let output = Output { strategy: cli.strategy, tour: tour.vertices, cost: tour.cost };
        let json = serde_json::to_string(&output).map_err(CliError::WriteError)?;
        println!("{json}");
    } else {
        let ids: Vec<String> = tour.vertices.iter().map(|v| v.to_string()).collect();
        println!("{}", ids.join(" "));
        println!("cost: {:.3}", tour.cost);
    }
    Ok(())
}

fn main() {
    // Load .env file
    dotenvy::dotenv().ok();
    // Init logger with default value of info
    // This can be overriden with RUST_LOG env var
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        error!("Error while planning:");
        error!("  {}", err);
        if let Some(source) = std::error::Error::source(&err) {
            error!("  caused by: {}", source);
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("10,0"), Ok(Point::new(10.0, 0.0)));
        assert_eq!(parse_point(" 1.5 , -2 "), Ok(Point::new(1.5, -2.0)));
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,1").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "coin-tour", "--strategy", "micko", "--coin", "10,0", "--coin", "10,10",
            "--max-expansions", "100",
        ]).unwrap();
        assert_eq!(cli.strategy, Strategy::Bounded);
        assert_eq!(cli.origin, Point::new(0.0, 0.0));
        assert_eq!(cli.coins, vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);
        assert_eq!(cli.max_expansions, Some(100));
        assert!(run(cli).is_ok());
    }

    #[test]
    fn test_instance_conflicts_with_coins() {
        let cli = Cli::try_parse_from([
            "coin-tour", "--instance", "coins.json", "--coin", "1,1",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_instance_and_limits_files() {
        let cli = Cli::try_parse_from([
            "coin-tour", "--strategy", "exhaustive", "--instance", "instances/square.json",
            "--limits-file", "instances/limits.json", "--json",
        ]).unwrap();
        assert!(run(cli).is_ok());

        let limits: SearchLimits = read_json("instances/limits.json").unwrap();
        assert_eq!(limits.max_coins, Some(12));
    }

    #[test]
    fn test_missing_instance_file() {
        let cli = Cli::try_parse_from([
            "coin-tour", "--instance", "/nonexistent/coins.json",
        ]).unwrap();
        assert!(matches!(run(cli), Err(CliError::ReadError(..))));
    }

    #[test]
    fn test_json_output() {
        let output = Output { strategy: Strategy::Exhaustive, tour: vec![0, 1, 0], cost: 20.0 };
        let json = serde_json::to_string(&output).map_err(CliError::WriteError).unwrap();
        assert_eq!(json, r#"{"strategy":"exhaustive","tour":[0,1,0],"cost":20.0}"#);
    }
}
