use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use comm_eval::config::EvalConfig;
use comm_eval::loader::{read_ground_truth, read_graph, read_partition, GraphFormat, PartitionFormat};
use comm_eval::logger::init_logger;
use comm_eval::partition::{group_by_label, Labeling, Partition};
use comm_eval::report::{compare_entropy, compare_quality, ComparisonReport};

/// Evaluate community detection results.
#[derive(Parser)]
#[command(name = "comm-eval", version)]
struct Cli {
    /// YAML configuration file, command line flags win over it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of `default.log`.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GraphArgs {
    /// Graph file.
    #[arg(long)]
    graph: PathBuf,

    #[arg(long, value_enum, default_value_t = GraphFormat::Metis)]
    graph_format: GraphFormat,

    /// Read an edge list as a directed graph.
    #[arg(long)]
    directed: bool,

    #[arg(long, value_enum, default_value_t = PartitionFormat::Metis)]
    partition_format: PartitionFormat,

    /// Evaluate partitions one after another.
    #[arg(long)]
    sequential: bool,

    /// Also write the metric records as JSON.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Modularity, conductance and normalized cut of each partition.
    Quality {
        #[command(flatten)]
        graph: GraphArgs,

        /// Modularity resolution.
        #[arg(long)]
        resolution: Option<f64>,

        #[arg(required = true)]
        partitions: Vec<PathBuf>,
    },
    /// Entropy of each partition against a ground truth.
    Entropy {
        #[command(flatten)]
        graph: GraphArgs,

        /// One ground-truth community per line.
        #[arg(long)]
        ground_truth: PathBuf,

        #[arg(required = true)]
        partitions: Vec<PathBuf>,
    },
    /// Correlate metrics stored as `{method: {metric: value}}` JSON.
    Correlate {
        #[arg(long)]
        input: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<EvalConfig> {
    let mut config = match &cli.config {
        Some(path) => EvalConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EvalConfig::default(),
    };
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = log_dir.clone();
    }
    match &cli.command {
        Command::Quality { graph, resolution, .. } => {
            apply_graph_args(&mut config, graph);
            if let Some(resolution) = resolution {
                config.resolution = *resolution;
            }
        }
        Command::Entropy { graph, .. } => apply_graph_args(&mut config, graph),
        Command::Correlate { .. } => {}
    }
    config.validate("command line")?;
    Ok(config)
}

fn apply_graph_args(config: &mut EvalConfig, args: &GraphArgs) {
    if args.directed {
        config.directed = true;
    }
    if args.sequential {
        config.parallel = false;
    }
}

fn load_labelings(paths: &[PathBuf], format: PartitionFormat) -> Result<Vec<(String, Labeling)>> {
    paths.iter()
        .map(|path| {
            let labeling = read_partition(path, format)
                .with_context(|| format!("failed to load partition {}", path.display()))?;
            Ok((path.display().to_string(), labeling))
        })
        .collect()
}

fn write_json(path: &Option<PathBuf>, report: &ComparisonReport) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, report.to_json())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Metric records written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &ComparisonReport) -> Result<()> {
    println!("{}", report);
    if report.len() >= 2 {
        let matrix = report.correlate().context("failed to correlate metrics")?;
        println!("Correlation Matrix:");
        println!("{}", matrix);
    }
    Ok(())
}

fn run_quality(config: &EvalConfig, args: &GraphArgs, partition_paths: &[PathBuf]) -> Result<()> {
    let graph = read_graph(&args.graph, args.graph_format, config.directed)
        .with_context(|| format!("failed to load graph {}", args.graph.display()))?;
    let partitions: Vec<(String, Partition)> = load_labelings(partition_paths, args.partition_format)?
        .into_iter()
        .map(|(name, labeling)| (name, group_by_label(&labeling)))
        .collect();
    let report = compare_quality(&graph, &partitions, config)?;
    print_report(&report)?;
    write_json(&args.json, &report)
}

fn run_entropy(config: &EvalConfig, args: &GraphArgs, truth_path: &Path, partition_paths: &[PathBuf]) -> Result<()> {
    let graph = read_graph(&args.graph, args.graph_format, config.directed)
        .with_context(|| format!("failed to load graph {}", args.graph.display()))?;
    let truth = read_ground_truth(truth_path)
        .with_context(|| format!("failed to load ground truth {}", truth_path.display()))?;
    let labelings = load_labelings(partition_paths, args.partition_format)?;
    let report = compare_entropy(&graph, &truth, &labelings, config);
    print_report(&report)?;
    write_json(&args.json, &report)
}

fn run_correlate(input: &Path) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let report = ComparisonReport::from_json(&text, &input.display().to_string())?;
    let matrix = report.correlate()?;
    println!("Correlation Matrix:");
    println!("{}", matrix);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let log_path = init_logger(&config.log_dir).map_err(|e| anyhow!("failed to initialise logger: {}", e))?;
    info!("Run configuration: {:?}, logging to {}", config, log_path.display());

    match &cli.command {
        Command::Quality { graph, partitions, .. } => run_quality(&config, graph, partitions),
        Command::Entropy { graph, ground_truth, partitions } => {
            run_entropy(&config, graph, ground_truth, partitions)
        }
        Command::Correlate { input } => run_correlate(input),
    }
}
