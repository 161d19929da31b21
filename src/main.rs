//! Max-SC-QBF - Command Line Interface
//!
//! Formulates Max-SC-QBF instances as binary linear programs, solves them
//! with a MILP oracle, generates random instances and summarizes run logs.

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use max_sc_qbf::formulation::formulate;
use max_sc_qbf::generator::{generate_batch, GeneratorConfig, SubsetSizeStrategy};
use max_sc_qbf::instance::Instance;
use max_sc_qbf::oracle::{default_oracle, OracleConfig};
use max_sc_qbf::report::{export_csv, generate_report, harvest_dir};
use max_sc_qbf::run_log::RunLog;
use max_sc_qbf::solution::Solution;

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "max-sc-qbf")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Exact MILP formulation of the Max-SC-QBF problem")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Solve when no subcommand is given
    #[command(flatten)]
    solve: SolveArgs,
}

#[derive(Args, Debug, PartialEq)]
struct SolveArgs {
    /// Path to the instance file
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for the run log and solution
    #[arg(long, default_value = "logs")]
    outdir: PathBuf,

    /// Print the parsed instance before solving
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Formulate and solve an instance (the default)
    Solve(SolveArgs),

    /// Generate random instances (sizes x seeds)
    Generate {
        /// Output directory
        #[arg(short, long, default_value = "instances")]
        outdir: PathBuf,

        /// Instance sizes
        #[arg(long, value_delimiter = ',', default_value = "25,50,100,200,400")]
        sizes: Vec<usize>,

        /// Seeds, one instance per size and seed
        #[arg(long, value_delimiter = ',', default_value = "42,69,420")]
        seeds: Vec<u64>,

        /// Subset size strategy
        #[arg(long, value_enum, default_value = "uniform")]
        strategy: Strategy,

        /// Subset size for the fixed strategy
        #[arg(long, default_value = "3")]
        subset_size: usize,

        /// Repair subsets so that every element is covered
        #[arg(long)]
        ensure_cover: bool,
    },

    /// Summarize a directory of run logs
    Report {
        /// Directory containing .log files
        #[arg(short, long, default_value = "logs")]
        dir: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "results.csv")]
        output: PathBuf,
    },

    /// Analyze an instance and the size of its formulation
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        input: PathBuf,

        /// Write the formulated model in CPLEX LP format
        #[arg(long)]
        lp: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Strategy {
    Uniform,
    Fixed,
    Logarithmic,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Solve(cli.solve)) {
        Commands::Solve(args) => {
            let Some(input) = args.input else {
                Cli::command()
                    .error(ErrorKind::MissingRequiredArgument, "--input <INPUT> is required to solve")
                    .exit()
            };
            let config = OracleConfig {
                verbose: args.verbose,
                ..Default::default()
            };
            solve_instance(&input, &args.outdir, config, args.verbose);
        }

        Commands::Generate { outdir, sizes, seeds, strategy, subset_size, ensure_cover } => {
            let strategy = match strategy {
                Strategy::Uniform => SubsetSizeStrategy::Uniform,
                Strategy::Fixed => SubsetSizeStrategy::Fixed(subset_size),
                Strategy::Logarithmic => SubsetSizeStrategy::Logarithmic,
            };
            let config = GeneratorConfig {
                sizes,
                seeds,
                strategy,
                ensure_cover,
            };
            generate_instances(&config, &outdir);
        }

        Commands::Report { dir, output } => {
            run_report(&dir, &output);
        }

        Commands::Analyze { input, lp } => {
            analyze_instance(&input, lp.as_deref());
        }
    }
}

fn load_instance(path: &Path) -> Instance {
    match Instance::from_file(path) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve_instance(
    path: &Path,
    outdir: &Path,
    config: OracleConfig,
    verbose: bool,
) {
    println!("Loading instance from {:?}...", path);
    let instance = load_instance(path);

    if verbose {
        println!("{}", instance);
        println!("{}", instance.statistics());
    }

    let start = Instant::now();
    let formulated = formulate(&instance);
    println!("Formulation: {}", formulated.summary());

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "instance".to_string());

    let mut run_log = match RunLog::create(outdir, &stem) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error creating run log in {:?}: {}", outdir, e);
            std::process::exit(1);
        }
    };
    run_log.line(format!("Instance {:?} (n = {})", path, instance.size()));
    run_log.line(format!("Formulation: {}", formulated.summary()));

    let oracle = default_oracle(config);

    println!("Solving with {}...", oracle.name());
    let result = match oracle.solve(&formulated, &mut run_log) {
        Ok(result) => result,
        Err(e) => {
            run_log.line(format!("Oracle error: {}", e));
            run_log.flush();
            eprintln!("Oracle error: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    println!("\n========== Results ==========");
    println!("Status: {}", result.status);

    let solution = match Solution::from_oracle(&instance, &result) {
        Some(solution) => solution,
        None => {
            if result.is_infeasible() {
                println!("Model is infeasible");
            } else {
                println!("No solution found");
            }
            println!("Time: {:.4}s", elapsed.as_secs_f64());
            if let Some(log_path) = run_log.path() {
                println!("Run log: {:?}", log_path);
            }
            return;
        }
    };

    for (i, &chosen) in solution.selection.iter().enumerate() {
        println!("Variable {}: {}", i + 1, if chosen { 1 } else { 0 });
    }
    println!("Objective: {}", solution.objective);
    if let Some(gap) = solution.gap {
        println!("Gap: {:.4}%", gap * 100.0);
    }
    println!("Covers universe: {}", solution.covers_universe);
    println!("Time: {:.4}s", elapsed.as_secs_f64());

    let out_path = outdir.join(format!("{}.json", stem));
    match solution.save_json(&out_path) {
        Ok(()) => println!("\nSolution saved to {:?}", out_path),
        Err(e) => log::error!("Failed to save solution to {:?}: {}", out_path, e),
    }
    if let Some(log_path) = run_log.path() {
        println!("Run log: {:?}", log_path);
    }
}

fn generate_instances(config: &GeneratorConfig, outdir: &Path) {
    println!(
        "Generating {} instances ({} strategy) into {:?}...",
        config.sizes.len() * config.seeds.len(),
        config.strategy,
        outdir
    );

    match generate_batch(config, outdir) {
        Ok(paths) => println!("Wrote {} instances", paths.len()),
        Err(e) => {
            eprintln!("Error generating instances: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_report(dir: &Path, output: &Path) {
    println!("Processing logs in {:?}...", dir);

    let summaries = match harvest_dir(dir) {
        Ok(summaries) => summaries,
        Err(e) => {
            eprintln!("Error reading {:?}: {}", dir, e);
            std::process::exit(1);
        }
    };

    if summaries.is_empty() {
        eprintln!("No .log files found!");
        return;
    }

    if let Err(e) = export_csv(&summaries, output) {
        eprintln!("Error writing {:?}: {}", output, e);
        std::process::exit(1);
    }
    println!("Results exported to {:?}", output);

    println!("\n{}", generate_report(&summaries));
}

fn analyze_instance(path: &Path, lp: Option<&Path>) {
    let instance = load_instance(path);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let uncovered = instance.uncovered_elements();
    if uncovered.is_empty() {
        println!("Every element is covered by at least one subset");
    } else {
        println!("Uncovered elements (model is infeasible): {:?}", uncovered);
    }

    let formulated = formulate(&instance);
    println!("\nFormulation: {}", formulated.summary());

    if let Some(lp_path) = lp {
        match std::fs::write(lp_path, formulated.model().to_lp_string()) {
            Ok(()) => println!("Model written to {:?}", lp_path),
            Err(e) => {
                eprintln!("Error writing {:?}: {}", lp_path, e);
                std::process::exit(1);
            }
        }
    }
}
