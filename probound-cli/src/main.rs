use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Error};
use clap::{value_t, App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use probound::{PropagatingOracle, Solver, SolverConfig};
use probound_facts::{read_problem, write_exprs, write_results};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "{}", record.args())
        } else {
            writeln!(buf, "{}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("PROBOUND_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("probound")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage(
            "<testdir> --testdir=<DIR> 'Directory containing facts.txt and edges.txt'",
        )
        .arg_from_usage(
            "[outdir] --outdir=[DIR] 'Directory for results.txt and exprs.txt (testdir if omitted)'",
        )
        .arg(
            Arg::from_usage(
                "[max-class-size] --max-class-size=[N] 'Largest allowed correlation class'",
            )
            .validator(|value| {
                value
                    .parse::<usize>()
                    .map(|_| ())
                    .map_err(|err| err.to_string())
            }),
        )
        .arg_from_usage("--print-exprs 'Print each output fact's expression to the log'")
        .get_matches();

    init_logging();
    info!("This is probound {}", env!("CARGO_PKG_VERSION"));

    let testdir = Path::new(matches.value_of("testdir").unwrap()).to_owned();
    let outdir = match matches.value_of("outdir") {
        Some(path) => Path::new(path).to_owned(),
        None => testdir.clone(),
    };

    let mut config = SolverConfig::default();
    if matches.is_present("max-class-size") {
        config.max_class_size =
            value_t!(matches, "max-class-size", usize).unwrap_or_else(|e| e.exit());
    }

    info!("Reading problem from '{}'", testdir.display());
    let facts_file = fs::File::open(testdir.join("facts.txt"))?;
    let edges_file = fs::File::open(testdir.join("edges.txt"))?;
    let problem = read_problem(facts_file, edges_file)?;
    info!(
        "{} facts, {} rules",
        problem.fact_count(),
        problem.rule_count()
    );

    let mut solver = Solver::with_config(PropagatingOracle::new(), config);
    solver.load_problem(&problem)?;

    let start = Instant::now();
    let results = solver.solve_bounds()?;
    info!("Solved {} output facts in {:?}", results.len(), start.elapsed());

    fs::create_dir_all(&outdir)?;

    let results_file = fs::File::create(outdir.join("results.txt"))?;
    write_results(
        results_file,
        results
            .iter()
            .map(|bounds| (bounds.fact.as_str(), bounds.min.value(), bounds.max.value())),
    )?;
    info!(
        "Wrote bounds to '{}'",
        outdir.join("results.txt").display()
    );

    let mut exprs = Vec::with_capacity(results.len());
    for bounds in &results {
        let expr = solver
            .expression(&bounds.fact)
            .ok_or_else(|| anyhow!("no expression built for '{}'", bounds.fact))?;
        if matches.is_present("print-exprs") {
            info!("{} = {}", bounds.fact, expr);
        }
        exprs.push((bounds.fact.as_str(), expr));
    }
    let exprs_file = fs::File::create(outdir.join("exprs.txt"))?;
    write_exprs(
        exprs_file,
        exprs.iter().map(|(fact, expr)| (*fact, expr.as_str())),
    )?;

    if results.iter().all(|b| b.min.is_optimal() && b.max.is_optimal()) {
        Ok(0)
    } else {
        // Partial results were written; signal that some bounds are missing.
        Ok(2)
    }
}
