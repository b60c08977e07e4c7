//! Command-line front end for the finite model builder

use clap::{Parser, ValueEnum};
use modelatlas::{
    parse_tptp_file, ConfigError, EnumerationStrategy, FiniteModelBuilder, FmbConfig, FmbError, FmbProblem,
    FmbResult, SymbolOrder, WidgetOrder,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Nogood,
    Constraint,
    Contour,
}

impl From<Strategy> for EnumerationStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Nogood => EnumerationStrategy::NogoodPriority,
            Strategy::Constraint => EnumerationStrategy::ConstraintSolver,
            Strategy::Contour => EnumerationStrategy::Contour,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Widgets {
    FunctionFirst,
    ArgumentFirst,
    Diagonal,
}

impl From<Widgets> for WidgetOrder {
    fn from(order: Widgets) -> Self {
        match order {
            Widgets::FunctionFirst => WidgetOrder::FunctionFirst,
            Widgets::ArgumentFirst => WidgetOrder::ArgumentFirst,
            Widgets::Diagonal => WidgetOrder::Diagonal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Symbols {
    Occurrence,
    Usage,
    PreprocessedUsage,
}

impl From<Symbols> for SymbolOrder {
    fn from(order: Symbols) -> Self {
        match order {
            Symbols::Occurrence => SymbolOrder::Occurrence,
            Symbols::Usage => SymbolOrder::Usage,
            Symbols::PreprocessedUsage => SymbolOrder::PreprocessedUsage,
        }
    }
}

#[derive(Parser)]
#[command(name = "fmb", version)]
#[command(about = "Finite model builder for TPTP clause sets", long_about = None)]
struct Cli {
    /// TPTP problem file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Directory searched for included files (repeatable)
    #[arg(short = 'I', long, value_name = "DIR")]
    include: Vec<String>,

    /// JSON configuration; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Size enumeration strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Size every sort starts from
    #[arg(long)]
    start_size: Option<u32>,

    /// Time limit in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Fraction of each sort used for symmetry breaking
    #[arg(long)]
    symmetry_ratio: Option<f32>,

    /// Order of grounded terms used by symmetry breaking
    #[arg(long, value_enum)]
    widget_order: Option<Widgets>,

    /// Order of symbols inside each sort
    #[arg(long, value_enum)]
    symbol_order: Option<Symbols>,

    /// Bound sorts without non-constant functions by their constants
    #[arg(long)]
    detect_sort_bounds: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log every round
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<FmbConfig, FmbError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| modelatlas::ParseError::Io {
                path: path.clone(),
                source,
            })?;
            FmbConfig::from_json_str(&text)?
        }
        None => FmbConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.enumeration_strategy = strategy.into();
    }
    if let Some(start_size) = cli.start_size {
        config.start_size = start_size;
    }
    if let Some(secs) = cli.time_limit {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ConfigError::InvalidTimeLimit(secs).into());
        }
        config.time_limit = Duration::from_secs_f64(secs);
    }
    if let Some(ratio) = cli.symmetry_ratio {
        config.symmetry_ratio = ratio;
    }
    if let Some(order) = cli.widget_order {
        config.widget_order = order.into();
    }
    if let Some(order) = cli.symbol_order {
        config.symbol_order = order.into();
    }
    if cli.detect_sort_bounds {
        config.detect_sort_bounds = true;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<FmbResult, FmbError> {
    let config = load_config(cli)?;
    let started = Instant::now();
    let include_dirs: Vec<&str> = cli.include.iter().map(|s| s.as_str()).collect();
    let deadline = started + config.time_limit;
    let parsed = parse_tptp_file(&cli.file.to_string_lossy(), &include_dirs, Some(deadline))?;
    info!(clauses = parsed.formula.clauses.len(), "parsed input");

    let problem = FmbProblem::from_cnf(parsed.formula, parsed.interner)?;
    let mut builder = FiniteModelBuilder::new(problem, config)?;
    let result = builder.run()?;
    let elapsed = started.elapsed().as_secs_f64();

    let name = cli.file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    if cli.json {
        let json = result.to_json(builder.statistics(), elapsed, &builder.problem().interner);
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("failed to serialize result: {}", e),
        }
    } else {
        println!("% SZS status {} for {}", result.status(), name);
        if let FmbResult::GaveUp(reason) = &result {
            println!("% {}", reason);
        }
        if let Some(model) = result.model() {
            println!("% SZS output start FiniteModel for {}", name);
            print!("{}", model.display(&builder.problem().interner));
            println!("% SZS output end FiniteModel for {}", name);
        }
        println!("% {} rounds in {:.3}s", builder.statistics().rounds, elapsed);
    }
    Ok(result)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(FmbError::Parse(modelatlas::ParseError::Timeout)) => {
            println!("% SZS status Timeout");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(args: &[&str]) -> Result<FmbConfig, FmbError> {
        let mut argv = vec!["fmb", "problem.p"];
        argv.extend_from_slice(args);
        load_config(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_rejects_bad_time_limits() {
        for limit in ["--time-limit=-1", "--time-limit=NaN", "--time-limit=inf"] {
            let result = load(&[limit]);
            assert!(
                matches!(result, Err(FmbError::Config(ConfigError::InvalidTimeLimit(_)))),
                "{}: {:?}",
                limit,
                result
            );
        }
        let config = load(&["--time-limit", "2.5"]).unwrap();
        assert_eq!(config.time_limit, Duration::from_millis(2500));
    }

    #[test]
    fn test_order_flags() {
        let config = load(&["--widget-order", "diagonal", "--symbol-order", "preprocessed-usage"]).unwrap();
        assert_eq!(config.widget_order, WidgetOrder::Diagonal);
        assert_eq!(config.symbol_order, SymbolOrder::PreprocessedUsage);
        assert_eq!(load(&[]).unwrap().widget_order, WidgetOrder::FunctionFirst);
    }
}
