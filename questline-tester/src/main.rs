mod logic;
mod scenarios;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use questline_game::{CatalogLoader, JsonLoader};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{LogicTester, ScenarioResult};
use scenarios::{expand_scenarios, get_scenario, list_scenarios};
use util::{parse_seeds, split_csv};

#[derive(Debug, Parser)]
#[command(name = "questline-tester", version)]
#[command(about = "Automated QA playthroughs for the Questline progression engine")]
struct Args {
    /// Catalog JSON to test (defaults to the bundled sample)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Game config JSON (save key, minigame tuning, reveal timings)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep saves as files in this directory instead of in memory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&split_csv(&args.scenarios));
    let seeds = parse_seeds(&split_csv(&args.seeds))?;
    let loader = load_catalog(args.catalog.as_ref(), args.config.as_ref())?;
    let tester = LogicTester::new(loader, args.save_dir.clone(), args.verbose);

    let results = run_logic_scenarios(&args, &scenarios, &seeds, &tester);
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:15} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🗺️  Questline Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

/// Read the catalog up front so a bad file fails once, not per iteration.
fn load_catalog(path: Option<&PathBuf>, config: Option<&PathBuf>) -> Result<JsonLoader> {
    let mut loader = match path {
        Some(path) => JsonLoader::from_path(path)?,
        None => JsonLoader::bundled(),
    };
    if let Some(config) = config {
        loader = loader.with_config_file("game", config)?;
    }
    let catalog = loader.load_catalog().with_context(|| match path {
        Some(path) => format!("invalid catalog {}", path.display()),
        None => "invalid bundled catalog".to_string(),
    })?;
    log::info!("testing catalog with {} themes", catalog.theme_count());
    Ok(loader)
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    tester: &LogicTester,
) -> Vec<ScenarioResult> {
    let mut results = Vec::new();

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(tester.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            logic::reports::generate_json_report(&mut output_target, results)?;
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Questline Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
