mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{
    GameTester, LogicTester, PlayStrategy, PlaythroughRecord, ScenarioResult, build_scenarios,
    resolve_seed_inputs, split_csv,
};

#[derive(Debug, Parser)]
#[command(name = "drillkit-tester", version = "0.1.0")]
#[command(about = "Automated play-through QA for drillkit preparedness games")]
struct Args {
    /// Games to play (comma-separated ids, or "all")
    #[arg(long, default_value = "all")]
    games: String,

    /// List all available games and exit
    #[arg(long)]
    list_games: bool,

    /// Play strategies (perfect,random,careless,idle)
    #[arg(long, default_value = "perfect,random,careless,idle")]
    policies: String,

    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_module("drillkit_tester", log::LevelFilter::Debug);
    }
    logger.init();
    let tester = GameTester::try_new(args.verbose)?;

    if maybe_list_games(&args, &tester)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let strategies = parse_strategies(&args.policies);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let (results, records) = run_scenarios(&args, &tester, &strategies, &seeds);

    write_reports(&args, &results, &records, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_games(args: &Args, tester: &GameTester) -> Result<bool> {
    if !args.list_games {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available games:")?;
    for game in tester.library().iter() {
        writeln!(
            output_target.writer(),
            "  {:28} - {} ({})",
            game.id,
            game.title,
            game.variant.label()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Drillkit Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn parse_strategies(policies: &str) -> Vec<PlayStrategy> {
    let mut strategies = Vec::new();
    for token in split_csv(policies) {
        if token == "all" {
            strategies.extend(PlayStrategy::ALL);
            continue;
        }
        match PlayStrategy::from_label(&token) {
            Some(strategy) => strategies.push(strategy),
            None => eprintln!("⚠️  Unknown policy: {}", token.yellow()),
        }
    }
    strategies.dedup();
    strategies
}

fn run_scenarios(
    args: &Args,
    tester: &GameTester,
    strategies: &[PlayStrategy],
    seeds: &[u64],
) -> (Vec<ScenarioResult>, Vec<PlaythroughRecord>) {
    println!("{}", "🧠 Running Play-through Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let games: Vec<String> = split_csv(&args.games)
        .into_iter()
        .filter(|id| {
            let known = id == "all" || tester.library().get(id).is_some();
            if !known {
                eprintln!("⚠️  Unknown game: {}", id.yellow());
            }
            known
        })
        .collect();

    let scenarios = build_scenarios(tester.library(), &games, strategies);
    log::info!(
        "running {} scenarios over {} seeds, {} iterations each",
        scenarios.len(),
        seeds.len(),
        args.iterations
    );

    let logic_tester = LogicTester::new(tester.clone());
    let mut results = Vec::new();
    let mut records = Vec::new();
    for scenario in scenarios {
        let (scenario_results, scenario_records) =
            logic_tester.run_scenario(&scenario, seeds, args.iterations);
        results.extend(scenario_results);
        records.extend(scenario_records);
    }
    (results, records)
}

fn write_reports(
    args: &Args,
    results: &[ScenarioResult],
    records: &[PlaythroughRecord],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Drillkit Play-through Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => logic::reports::generate_csv_report(&mut output_target, records)?,
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
        }
    }

    if !matches!(args.report.as_str(), "json" | "csv") {
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            games: "hazard_sort".to_string(),
            list_games: false,
            policies: "perfect".to_string(),
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("drillkit-{}-{name}", std::process::id()))
    }

    #[test]
    fn parse_strategies_expands_all_and_skips_unknown() {
        assert_eq!(parse_strategies("all"), PlayStrategy::ALL.to_vec());
        assert_eq!(
            parse_strategies("idle,genius,random"),
            vec![PlayStrategy::Idle, PlayStrategy::Random]
        );
    }

    #[test]
    fn run_scenarios_skips_unknown_games() {
        let tester = GameTester::try_new(false).unwrap();
        let args = Args {
            games: "hazard_sort,tetris".to_string(),
            ..base_args()
        };
        let (results, records) = run_scenarios(&args, &tester, &[PlayStrategy::Perfect], &[7]);
        assert_eq!(results.len(), 1);
        assert_eq!(records.len(), 1);
        assert!(results[0].passed);
    }

    #[test]
    fn maybe_list_games_writes_output() {
        let tester = GameTester::try_new(false).unwrap();
        let temp = temp_file("games.txt");
        let args = Args {
            list_games: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_games(&args, &tester).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available games"));
        assert!(content.contains("pack_your_bag"));
    }

    #[test]
    fn maybe_list_games_returns_false_when_disabled() {
        let tester = GameTester::try_new(false).unwrap();
        assert!(!maybe_list_games(&base_args(), &tester).unwrap());
    }

    #[test]
    fn write_reports_emits_empty_json() {
        let temp = temp_file("empty.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_file("empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn write_reports_emits_csv_header_without_records() {
        let temp = temp_file("empty.csv");
        let args = Args {
            report: "csv".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.starts_with("game,strategy,seed"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
