//! Command-line entry point for supercoder.
//!
//! `supercoder run` turns a task description into a working, self-checking
//! program. `supercoder init` writes `.supercoder/config.toml`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use supercoder::core::types::Attempt;
use supercoder::exit_codes;
use supercoder::io::artifact::{ArtifactPaths, default_config_path};
use supercoder::io::config::{SupercoderConfig, load_config, write_config};
use supercoder::io::console::prompt_for_task;
use supercoder::io::editor::open_in_editor;
use supercoder::io::linter::CommandLinter;
use supercoder::io::oracle::build_oracle;
use supercoder::io::sandbox::CommandSandbox;
use supercoder::lint_loop::LintStop;
use supercoder::logging;
use supercoder::optimize::OptimizationDecision;
use supercoder::pipeline::{PipelineOptions, PipelineOutcome, run_pipeline};

#[derive(Parser)]
#[command(
    name = "supercoder",
    version,
    about = "Generate, run, and repair programs with an LLM until they pass their own checks"
)]
struct Cli {
    /// Config file (defaults to `.supercoder/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `.supercoder/config.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Generate a program for TASK (asks on the console when omitted).
    Run(RunArgs),
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Natural-language description of the program.
    task: Option<String>,

    /// Generation attempt budget.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Corrupt the first candidate with this seed to exercise repair.
    #[arg(long)]
    noise_seed: Option<u64>,

    /// Skip the optimization comparison.
    #[arg(long)]
    no_optimize: bool,

    /// Skip lint repair.
    #[arg(long)]
    no_lint: bool,

    /// Where to write the generated program.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Open the finished program in an editor.
    #[arg(long)]
    open: bool,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve current directory")?;
    let config_path = cli.config.unwrap_or_else(|| default_config_path(&root));
    match cli.command {
        Command::Init { force } => cmd_init(&config_path, force),
        Command::Run(args) => cmd_run(&root, &config_path, args),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &SupercoderConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn apply_overrides(cfg: &mut SupercoderConfig, args: &RunArgs) -> Result<()> {
    if let Some(max_attempts) = args.max_attempts {
        cfg.max_attempts = max_attempts;
    }
    if let Some(seed) = args.noise_seed {
        cfg.noise_seed = Some(seed);
    }
    if args.no_optimize {
        cfg.optimize = false;
    }
    if args.no_lint {
        cfg.lint = false;
    }
    if let Some(output) = &args.output {
        cfg.output_path = output.clone();
    }
    cfg.validate()
}

fn cmd_run(root: &Path, config_path: &Path, args: RunArgs) -> Result<i32> {
    let mut cfg = load_config(config_path)?;
    apply_overrides(&mut cfg, &args)?;

    let oracle = build_oracle(&cfg.oracle, cfg.output_limit_bytes)?;
    let task = match args.task.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(task) => task.to_string(),
        None => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            prompt_for_task(&mut input, &mut io::stdout(), &mut rand::thread_rng())?
        }
    };

    let sandbox = CommandSandbox::new(cfg.sandbox.command.clone(), cfg.output_limit_bytes);
    let linter = CommandLinter::new(cfg.linter.command.clone(), cfg.output_limit_bytes);
    let paths = ArtifactPaths::new(root, &cfg.output_path);
    let options = PipelineOptions::from_config(&cfg);

    println!("Generating code...");
    let outcome = run_pipeline(
        oracle.as_ref(),
        &sandbox,
        &linter,
        &paths,
        &task,
        &options,
        |attempt| report_attempt(attempt, options.max_attempts),
    )?;
    io::stdout().flush().context("flush stdout")?;

    if !outcome.success {
        println!("Code generation FAILED");
        if let Some(diagnostic) = &outcome.summary.last_diagnostic {
            println!("Last error:\n{diagnostic}");
        }
        println!("Last candidate: {}", paths.candidate_path.display());
        return Ok(exit_codes::GENERATION_FAILED);
    }

    report_success(&outcome, &paths);
    if args.open {
        open_in_editor(&paths.candidate_path);
    }
    Ok(exit_codes::OK)
}

fn report_attempt(attempt: &Attempt, max_attempts: u32) {
    print!(
        "Attempt {}/{}: running the generated code... ",
        attempt.number, max_attempts
    );
    match attempt.outcome.failure() {
        None => println!("ok"),
        Some(failure) => println!("failed\n{}", failure.diagnostic()),
    }
}

fn report_success(outcome: &PipelineOutcome, paths: &ArtifactPaths) {
    match &outcome.summary.optimization {
        Some(OptimizationDecision::Adopted { baseline, variant }) => println!(
            "Optimized version adopted ({} ms -> {} ms)",
            baseline.as_millis(),
            variant.as_millis()
        ),
        Some(OptimizationDecision::NotImproved { .. }) => {
            println!("Optimized version was not faster; kept the original");
        }
        Some(other) => println!("Optimization skipped: {}", describe_decision(other)),
        None => {}
    }
    match &outcome.summary.lint {
        Some(LintStop::Clean) => println!("Lint: clean"),
        Some(LintStop::Exhausted) => println!(
            "Lint: findings remain, see {}",
            paths.lint_log_path.display()
        ),
        Some(LintStop::OracleUnavailable { detail } | LintStop::LinterUnavailable { detail }) => {
            println!("Lint: skipped ({detail})");
        }
        None => {}
    }
    if outcome.summary.lint_verified == Some(false) {
        println!("Lint fixes broke the program; kept the last working version");
    }

    println!("Code creation completed successfully!");
    println!("Wrote {}", paths.candidate_path.display());
    if let Some(stdout) = outcome.summary.final_stdout.as_deref() {
        let stdout = stdout.trim_end();
        if !stdout.is_empty() {
            println!("{stdout}");
        }
    }
}

fn describe_decision(decision: &OptimizationDecision) -> String {
    match decision {
        OptimizationDecision::VariantFailed { detail } => format!("variant failed: {detail}"),
        OptimizationDecision::BaselineFailed { detail } => format!("baseline failed: {detail}"),
        OptimizationDecision::OracleUnavailable { detail } => detail.clone(),
        OptimizationDecision::Adopted { .. } | OptimizationDecision::NotImproved { .. } => {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["supercoder", "init"]);
        assert!(matches!(cli.command, Command::Init { force: false }));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["supercoder", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn parse_run_flags() {
        let cli = Cli::parse_from([
            "supercoder",
            "run",
            "check if a number is prime",
            "--max-attempts",
            "3",
            "--noise-seed",
            "7",
            "--no-lint",
            "--open",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.task.as_deref(), Some("check if a number is prime"));
        assert_eq!(args.max_attempts, Some(3));
        assert_eq!(args.noise_seed, Some(7));
        assert!(args.no_lint);
        assert!(!args.no_optimize);
        assert!(args.open);
    }

    #[test]
    fn overrides_win_over_config() {
        let mut cfg = SupercoderConfig::default();
        let args = RunArgs {
            max_attempts: Some(2),
            no_optimize: true,
            output: Some(PathBuf::from("out.py")),
            ..RunArgs::default()
        };
        apply_overrides(&mut cfg, &args).expect("overrides");
        assert_eq!(cfg.max_attempts, 2);
        assert!(!cfg.optimize);
        assert!(cfg.lint);
        assert_eq!(cfg.output_path, PathBuf::from("out.py"));
    }

    #[test]
    fn zero_attempt_override_is_rejected() {
        let mut cfg = SupercoderConfig::default();
        let args = RunArgs {
            max_attempts: Some(0),
            ..RunArgs::default()
        };
        assert!(apply_overrides(&mut cfg, &args).is_err());
    }
}
