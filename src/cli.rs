//! The command line interface for the scheduler.
use crate::log;
use crate::reporting::{create_output_directory, format_summary, write_results};
use crate::settings::Settings;
use crate::solve::solve_case;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser};
use std::path::{Path, PathBuf};

/// Build and solve a hydrothermal unit commitment and economic dispatch problem.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the YAML case file.
    case_file: Option<PathBuf>,
    /// Other solve options
    #[command(flatten)]
    opts: SolveOpts,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for solving a case
#[derive(Args, Default)]
pub struct SolveOpts {
    /// Solver to use: highs, simplex or ipm [default: highs]
    #[arg(long)]
    pub solver: Option<String>,
    /// Print the results as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Parse CLI arguments and solve the case
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ hydrosched --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(case_file) = cli.case_file else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    handle_solve_command(&case_file, &cli.opts, None)
}

/// Solve the case at `case_path` and print the results to stdout.
///
/// If an output directory is given, the results and log files are also written there.
pub fn handle_solve_command(
    case_path: &Path,
    opts: &SolveOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    if let Some(output_dir) = opts.output_dir.as_deref() {
        create_output_directory(output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_dir.display()
            )
        })?;
    }

    // Initialise program logger
    log::init(Some(&settings.log_level), opts.output_dir.as_deref())
        .context("Failed to initialise logging.")?;

    // This setting can be overridden by command-line argument
    let solver = opts.solver.as_deref().unwrap_or(&settings.solver);
    let (results, _, _) = solve_case(case_path, solver)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", format_summary(&results));
    }

    if let Some(output_dir) = opts.output_dir.as_deref() {
        write_results(output_dir, &results).context("Failed to write results.")?;
        info!("Results written to {}", output_dir.display());
    }

    Ok(())
}
