//! Command-line tool for dependent exposed filters on gather views.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use trovato_dependent_filters::Config;
use trovato_dependent_filters::cli;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding gather_view.*.yml files (overrides GATHER_VIEWS_DIR).
    #[arg(long, global = true)]
    views_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List views and their dependent filter instances.
    List,
    /// Print the admin summary of every filter in a view.
    Summary { view: String },
    /// Print a filter's admin options form as JSON.
    AdminForm { view: String, filter: String },
    /// Validate and save admin options for a filter.
    Configure {
        view: String,
        filter: String,
        /// Submitted option values as a JSON object.
        #[arg(long)]
        values: String,
    },
    /// Add a filter to a view.
    Add {
        view: String,
        filter: String,
        #[arg(long, default_value = "dependent")]
        handler: String,
        /// Insert position; appended when omitted.
        #[arg(long)]
        position: Option<usize>,
    },
    /// Process exposed input and print the outcome as JSON.
    Evaluate {
        view: String,
        /// JSON file with submitted input, or '-' for stdin.
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Check every view; exits non-zero when problems are found.
    Validate,
}

fn main() -> Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env().with_views_dir(args.views_dir);
    init_tracing(&config);
    debug!(views_dir = %config.views_dir.display(), "configuration loaded");

    let dir = config.views_dir.as_path();
    match args.command {
        Command::List => cli::cmd_list(dir)?,
        Command::Summary { view } => cli::cmd_summary(dir, &view)?,
        Command::AdminForm { view, filter } => cli::cmd_admin_form(dir, &view, &filter)?,
        Command::Configure {
            view,
            filter,
            values,
        } => cli::cmd_configure(dir, &view, &filter, &values)?,
        Command::Add {
            view,
            filter,
            handler,
            position,
        } => cli::cmd_add(dir, &view, &filter, &handler, position)?,
        Command::Evaluate { view, input } => cli::cmd_evaluate(dir, &view, &input)?,
        Command::Validate => {
            if cli::cmd_validate(dir)? > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
