use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use scour::store::{shared, ResultStore};
use scour::{config, App, Engine, Filters, MatchMode, Matcher, Outcome};

/// Interactive recursive pattern search: results stream into a scrollable
/// list while the scan runs; matches open in your editor at the exact line
/// and `/` refines the current results with a subsearch.
#[derive(Parser)]
#[command(name = "scour", version, about)]
struct Cli {
    /// Pattern to search for
    pattern: String,

    /// Directory (or single file) to search in
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Ignore case distinctions in the pattern
    #[arg(short = 'i')]
    insensitive: bool,

    /// Raw mode: scan every regular file
    #[arg(short = 'r')]
    raw: bool,

    /// Add an extension to the allow-list (repeatable)
    #[arg(short = 't', value_name = "EXT")]
    extensions: Vec<String>,

    /// Look for this extension only, replacing the configured lists
    #[arg(short = 'o', value_name = "EXT")]
    only_extension: Option<String>,

    /// Treat the pattern as a regular expression
    #[arg(short = 'e')]
    regex: bool,

    /// Exclude a directory from the search (repeatable)
    #[arg(short = 'x', value_name = "DIR")]
    exclude: Vec<String>,

    /// Follow symlinks (default doesn't)
    #[arg(short = 'f')]
    follow_symlinks: bool,
}

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = std::env::temp_dir().join("scour").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "scour.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scour=warn"));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
    );
    if subscriber.try_init().is_err() {
        return None;
    }

    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "panic");
    }));

    Some(guard)
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let editor = config::editor_basename();
    let ngprc = config::load(&editor)?;

    let (mut extensions, mut specifics) = (ngprc.extensions, ngprc.specifics);
    if let Some(only) = cli.only_extension {
        extensions = vec![only];
        specifics = Vec::new();
    }
    extensions.extend(cli.extensions);

    let filters = Filters {
        extensions,
        specifics,
        excluded_dirs: config::resolve_excluded_dirs(&cli.exclude),
        raw: cli.raw,
        follow_symlinks: cli.follow_symlinks,
    };

    let mode = if cli.regex {
        MatchMode::Regex
    } else if cli.insensitive {
        MatchMode::Insensitive
    } else {
        MatchMode::Literal
    };
    let matcher = Matcher::new(&cli.pattern, mode)?;

    tracing::info!(
        pattern = %cli.pattern,
        root = %cli.path.display(),
        ?mode,
        "starting search"
    );

    let store = shared(ResultStore::new());
    let engine = Engine::start(cli.path, matcher, Arc::new(filters), store);

    let app = App::new(
        engine,
        cli.pattern,
        cli.regex,
        cli.insensitive,
        ngprc.editor_template,
    );
    app.run().context("terminal session failed")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_tracing();

    match run(cli) {
        Ok(Outcome::Quit) => ExitCode::SUCCESS,
        Ok(Outcome::Interrupted) => ExitCode::from(130),
        Err(err) => {
            eprintln!("scour: {err:#}");
            ExitCode::FAILURE
        }
    }
}
