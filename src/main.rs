use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use code_playground::{
    cli,
    config::Config,
    execution::{Dispatcher, ExecutionRequest, Language, Outcome},
    printer::{JsonPrinter, TextPrinter},
    state::StateStore,
    theme, tui, utils,
};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Load config
    let cfg = Config::load();

    // Piped source without a file runs headless
    let run_path = match (&args.run, &args.file) {
        (Some(path), _) => Some(path.clone()),
        (None, None) if !io::stdin().is_terminal() && !is_maintenance(&args) => Some("-".to_string()),
        _ => None,
    };
    init_logging(&cfg, run_path.is_none() && !is_maintenance(&args));

    // Maintenance shortcuts
    if args.list_languages {
        for language in Language::ALL {
            println!("{:<12}{} (.{})", language.id(), language, language.ext());
        }
        return Ok(());
    }
    if args.list_themes {
        for t in theme::THEMES.iter() {
            let marker = if t.id == theme::DEFAULT_THEME { " (default)" } else { "" };
            println!("{:<12}{}{}", t.id, t.name, marker);
        }
        return Ok(());
    }
    if args.show_state {
        let store = StateStore::from_config(&cfg);
        println!("{}", store.path().display());
        println!("{}", serde_json::to_string_pretty(&store.load())?);
        return Ok(());
    }
    if args.reset_state {
        let mut store = StateStore::from_config(&cfg);
        store.reset()?;
        println!("Removed {}", store.path().display());
        return Ok(());
    }

    args.check_headless_flags(run_path.is_some())?;

    if let Some(theme_id) = args.theme.as_deref() {
        if theme::find(theme_id).is_none() {
            return Err(anyhow!("unknown theme: {}", theme_id));
        }
    }

    match run_path {
        Some(path) => run_once(&cfg, &args, &path).await,
        None => tui::run_tui(&cfg, args.file.as_deref(), args.theme.as_deref()).await,
    }
}

fn is_maintenance(args: &cli::Cli) -> bool {
    args.list_languages || args.list_themes || args.show_state || args.reset_state
}

/// The editor owns the terminal, so its logs go to a file; headless runs log to stderr.
fn init_logging(cfg: &Config, to_file: bool) {
    let filter = EnvFilter::try_from_env("PLAYGROUND_LOG")
        .unwrap_or_else(|_| EnvFilter::new("code_playground=info,warn"));

    if to_file {
        let path = cfg.log_path();
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            return;
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run_once(cfg: &Config, args: &cli::Cli, path: &str) -> Result<()> {
    let source = utils::read_source(path)?;
    let language = match args.lang.as_deref() {
        Some(lang) => lang.parse::<Language>().map_err(|e| anyhow!(e))?,
        None => utils::language_for_path(path)
            .or_else(|| StateStore::from_config(cfg).load().language())
            .or_else(|| cfg.get("DEFAULT_LANGUAGE").and_then(|l| l.parse().ok()))
            .unwrap_or(Language::JavaScript),
    };

    let dispatcher = Dispatcher::from_config(cfg);
    let outcome = dispatcher.execute(&ExecutionRequest::new(source, language)).await;

    let preview_path = match &outcome {
        Outcome::Render(directive) => Some(directive.write_preview(&cfg.preview_path())?),
        Outcome::Completed(_) => None,
    };

    if args.json {
        JsonPrinter.print(&outcome);
    } else {
        let color = !args.no_color && io::stdout().is_terminal();
        TextPrinter { color }.print(language, &outcome, preview_path.as_deref());
    }

    if !outcome.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
