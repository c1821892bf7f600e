use anyhow::{Context, Result};
use chatscout_core::render::format_html;
use chatscout_core::shell::{register_commands, Shell, ShellAction, ShellEvent};
use chatscout_core::{Analyzer, RunOutcome, Session, Settings};
use chatscout_local::store::{default_config_dir, SettingsStore, TEMPLATES_FILE};
use chatscout_local::{http_client, openai_compat::OpenAiCompatClient, search, templates};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

mod host;

use host::{ProgressSurface, StderrNotifier, StdoutSurface, TerminalCommands, Transcript};

#[derive(Parser, Debug)]
#[command(name = "chatscout")]
#[command(about = "Research the recent chat against web sources and render analysis cards", long_about = None)]
struct Cli {
    /// Directory holding settings.json (and templates.json by default).
    #[arg(long, global = true, env = "CHATSCOUT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline once and print the rendered cards.
    Run(RunCmd),
    /// Line-oriented host: /scout, /run, /close, /quit on stdin.
    Shell(ShellCmd),
    /// Format stdin the way model output is formatted into cards.
    Render,
    /// List the loaded prompt templates (json).
    Templates(TemplatesArg),
    /// Show or change persisted settings.
    #[command(subcommand)]
    Config(ConfigCmd),
    /// Report configuration problems (json; no secrets).
    Doctor(TemplatesArg),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct TemplatesArg {
    /// Template file path or http(s) URL (default: <config-dir>/templates.json).
    #[arg(long, env = "CHATSCOUT_TEMPLATES")]
    templates: Option<String>,
}

#[derive(clap::Args, Debug)]
struct RunCmd {
    /// Chat transcript: a JSON array of {name, message}, oldest first.
    #[arg(long)]
    chat: PathBuf,
    #[command(flatten)]
    templates: TemplatesArg,
    /// Output format: html|json
    #[arg(long = "output", alias = "format", default_value = "html")]
    output: String,
    /// Write the output here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Echo intermediate display updates to stderr.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    progress: bool,
}

#[derive(clap::Args, Debug)]
struct ShellCmd {
    #[arg(long)]
    chat: PathBuf,
    #[command(flatten)]
    templates: TemplatesArg,
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    /// Print effective settings (credentials redacted).
    Show,
    /// Persist one setting.
    Set { key: String, value: String },
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opt-in env file (`CHATSCOUT_ENV_FILE`). Never overrides variables already set.
fn load_env_file() {
    let Ok(p) = std::env::var("CHATSCOUT_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim().trim_matches('"'));
        }
    }
}

struct App {
    store: SettingsStore,
    client: reqwest::Client,
}

impl App {
    fn new(config_dir: Option<PathBuf>) -> Result<Self> {
        let dir = config_dir.unwrap_or_else(default_config_dir);
        Ok(Self {
            store: SettingsStore::new(dir),
            client: http_client()?,
        })
    }

    fn templates_source(&self, arg: &TemplatesArg) -> String {
        arg.templates.clone().unwrap_or_else(|| {
            self.store
                .dir()
                .join(TEMPLATES_FILE)
                .to_string_lossy()
                .into_owned()
        })
    }

    async fn session(&self, arg: &TemplatesArg) -> Session {
        let settings = self.store.load();
        let templates = templates::load_templates(&self.client, &self.templates_source(arg)).await;
        Session::new(settings, templates)
    }

    fn analyzer(&self, session: Session) -> Result<Analyzer> {
        let llm = OpenAiCompatClient::from_settings(self.client.clone(), &session.settings);
        let search = search::provider_from_settings(self.client.clone(), &session.settings)?;
        Ok(Analyzer::new(
            Arc::new(session),
            Arc::new(llm),
            search,
            Arc::new(StderrNotifier),
        ))
    }
}

async fn cmd_run(app: &App, args: RunCmd) -> Result<()> {
    let history = Transcript::load(&args.chat)?;
    let analyzer = app.analyzer(app.session(&args.templates).await)?;
    let report = analyzer
        .run(&history, &ProgressSurface::new(args.progress))
        .await;
    if report.outcome == RunOutcome::QueryFailed {
        tracing::warn!("run stopped: no search query could be extracted");
    }

    let body = match args.output.to_ascii_lowercase().as_str() {
        "json" => serde_json::to_string_pretty(&report)?,
        _ => report.html(),
    };
    match args.out {
        Some(p) => std::fs::write(&p, body).with_context(|| format!("write {}", p.display()))?,
        None => println!("{body}"),
    }
    Ok(())
}

async fn cmd_shell(app: &App, args: ShellCmd) -> Result<()> {
    let history = Transcript::load(&args.chat)?;
    let analyzer = app.analyzer(app.session(&args.templates).await)?;
    let shell = Arc::new(Shell::new(
        analyzer,
        Arc::new(history),
        Arc::new(StdoutSurface),
    ));
    let mut commands = TerminalCommands::default();
    register_commands(&mut commands);
    eprint!("{}", commands.help());

    let mut runs = tokio::task::JoinSet::new();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let word = line.split_whitespace().next().unwrap_or("");
        let action = match word {
            "" => continue,
            "/quit" | "/exit" => break,
            "/run" => ShellAction::Run,
            "/close" => ShellAction::Close,
            w if commands.find(w).is_some() => ShellAction::Command,
            other => {
                eprintln!("unknown command {other:?}");
                eprint!("{}", commands.help());
                continue;
            }
        };
        // Runs go to the background so the prompt stays responsive.
        let shell = shell.clone();
        runs.spawn(async move {
            match shell.dispatch(action).await {
                ShellEvent::Closed => println!("panel: closed"),
                ShellEvent::Busy => println!("busy: a run is already in progress"),
                ShellEvent::Ran(r) => println!(
                    "done: {} card(s), outcome={}",
                    r.cards.len(),
                    r.outcome.as_str()
                ),
            }
        });
        // Reap anything already finished.
        while runs.try_join_next().is_some() {}
    }
    while runs.join_next().await.is_some() {}
    Ok(())
}

fn cmd_render() -> Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let text = input.strip_suffix('\n').unwrap_or(&input);
    println!("{}", format_html(Some(text)));
    Ok(())
}

fn cmd_config(app: &App, cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Show => {
            let v = serde_json::json!({
                "path": app.store.path().display().to_string(),
                "settings": app.store.load().redacted(),
            });
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        ConfigCmd::Set { key, value } => {
            let mut s = app.store.load_persisted();
            if !s.set(&key, &value) {
                anyhow::bail!(
                    "unknown setting {key:?} (allowed: {})",
                    Settings::KEYS.join(", ")
                );
            }
            app.store.save(&s)?;
            println!("{}", serde_json::to_string_pretty(&s.redacted())?);
        }
    }
    Ok(())
}

async fn cmd_doctor(app: &App, arg: TemplatesArg) -> Result<()> {
    let t0 = std::time::Instant::now();
    let settings = app.store.load();
    let source = app.templates_source(&arg);
    let loaded = templates::try_load_templates(&app.client, &source).await;
    let provider_ok = search::provider_from_settings(app.client.clone(), &settings).is_ok();

    let mut checks = vec![
        serde_json::json!({
            "name": "llm_api_key",
            "ok": settings.has_api_key(),
            "hint": if settings.has_api_key() { "" } else { "Set api_key (config set api_key ...) or CHATSCOUT_API_KEY." },
        }),
        serde_json::json!({
            "name": "search_api_key",
            "ok": settings.has_search_api_key(),
            "hint": if settings.has_search_api_key() { "" } else { "Set search_api_key or CHATSCOUT_SEARCH_API_KEY; runs continue without evidence." },
        }),
        serde_json::json!({
            "name": "search_provider",
            "ok": provider_ok,
            "hint": if provider_ok { "" } else { "search_provider must be \"serper\"." },
        }),
    ];
    checks.push(match &loaded {
        Ok(ts) => serde_json::json!({
            "name": "templates",
            "ok": true,
            "total": ts.len(),
            "panel": ts.iter().filter(|t| t.panel).count(),
        }),
        Err(e) => serde_json::json!({
            "name": "templates",
            "ok": false,
            "error": e.to_string(),
            "hint": "Runs will produce no cards until a template file loads.",
        }),
    });

    let v = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": checks.iter().all(|c| c["ok"].as_bool() == Some(true)),
        "name": "chatscout",
        "version": env!("CARGO_PKG_VERSION"),
        "settings_path": app.store.path().display().to_string(),
        "templates_source": source,
        "checks": checks,
        "elapsed_ms": t0.elapsed().as_millis() as u64,
    });
    println!("{}", serde_json::to_string_pretty(&v)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "chatscout",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("chatscout {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
        Commands::Render => cmd_render()?,
        Commands::Run(args) => cmd_run(&App::new(cli.config_dir)?, args).await?,
        Commands::Shell(args) => cmd_shell(&App::new(cli.config_dir)?, args).await?,
        Commands::Templates(arg) => {
            let app = App::new(cli.config_dir)?;
            let ts = templates::load_templates(&app.client, &app.templates_source(&arg)).await;
            println!("{}", serde_json::to_string_pretty(&ts)?);
        }
        Commands::Config(cmd) => cmd_config(&App::new(cli.config_dir)?, cmd)?,
        Commands::Doctor(arg) => cmd_doctor(&App::new(cli.config_dir)?, arg).await?,
    }
    Ok(())
}
