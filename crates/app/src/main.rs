use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use lesson_core::model::ChildId;
use lesson_core::speech::SpeechBackend;
use services::{AppServices, Clock, FamilyContext};
use storage::rest::RestConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ui::{App, UiApp, WebSpeech, build_app_context};

const DEFAULT_DB_URL: &str = "sqlite://triplearn.sqlite3";
const LOCAL_EMAIL: &str = "parent@triplearn.local";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    MissingRemoteConfig,
    MissingCredentials,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingRemoteConfig => {
                write!(f, "--remote needs SUPABASE_URL and SUPABASE_ANON_KEY")
            }
            ArgsError::MissingCredentials => {
                write!(f, "--remote needs --email (or TRIPLEARN_EMAIL) and TRIPLEARN_PASSWORD")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    services: AppServices,
    family: FamilyContext,
    initial_child: Option<ChildId>,
}

impl UiApp for DesktopApp {
    fn services(&self) -> AppServices {
        self.services.clone()
    }

    fn family(&self) -> FamilyContext {
        self.family.clone()
    }

    fn initial_child(&self) -> Option<ChildId> {
        self.initial_child.clone()
    }

    fn speech_backend(&self) -> Arc<dyn SpeechBackend> {
        Arc::new(WebSpeech)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    remote: bool,
    verbose: bool,
    child_id: Option<ChildId>,
    email: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--remote] [--child <id>] [--email <addr>] [--verbose]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRIPLEARN_DB_URL, TRIPLEARN_CHILD_ID, TRIPLEARN_EMAIL, TRIPLEARN_PASSWORD");
    eprintln!("  SUPABASE_URL, SUPABASE_ANON_KEY (with --remote)");
    eprintln!("  RUST_LOG overrides --verbose");
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: env("TRIPLEARN_DB_URL")
                .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url),
            remote: false,
            verbose: false,
            child_id: env("TRIPLEARN_CHILD_ID")
                .filter(|value| !value.trim().is_empty())
                .map(ChildId::new),
            email: env("TRIPLEARN_EMAIL").filter(|value| !value.trim().is_empty()),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--child" => parsed.child_id = Some(ChildId::new(require_value(args, "--child")?)),
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--remote" => parsed.remote = true,
                "--verbose" | "-v" => parsed.verbose = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// `RUST_LOG` wins, then `--verbose`, then `info`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn bootstrap(args: &Args) -> Result<DesktopApp, Box<dyn std::error::Error>> {
    let clock = Clock::default_clock();
    prepare_sqlite_file(&args.db_url)?;

    let (services, email, password) = if args.remote {
        let url = std::env::var("SUPABASE_URL").map_err(|_| ArgsError::MissingRemoteConfig)?;
        let key = std::env::var("SUPABASE_ANON_KEY").map_err(|_| ArgsError::MissingRemoteConfig)?;
        let email = args.email.clone().ok_or(ArgsError::MissingCredentials)?;
        let password = std::env::var("TRIPLEARN_PASSWORD").map_err(|_| ArgsError::MissingCredentials)?;
        let services = AppServices::new_remote(RestConfig::new(&url, key)?, &args.db_url, clock).await?;
        (services, email, password)
    } else {
        let services = AppServices::new_sqlite(&args.db_url, clock).await?;
        let email = args.email.clone().unwrap_or_else(|| LOCAL_EMAIL.to_string());
        (services, email, String::new())
    };

    let family = services.sign_in(&email, &password).await?;
    info!(family_id = %family.family_id, remote = args.remote, "signed in");

    Ok(DesktopApp {
        services,
        family,
        initial_child: args.child_id.clone(),
    })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let args = Args::parse(&mut argv.into_iter(), |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing(args.verbose);

    let app: Arc<dyn UiApp> = Arc::new(bootstrap(&args).await?);
    let context = build_app_context(&app);

    // On macOS, Dioxus/tao can default to an always-on-top window in some dev setups.
    let desktop_cfg = DesktopConfig::new().with_window(
        WindowBuilder::new()
            .with_title("TripLearn")
            .with_always_on_top(false),
    );

    LaunchBuilder::desktop()
        .with_cfg(desktop_cfg)
        .with_context(context)
        .launch(App);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
