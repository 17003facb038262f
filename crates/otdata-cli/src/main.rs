use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use otdata_client::{Credentials, Deployment, Middleware, Mode};
use otdata_core::{DataTable, Error};

#[derive(Parser)]
#[command(name = "otdata", version, about = "Query data out of oTree deployments")]
struct Cli {
    #[command(flatten)]
    target: Target,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Deployment directory, or base URL of a running server
    location: String,
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,
    #[arg(long, env = "OTDATA_USERNAME")]
    username: Option<String>,
    #[arg(long, env = "OTDATA_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    #[value(name = "auto")]
    Auto,
    #[value(name = "local")]
    Local,
    #[value(name = "remote")]
    Remote,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Auto => Mode::Auto,
            ModeArg::Local => Mode::Local,
            ModeArg::Remote => Mode::Remote,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the deployment's installed apps
    Apps {
        #[arg(long)]
        json: bool,
    },
    /// List the configured session names
    Sessions {
        #[arg(long)]
        json: bool,
    },
    /// Show one session config with defaults applied
    SessionConfig {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Export all data in wide format
    AllData {
        #[arg(long)]
        json: bool,
    },
    /// Export per-page timing data
    TimeSpent {
        #[arg(long)]
        json: bool,
    },
    /// Export one app's data
    AppData {
        app: String,
        #[arg(long)]
        json: bool,
    },
    /// Print one app's documentation
    AppDoc {
        app: String,
        #[arg(long)]
        json: bool,
    },
    /// Run a session with bots and export the generated data
    BotData {
        session: String,
        #[arg(long)]
        participants: Option<u64>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = command_json_mode(&cli.command);
    let result = run_command(&cli.target, cli.command);
    match result {
        Ok(Some(payload)) => {
            emit_json(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            if json_mode {
                emit_json(&json_error(error_code(&err), err.to_string(), json!({})));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn open_deployment(target: &Target) -> Result<Deployment> {
    let credentials = match (&target.username, &target.password) {
        (Some(username), Some(password)) => Some(Credentials {
            username: username.clone(),
            password: password.clone(),
        }),
        (None, None) => None,
        _ => {
            return Err(anyhow::anyhow!(
                "credentials require both --username and --password"
            ))
        }
    };
    let deployment = Deployment::open(&target.location, target.mode.into(), credentials.as_ref())?;
    Ok(deployment)
}

fn run_command(target: &Target, command: Commands) -> Result<Option<Value>> {
    let deployment = open_deployment(target)?;
    match command {
        Commands::Apps { json } => {
            let apps = deployment.apps()?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "apps",
                    "apps": apps,
                })));
            }
            match apps {
                Some(apps) => {
                    for app in apps {
                        println!("{}", app);
                    }
                }
                None => println!("(unknown: no apps discovered)"),
            }
        }
        Commands::Sessions { json } => {
            let sessions = deployment.session_names()?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "sessions",
                    "sessions": sessions,
                })));
            }
            for name in sessions {
                println!("{}", name);
            }
        }
        Commands::SessionConfig { name, json } => {
            let config = deployment.session_config(&name)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "session-config",
                    "session": name,
                    "config": config,
                })));
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::AllData { json } => {
            let table = deployment.all_data()?;
            if json {
                return Ok(Some(table_payload("all-data", &table)?));
            }
            print!("{}", table.to_csv_string()?);
        }
        Commands::TimeSpent { json } => {
            let table = deployment.time_spent()?;
            if json {
                return Ok(Some(table_payload("time-spent", &table)?));
            }
            print!("{}", table.to_csv_string()?);
        }
        Commands::AppData { app, json } => {
            let table = deployment.app_data(&app)?;
            if json {
                return Ok(Some(table_payload("app-data", &table)?));
            }
            print!("{}", table.to_csv_string()?);
        }
        Commands::AppDoc { app, json } => {
            let doc = deployment.app_doc(&app)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "app-doc",
                    "app": app,
                    "doc": doc,
                })));
            }
            println!("{}", doc);
        }
        Commands::BotData {
            session,
            participants,
            json,
        } => {
            let store = deployment.bot_data(&session, participants)?;
            if json {
                let mut tables = serde_json::Map::new();
                for key in store.keys() {
                    tables.insert(key.to_string(), serde_json::to_value(store.get(key)?)?);
                }
                return Ok(Some(json!({
                    "ok": true,
                    "command": "bot-data",
                    "session": session,
                    "apps": tables,
                })));
            }
            for key in store.keys() {
                println!("# {}", key);
                print!("{}", store.get(key)?.to_csv_string()?);
            }
        }
    }
    Ok(None)
}

fn table_payload(command: &str, table: &DataTable) -> Result<Value> {
    Ok(json!({
        "ok": true,
        "command": command,
        "table": serde_json::to_value(table)?,
    }))
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn error_code(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<Error>() {
        Some(Error::InvalidApp(_)) => "invalid_app",
        Some(Error::InvalidSession(_)) => "invalid_session",
        Some(Error::NotLoggedIn { .. }) => "not_logged_in",
        Some(Error::NotSupported { .. }) => "not_supported",
        Some(Error::Bridge { .. }) => "bridge_failure",
        Some(Error::Transport { .. }) => "transport_failure",
        _ => "command_failed",
    }
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::Apps { json }
        | Commands::Sessions { json }
        | Commands::SessionConfig { json, .. }
        | Commands::AllData { json }
        | Commands::TimeSpent { json }
        | Commands::AppData { json, .. }
        | Commands::AppDoc { json, .. }
        | Commands::BotData { json, .. } => *json,
    }
}
