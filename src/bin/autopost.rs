use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use autopost::{AutopostError, EngineConfig, RenderRequest, Studio};

#[derive(Parser, Debug)]
#[command(name = "autopost", version)]
struct Cli {
    /// Engine configuration JSON; defaults plus `AUTOPOST_*` variables when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a preview from a request JSON file (`-` reads stdin).
    Render {
        /// Request JSON.
        #[arg(long = "in")]
        in_path: PathBuf,
    },
    /// Commit a preview, charging the account.
    Commit {
        /// Account to charge.
        #[arg(long)]
        account: String,
        /// Preview id or preview URL.
        preview: String,
    },
    /// Delete a preview (no-op for unknown ids).
    Delete {
        /// Preview id or preview URL.
        preview: String,
    },
    /// Render a new preview from a stored render context.
    Regenerate {
        /// Preview id or preview URL.
        preview: String,
    },
    /// Show or top up an account balance.
    Credits {
        /// Account key.
        account: String,
        /// Credits to add.
        #[arg(long)]
        top_up: Option<u64>,
    },
    /// Create (or reuse) a short link.
    Shorten {
        /// Absolute http(s) URL.
        url: String,
    },
    /// Follow a short link: record a click and print the target.
    Go {
        /// Short code.
        code: String,
        /// Client user agent to log.
        #[arg(long)]
        user_agent: Option<String>,
        /// Referrer to log.
        #[arg(long)]
        referrer: Option<String>,
    },
    /// List committed posts, newest first.
    Committed {
        /// Page size.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Records to skip.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autopost=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            let api = e.to_api_error();
            match serde_json::to_string_pretty(&api) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{api}"),
            }
            ExitCode::from(exit_code(api.status))
        }
    }
}

fn run(cli: Cli) -> Result<String, AutopostError> {
    let cfg = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::from_env(),
    };
    let studio = Studio::from_config(cfg)?;

    let value = match cli.cmd {
        Command::Render { in_path } => to_json(&studio.render(&read_request(&in_path)?)?)?,
        Command::Commit { account, preview } => to_json(&studio.commit(&account, &preview)?)?,
        Command::Delete { preview } => to_json(&studio.delete(&preview)?)?,
        Command::Regenerate { preview } => to_json(&studio.regenerate(&preview)?)?,
        Command::Credits { account, top_up } => {
            let balance = match top_up {
                Some(amount) => studio.top_up(&account, amount)?,
                None => studio.credits(&account)?,
            };
            serde_json::json!({ "account": account, "credits": balance })
        }
        Command::Shorten { url } => {
            let links = studio.shortlinks();
            let link = links.shorten(&url)?;
            serde_json::json!({
                "code": link.code,
                "target": link.target,
                "short_url": links.short_url(&link.code),
            })
        }
        Command::Go {
            code,
            user_agent,
            referrer,
        } => {
            let target = studio.shortlinks().record_click(
                &code,
                user_agent.as_deref(),
                referrer.as_deref(),
            )?;
            serde_json::json!({ "code": code, "target": target })
        }
        Command::Committed { limit, offset } => to_json(&studio.list_committed(limit, offset)?)?,
    };
    serde_json::to_string_pretty(&value).map_err(|e| AutopostError::serde(e.to_string()))
}

fn read_request(path: &Path) -> Result<RenderRequest, AutopostError> {
    let bytes = if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buf).context("read stdin")?;
        buf
    } else {
        std::fs::read(path).with_context(|| format!("read request '{}'", path.display()))?
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        AutopostError::validation("bad_request", format!("request is not valid JSON: {e}"))
    })
}

fn to_json<T: serde::Serialize>(v: &T) -> Result<serde_json::Value, AutopostError> {
    serde_json::to_value(v).map_err(|e| AutopostError::serde(e.to_string()))
}

fn exit_code(status: u16) -> u8 {
    match status {
        402 => 3,
        404 => 4,
        400..=499 => 2,
        _ => 1,
    }
}
