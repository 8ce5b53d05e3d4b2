//! geminichat main binary.

mod commands;
mod config;
mod init;

use clap::{Parser, Subcommand};
use config::AppConfig;
use gc_llm::CostEstimator;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(name = "geminichat", version, about = "Send a message to Gemini and inspect the reply")]
struct Cli {
    /// Config file (default: ~/.geminichat/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// API key; overrides GEMINI_API_KEY and the config file.
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Model identifier.
    #[arg(long, global = true)]
    model: Option<String>,
    /// JSON array of tool definitions.
    #[arg(long, global = true)]
    tools: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send one message and print the normalized result.
    Send { message: String },
    /// Measure latency, throughput and estimated cost over a few messages.
    Bench {
        /// Pause between calls.
        #[arg(long, default_value_t = 5000)]
        delay_ms: u64,
        messages: Vec<String>,
    },
    /// Write ~/.geminichat/config.toml from the template (idempotent).
    Init,
    /// Validate config and report what would be used (default).
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    install_panic_hook();
    config::load_dotenv();

    let cli = Cli::parse();
    let overrides = Overrides {
        config: cli.config,
        api_key: cli.api_key,
        model: cli.model,
        tools: cli.tools,
    };

    match cli.command.unwrap_or(Command::Doctor) {
        Command::Init => {
            let report = init::initialize_default().await?;
            if report.created {
                println!("geminichat init: created {}", report.path.display());
            } else {
                println!(
                    "geminichat init: already initialized at {}",
                    report.path.display()
                );
            }
            Ok(())
        }
        Command::Send { message } => {
            let (cfg, _) = overrides.load().await?;
            let client = cfg.build_client(overrides.api_key.as_deref()).await?;
            commands::send(&client, &message).await
        }
        Command::Bench { delay_ms, messages } => {
            let messages = if messages.is_empty() {
                commands::DEFAULT_BENCH_MESSAGES
                    .iter()
                    .map(|m| m.to_string())
                    .collect()
            } else {
                messages
            };
            let (cfg, _) = overrides.load().await?;
            let client = cfg.build_client(overrides.api_key.as_deref()).await?;
            let report = commands::run_bench(
                &client,
                &messages,
                Duration::from_millis(delay_ms),
                &CostEstimator::default(),
            )
            .await;
            commands::print_bench(&report);
            Ok(())
        }
        Command::Doctor => {
            let (cfg, path) = overrides.load().await?;
            let tools = cfg.load_tools().await?;
            commands::doctor(&cfg, &path, tools.len());
            Ok(())
        }
    }
}

/// Global CLI flags layered over the loaded configuration.
#[derive(Debug, Default)]
struct Overrides {
    config: Option<PathBuf>,
    api_key: Option<String>,
    model: Option<String>,
    tools: Option<PathBuf>,
}

impl Overrides {
    async fn load(&self) -> anyhow::Result<(AppConfig, PathBuf)> {
        let (mut cfg, path) = AppConfig::load(self.config.clone()).await?;
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok((cfg, path))
    }

    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(model) = self.model.as_ref() {
            cfg.gemini.model = model.clone();
        }
        if let Some(tools) = self.tools.as_ref() {
            cfg.gemini.tools_file = Some(tools.clone());
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("info,geminichat=debug,gc_app=debug,gc_llm=debug"),
    };
    let log_format = std::env::var("GEMINICHAT_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported GEMINICHAT_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_send_with_global_flags() {
        let cli = Cli::try_parse_from([
            "geminichat",
            "--model",
            "gemini-1.5-flash",
            "send",
            "What is the capital of Australia?",
        ])
        .expect("cli parses");
        assert_eq!(cli.model.as_deref(), Some("gemini-1.5-flash"));
        match cli.command {
            Some(Command::Send { message }) => {
                assert_eq!(message, "What is the capital of Australia?")
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn bench_defaults_delay() {
        let cli = Cli::try_parse_from(["geminichat", "bench"]).expect("cli parses");
        match cli.command {
            Some(Command::Bench { delay_ms, messages }) => {
                assert_eq!(delay_ms, 5000);
                assert!(messages.is_empty());
            }
            other => panic!("expected bench, got {other:?}"),
        }
    }

    #[test]
    fn flags_override_loaded_config() {
        let mut cfg = AppConfig::default();
        let overrides = Overrides {
            model: Some("gemini-1.5-flash".to_string()),
            tools: Some(PathBuf::from("/tmp/tools.json")),
            ..Default::default()
        };
        overrides.apply(&mut cfg);
        assert_eq!(cfg.gemini.model, "gemini-1.5-flash");
        assert_eq!(cfg.gemini.tools_file, Some(PathBuf::from("/tmp/tools.json")));

        let mut cfg = AppConfig::default();
        Overrides::default().apply(&mut cfg);
        assert_eq!(cfg.gemini.model, gc_llm::DEFAULT_MODEL);
        assert!(cfg.gemini.tools_file.is_none());
    }

    #[test]
    fn init_parses_as_its_own_command() {
        let cli = Cli::try_parse_from(["geminichat", "init"]).expect("cli parses");
        assert!(matches!(cli.command, Some(Command::Init)));
    }

    #[test]
    fn panic_payloads_render() {
        let s: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_payload_to_string(s.as_ref()), "boom");
        let s: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_payload_to_string(s.as_ref()), "bang");
        let s: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_payload_to_string(s.as_ref()), "non-string panic payload");
    }
}
