//! CLI / CGI entry point for `mailrelay`.
//!
//! Invoked by the web server with no arguments, it reads the request from
//! stdin and always answers with a CGI JSON reply on stdout. Diagnostics go
//! to stderr and the log file, never to stdout.

use std::io::{Read, Write};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};

use mailrelay::cgi::{self, Response};
use mailrelay::config::{self, Config};
use mailrelay::error::RelayError;
use mailrelay::relay::stamp::server_identity;
use mailrelay::session::{InputFormat, Session};

#[derive(Parser)]
#[command(name = "mailrelay", version)]
#[command(about = "Relay a JSON or raw RFC 2822 email from stdin through SMTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print the message to stdout instead of sending it
    #[arg(long, global = true)]
    debug: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true, value_name = "FILE", env = "MAILRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a message from a JSON request on stdin and send it
    Send,
    /// Send a raw RFC 2822 message from stdin
    SendRaw,
    /// Write the default configuration file
    InitConfig,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = config::load_config(cli.config.as_deref());

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    if let Some(e) = config_error {
        tracing::warn!(error = %format!("{e:#}"), "Failed to load config, using defaults");
    }

    match cli.command {
        Some(Commands::Send) => cmd_relay(&config, InputFormat::Json, cli.debug),
        Some(Commands::SendRaw) => cmd_relay(&config, InputFormat::Raw, cli.debug),
        Some(Commands::InitConfig) => cmd_init_config(&config, cli.config.as_deref()),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => cmd_relay(&config, format_from_program_name(), cli.debug),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailrelay.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Installed as `sendmail_raw` (or any name containing "raw"), the relay
/// expects a raw message without needing a subcommand.
fn format_from_program_name() -> InputFormat {
    if cgi::command_name().contains("raw") {
        InputFormat::Raw
    } else {
        InputFormat::Json
    }
}

/// Handle one request and always finish with a CGI reply.
fn cmd_relay(config: &Config, format: InputFormat, debug: bool) -> anyhow::Result<()> {
    let command = cgi::command_name();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        relay_stdin(config, format, debug, &mut out)
    }));

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some("Internal error".to_string()),
    };

    match failure {
        None => {
            tracing::info!(command = %command, "Request succeeded");
            Response::success(&command, "").write_to(&mut out)?;
        }
        Some(message) => {
            tracing::error!(command = %command, error = %message, "Request failed");
            Response::error(&command, &message).write_to(&mut out)?;
        }
    }

    Ok(())
}

fn relay_stdin(
    config: &Config,
    format: InputFormat,
    debug: bool,
    out: &mut dyn Write,
) -> mailrelay::error::Result<()> {
    let login = cgi::login(&config.cgi.login_var)?;

    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .map_err(|e| RelayError::io("reading stdin", e))?;
    tracing::debug!(bytes = input.len(), ?format, "Read request");

    let session = Session::new(config, login, server_identity(), debug);
    session.handle(format, &input, out)
}

/// Write the current (default or loaded) configuration file.
fn cmd_init_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => {
            config::save_config_to(config, path)?;
            path.to_path_buf()
        }
        None => config::save_config(config)?,
    };
    println!("  Wrote {}", path.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailrelay", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}
