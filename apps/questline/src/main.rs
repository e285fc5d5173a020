//! # Questline
//!
//! The command-line binary for the Questline progression engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              apps/questline (THE BINARY)             │
//! │                                                      │
//! │  ┌─────────────┐   ┌──────────────┐   ┌───────────┐  │
//! │  │    CLI      │   │    Config    │   │  Storage  │  │
//! │  │   (clap)    │   │    (toml)    │   │ redb/file │  │
//! │  └──────┬──────┘   └──────┬───────┘   └─────┬─────┘  │
//! │         └─────────────────┼─────────────────┘        │
//! │                           ▼                          │
//! │                 ┌──────────────────┐                 │
//! │                 │  questline-core  │                 │
//! │                 │   (THE RULES)    │                 │
//! │                 └──────────────────┘                 │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! questline init
//! questline login
//! questline lesson --score 95 --lesson intro-1
//! questline quiz --score 80
//! questline badges --all
//! questline --json-mode stats
//! ```

use clap::Parser;
use questline::cli::{self, Cli, Context};
use questline::config::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();
    let config = cli::resolve_config(&cli);

    // QUESTLINE_LOG_FORMAT wins over [logging] format.
    let json_logs = match std::env::var("QUESTLINE_LOG_FORMAT") {
        Ok(format) => format == "json",
        Err(_) => matches!(
            config.as_ref().map(|c| c.logging.format),
            Ok(LogFormat::Json)
        ),
    };
    init_tracing(json_logs);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    let ctx = Context::new(config, cli.json_mode);
    if let Err(e) = cli::execute(&ctx, cli.command) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the tracing subscriber on stderr, leaving stdout to command output.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "questline=info,questline_core=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Print the Questline startup banner.
fn print_banner() {
    println!(
        r#"
  Questline v{}
  Learn daily. Level up.
"#,
        env!("CARGO_PKG_VERSION")
    );
}
