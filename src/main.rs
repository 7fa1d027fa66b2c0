//! StoRM Info Provider
//!
//! Command line front end. LDIF goes to stdout, logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storm_info_provider::{
    Configuration, ConfigurationSource, GlueVersion, InfoProvider, ProviderOptions,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// StoRM Info Provider - GLUE 1.3 / GLUE 2 information for the BDII
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (flat YAML mapping)
    #[arg(
        short = 'f',
        long = "config",
        env = "STORM_INFO_PROVIDER_CONFIG",
        default_value = "/etc/storm/info-provider/storm-yaim-variables.yaml",
        global = true
    )]
    config: PathBuf,

    /// Directory of the static LDIF files
    #[arg(long, env = "STORM_LDIF_DIR", default_value = "/var/lib/bdii/gip/ldif", global = true)]
    ldif_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the static LDIF files and the JSON report
    Configure {
        #[arg(short, long, value_enum, default_value_t = GlueVersion::All)]
        glue: GlueVersion,

        /// JSON report destination
        #[arg(short, long, default_value = "/etc/storm/info-provider/site-report.json")]
        report: PathBuf,
    },

    /// Print the full LDIF records
    GetStaticLdif {
        #[arg(short, long, value_enum, default_value_t = GlueVersion::All)]
        glue: GlueVersion,
    },

    /// Print the incremental LDIF records
    GetUpdateLdif {
        #[arg(short, long, value_enum, default_value_t = GlueVersion::All)]
        glue: GlueVersion,
    },

    /// Write the JSON report
    GetReportJson {
        /// JSON report destination
        #[arg(short, long, default_value = "/etc/storm/info-provider/site-report.json")]
        report: PathBuf,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("StoRM Info Provider {}", storm_info_provider::VERSION);

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let configuration = Configuration::load(ConfigurationSource::FromFile(args.config.clone()))
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    let options = ProviderOptions {
        ldif_dir: args.ldif_dir.clone(),
        ..Default::default()
    };
    let provider = InfoProvider::with_storm_gateway(configuration, options)
        .context("Failed to create backend gateway")?;

    match args.command {
        Command::Configure { glue, report } => {
            provider
                .configure(glue, &report)
                .await
                .with_context(|| format!("Failed to configure {}", glue))?;
        }
        Command::GetStaticLdif { glue } => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            provider
                .static_ldif(glue, &mut out)
                .await
                .context("Failed to produce static LDIF")?;
        }
        Command::GetUpdateLdif { glue } => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            provider
                .update_ldif(glue, &mut out)
                .await
                .context("Failed to produce update LDIF")?;
        }
        Command::GetReportJson { report } => {
            provider
                .report_json(&report)
                .await
                .with_context(|| format!("Failed to write report {}", report.display()))?;
        }
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
