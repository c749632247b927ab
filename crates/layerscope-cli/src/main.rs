//! CLI for layerscope — diagnose Z-banding from printer telemetry.

mod commands;
mod discovery;
mod report;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "layerscope")]
#[command(about = "layerscope — diagnose Z-banding and layer inconsistencies from Klipper telemetry")]
#[command(version = layerscope_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the device log and flow telemetry from the latest print
    Analyze {
        /// Path to klippy.log (default: search conventional locations)
        #[arg(long)]
        klippy: Option<String>,

        /// Path to a flow telemetry CSV (default: most recent in the log directory)
        #[arg(long)]
        csv: Option<String>,

        /// Analyze every discoverable telemetry CSV, not just the most recent
        #[arg(long)]
        all: bool,

        /// Number of status lines from the log tail to analyze
        #[arg(long, default_value = "1000")]
        samples: usize,

        /// Write the full structured analysis as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Run the print-complete trigger service (webhook or poll mode)
    Hook {
        /// webhook = listen for Moonraker notifications, poll = query print state
        #[arg(long, default_value = "poll", value_parser = ["webhook", "poll"])]
        mode: String,

        /// Port for the webhook listener
        #[arg(long, default_value = "7126")]
        port: u16,

        /// Moonraker base URL (poll mode)
        #[arg(long, default_value = "http://localhost:7125")]
        moonraker_url: String,

        /// Seconds to wait after print completion before analyzing
        #[arg(long, default_value = "2")]
        settle_secs: u64,

        /// Status-line sample count passed through to the analyzer
        #[arg(long, default_value = "1000")]
        samples: usize,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            klippy,
            csv,
            all,
            samples,
            output,
        } => commands::analyze::run(commands::analyze::AnalyzeCommandConfig {
            klippy: klippy.as_deref(),
            csv: csv.as_deref(),
            all,
            samples,
            output_path: output.as_deref(),
        }),
        Commands::Hook {
            mode,
            port,
            moonraker_url,
            settle_secs,
            samples,
        } => commands::hook::run(&mode, port, &moonraker_url, settle_secs, samples),
    }
}
