mod logging;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use docsis_lib::capture::{self, CapturedFrame};
use docsis_lib::{DissectorConfig, FrameRecord, Session};
use std::path::PathBuf;
use tracing::{debug, info};

/// Decodes DOCSIS MAC frames from hex strings or capture files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// JSON file with dissector options.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Do not verify header check sequences.
    #[arg(long, global = true)]
    no_hcs_check: bool,
    /// Decode encrypted payloads instead of showing them as ciphertext.
    #[arg(long, global = true)]
    dissect_encrypted: bool,
    /// Skip extended header elements with a bad length instead of stopping.
    #[arg(long, global = true)]
    keep_walking: bool,
    /// Print records as JSON.
    #[arg(long, global = true)]
    json: bool,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode frames given as hex strings, in order.
    Decode {
        #[arg(required = true)]
        frames: Vec<String>,
    },
    /// Decode every frame of a pcap or pcapng file.
    Read { path: PathBuf },
}

fn load_config(cli: &Cli) -> Result<DissectorConfig> {
    let mut config = match &cli.config {
        Some(path) => DissectorConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => DissectorConfig::default(),
    };
    if cli.no_hcs_check {
        config.validate_hcs = false;
    }
    if cli.dissect_encrypted {
        config.dissect_encrypted = true;
    }
    if cli.keep_walking {
        config.abort_view_on_element_error = false;
    }
    debug!(?config, "dissector configuration");
    Ok(config)
}

fn parse_hex_frames(inputs: &[String]) -> Result<Vec<CapturedFrame>> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let cleaned: String = input
                .chars()
                .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
                .collect();
            let cleaned = cleaned.trim_start_matches("0x");
            let data = hex::decode(cleaned).with_context(|| format!("Frame {} is not valid hex: {}", i + 1, input))?;
            Ok(CapturedFrame {
                number: i as u64 + 1,
                data: Bytes::from(data),
            })
        })
        .collect()
}

fn print_records(records: &[FrameRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records).context("Failed to serialize records")?);
        return Ok(());
    }

    for record in records {
        println!("Frame {}: {}", record.number, record.info);
        if let Some(error) = &record.error {
            println!("    [Malformed frame: {}]", error);
        }
        print!("{}", record.tree);
        println!();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::setup_logging(cli.log_file.clone(), &cli.verbose)?;
    let config = load_config(&cli)?;

    let frames = match &cli.command {
        Command::Decode { frames } => parse_hex_frames(frames)?,
        Command::Read { path } => {
            capture::read_frames(path).with_context(|| format!("Failed to read capture: {}", path.display()))?
        }
    };
    if frames.is_empty() {
        bail!("No frames to decode");
    }

    let mut session = Session::new(config);
    let records = session.dissect_capture(&frames);
    info!(
        frames = records.len(),
        reassembled = session.store().completed(),
        pending = session.store().pending(),
        "dissection finished"
    );

    print_records(&records, cli.json)
}
