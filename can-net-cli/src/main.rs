//! CAN Network CLI Application
//!
//! Command-line front end for the can-net-codec library:
//! - Live terminal monitor over a serial port, capture file or stdin
//! - Network fingerprint and frozen artifact generation
//! - Code-generator context export
//! - Random traffic simulation

use anyhow::{Context, Result};
use can_net_codec::{
    freeze, load_frozen, load_network, node_context, Fingerprint, KeyActionDispatcher, LoadOptions,
    MonitorSession, Network,
};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod config;
mod serial;
mod simulate;
mod ui;

/// CAN Network - Monitor and exercise a CAN network over a serial bridge
#[derive(Parser, Debug)]
#[command(name = "can-net-cli")]
#[command(about = "Monitor and exercise a CAN network over a serial bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (default: ./can-net.toml if present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Write log output to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show live traffic and send frames bound to keys
    Monitor {
        #[command(flatten)]
        network: NetworkArgs,

        /// Serial device, capture file, or `-` for stdin
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate of the serial device
        #[arg(short, long)]
        baud: Option<u32>,

        /// Node id to transmit as (hex)
        #[arg(long, value_parser = parse_node_id)]
        id: Option<u8>,
    },

    /// Print the network fingerprint
    Fingerprint {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Write the resolved network to <fingerprint>.json.gz
    Freeze {
        #[command(flatten)]
        network: NetworkArgs,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print the code-generator context of a node instance as JSON
    Context {
        #[command(flatten)]
        network: NetworkArgs,

        /// Node instance id (hex)
        #[arg(long, value_parser = parse_node_id)]
        id: u8,
    },

    /// Emit random frames for known messages on stdout
    Simulate {
        #[command(flatten)]
        network: NetworkArgs,

        /// Sender node id (hex)
        #[arg(long, value_parser = parse_node_id, default_value = "0")]
        from: u8,

        /// Milliseconds between frames
        #[arg(long, default_value_t = simulate::DEFAULT_INTERVAL.as_millis() as u64)]
        interval_ms: u64,

        /// Stop after this many frames
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct NetworkArgs {
    /// Network description (.json, or a frozen .json.gz)
    #[arg(short, long, value_name = "FILE")]
    network: Option<PathBuf>,

    /// Reject signals with zero size or that do not fit in 64 bits
    #[arg(long)]
    strict: bool,
}

fn parse_node_id(value: &str) -> std::result::Result<u8, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid node id '{}': {}", value, e))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // The monitor owns the terminal, so it only logs errors unless redirected
    let quiet = cli.quiet || (matches!(cli.command, Command::Monitor { .. }) && cli.log_file.is_none());
    init_logging(cli.verbose, quiet, cli.log_file.as_deref())?;

    log::info!("CAN Network CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using codec library v{}", can_net_codec::VERSION);

    let (app_config, config_path) = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Monitor {
            network,
            port,
            baud,
            id,
        } => {
            let network = load(&network, &app_config, &config_path)?;

            let mut transport_config = app_config.transport.clone();
            if let Some(port) = port {
                transport_config.port = Some(port);
            }
            if let Some(baud) = baud {
                transport_config.baud_rate = baud;
            }
            let own_node_id = id.unwrap_or(app_config.own_node_id.0);

            let transport = serial::open(&transport_config)?;
            let title = format!(
                "{} | {} | node 0x{:02X}",
                Fingerprint::of(&network),
                transport.description,
                own_node_id
            );

            let dispatcher = KeyActionDispatcher::new(app_config.keys.clone(), own_node_id);
            let session = MonitorSession::new(Arc::new(network), dispatcher, transport.sink);
            ui::run(session, transport.source, title)?;
        }

        Command::Fingerprint { network } => {
            let network = load(&network, &app_config, &config_path)?;
            println!("{}", Fingerprint::of(&network));
        }

        Command::Freeze { network, out_dir } => {
            let network = load(&network, &app_config, &config_path)?;
            let path = freeze(&network, &out_dir)
                .with_context(|| format!("Failed to freeze network into {:?}", out_dir))?;
            println!("{}", path.display());
        }

        Command::Context { network, id } => {
            let network = load(&network, &app_config, &config_path)?;
            let context = node_context(&network, id)
                .with_context(|| format!("No node instance with id 0x{:02X}", id))?;
            println!("{}", serde_json::to_string_pretty(&context)?);
        }

        Command::Simulate {
            network,
            from,
            interval_ms,
            count,
        } => {
            let network = load(&network, &app_config, &config_path)?;
            let stdout = std::io::stdout();
            simulate::run(
                &network,
                &mut stdout.lock(),
                from,
                Duration::from_millis(interval_ms),
                count,
            )?;
        }
    }

    Ok(())
}

/// Load the network named on the command line, else the one in the config
fn load(args: &NetworkArgs, app_config: &config::AppConfig, config_path: &Path) -> Result<Network> {
    let path = args
        .network
        .clone()
        .or_else(|| app_config.network_path(config_path))
        .context("No network description given (use --network or set `network` in can-net.toml)")?;

    let options = LoadOptions::new().with_strict_signals(args.strict);
    let is_frozen = path.to_string_lossy().ends_with(can_net_codec::fingerprint::FROZEN_EXTENSION);

    let network = if is_frozen {
        load_frozen(&path, &options)
    } else {
        load_network(&path, &options)
    }
    .with_context(|| format!("Failed to load network description: {:?}", path))?;

    Ok(network)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    use env_logger::{Builder, Target};
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = Builder::new();
    builder.filter_level(level).format(|buf, record| {
        writeln!(
            buf,
            "[{} {}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = File::create(path).with_context(|| format!("Failed to create log file: {:?}", path))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
