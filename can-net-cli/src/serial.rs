//! Transport backends: serial port, capture file, stdin

use crate::config::{ParityConfig, TransportConfig};
use anyhow::{bail, Context, Result};
use can_net_codec::{BufLineSource, FrameSink};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Duration;
use tokio_serial::{DataBits, Parity, StopBits};

/// Port name selecting standard input
pub const STDIN_PORT: &str = "-";

pub type Source = BufLineSource<BufReader<Box<dyn Read + Send>>>;

/// An opened transport split into its reader and writer halves
pub struct Transport {
    pub source: Source,
    /// `None` for read-only transports
    pub sink: Option<Box<dyn FrameSink>>,
    pub description: String,
}

/// Open the configured port
///
/// An existing regular file is replayed read-only. Anything else is opened as
/// a serial device and split with `try_clone`.
pub fn open(config: &TransportConfig) -> Result<Transport> {
    let Some(port) = config.port.as_deref() else {
        bail!("No transport port configured (use --port or [transport] port)");
    };

    if port == STDIN_PORT {
        log::info!("Reading frames from stdin");
        return Ok(read_only(Box::new(io::stdin()), "stdin".to_string()));
    }

    if Path::new(port).is_file() {
        log::info!("Replaying capture file {}", port);
        let file = File::open(port).with_context(|| format!("Failed to open capture file: {}", port))?;
        return Ok(read_only(Box::new(file), port.to_string()));
    }

    let builder = tokio_serial::new(port, config.baud_rate)
        .parity(parity(config.parity))
        .stop_bits(stop_bits(config.stop_bits)?)
        .data_bits(data_bits(config.data_bits)?)
        .timeout(Duration::from_millis(config.timeout_ms));

    let reader = builder
        .open()
        .with_context(|| format!("Failed to open serial port: {}", port))?;
    let writer = reader
        .try_clone()
        .with_context(|| format!("Failed to clone serial port handle: {}", port))?;

    let description = format!(
        "{} @ {} baud, {}{}{}",
        port,
        config.baud_rate,
        config.data_bits,
        parity_letter(config.parity),
        config.stop_bits
    );
    log::info!("Opened serial port {}", description);

    let reader: Box<dyn Read + Send> = Box::new(reader);
    Ok(Transport {
        source: BufLineSource::new(BufReader::new(reader)),
        sink: Some(Box::new(writer)),
        description,
    })
}

fn read_only(reader: Box<dyn Read + Send>, description: String) -> Transport {
    Transport {
        source: BufLineSource::new(BufReader::new(reader)),
        sink: None,
        description: format!("{} (read-only)", description),
    }
}

fn parity(parity: ParityConfig) -> Parity {
    match parity {
        ParityConfig::None => Parity::None,
        ParityConfig::Odd => Parity::Odd,
        ParityConfig::Even => Parity::Even,
    }
}

fn parity_letter(parity: ParityConfig) -> char {
    match parity {
        ParityConfig::None => 'N',
        ParityConfig::Odd => 'O',
        ParityConfig::Even => 'E',
    }
}

fn stop_bits(bits: u8) -> Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => bail!("Unsupported stop bits: {}", other),
    }
}

fn data_bits(bits: u8) -> Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => bail!("Unsupported data bits: {}", other),
    }
}
