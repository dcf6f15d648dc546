//! Standalone capture decoder
//!
//! Replays a recorded capture (one PDU line per frame) through the frame
//! monitor and prints the final table plus details of every identifier.
//!
//! Usage:
//!   decode_capture <network.json> <capture.txt>
//!
//! Example:
//!   decode_capture demos/network.json capture.txt

use can_net_codec::{load_network, Fingerprint, FrameMonitor, LoadOptions};
use chrono::Utc;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <network.json> <capture.txt>", args[0]);
        std::process::exit(1);
    }

    let network = load_network(&PathBuf::from(&args[1]), &LoadOptions::new())?;
    println!("Network fingerprint: {}", Fingerprint::of(&network));

    let mut monitor = FrameMonitor::new(Arc::new(network));
    let reader = BufReader::new(File::open(&args[2])?);

    for line in reader.split(b'\n') {
        monitor.observe_line(&line?, Utc::now());
    }

    println!("\n=== FRAMES ===");
    for row in monitor.render_table() {
        println!("{}", row);
    }

    println!("\n=== DETAILS ===");
    for record in monitor.records() {
        print!("{}", monitor.render_details(record));
    }

    let diagnostics = monitor.diagnostics();
    println!("\n=== SUMMARY ===");
    println!("Frames observed:      {}", diagnostics.observed);
    println!("Malformed lines:      {}", diagnostics.malformed_lines);
    println!("Unknown identifiers:  {}", diagnostics.unknown_identifiers);
    println!("Unknown enum values:  {}", diagnostics.unresolved_enum_values);

    Ok(())
}
