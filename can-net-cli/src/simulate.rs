//! Random traffic generator
//!
//! Picks a random known message, fills every signal with random bits of its
//! size and writes the frame as a PDU line. Useful for piping into the
//! monitor (`can-net-cli simulate | can-net-cli monitor --port -`).

use anyhow::{bail, Result};
use can_net_codec::{Message, Network, OutgoingFrame};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::Write;
use std::time::Duration;

/// Default pause between frames
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Frame with every signal set to random bits, sent by `from_id`
pub fn random_frame<R: Rng + ?Sized>(rng: &mut R, message: &Message, from_id: u8) -> OutgoingFrame {
    let data = message
        .signals
        .iter()
        .map(|signal| {
            let bits = if signal.size >= 64 {
                rng.gen::<u64>()
            } else {
                rng.gen::<u64>() & ((1u64 << signal.size) - 1)
            };
            signal.inject(bits)
        })
        .fold(0, |frame, bits| frame | bits);

    OutgoingFrame::new(message.broadcast_id(from_id), data)
}

/// Emit `count` frames (or forever) to `out`
pub fn run<W: Write>(
    network: &Network,
    out: &mut W,
    from_id: u8,
    interval: Duration,
    count: Option<u64>,
) -> Result<()> {
    if network.messages().is_empty() {
        bail!("Network has no messages to simulate");
    }

    let mut rng = rand::thread_rng();
    let mut sent = 0u64;

    while count.map_or(true, |count| sent < count) {
        let Some(message) = network.messages().choose(&mut rng) else {
            break;
        };

        let frame = random_frame(&mut rng, message, from_id);
        log::trace!("Simulated {} as 0x{:08X}", message, frame.can_id);
        out.write_all(frame.to_pdu().as_bytes())?;
        out.flush()?;
        sent += 1;

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    log::info!("Simulated {} frame(s)", sent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_net_codec::{FrameMonitor, Signal};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn network() -> Network {
        let mut network = Network::new();
        network
            .add_message(
                Message::new(0x10, "Speed", 0x3)
                    .with_signal(Signal::new("rpm", 0, 12))
                    .with_signal(Signal::new("flag", 63, 1)),
            )
            .unwrap();
        network
    }

    #[test]
    fn test_random_frame_stays_within_signals() {
        let network = network();
        let message = network.message_by_id(0x10).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let frame = random_frame(&mut rng, message, 0x04);
            assert_eq!(frame.can_id, 0x0100_0043);
            assert_eq!(frame.data & !(0x8000_0000_0000_0FFF), 0);
        }
    }

    #[test]
    fn test_output_decodes_in_monitor() {
        let network = Arc::new(network());
        let mut out: Vec<u8> = Vec::new();

        run(&network, &mut out, 0, Duration::ZERO, Some(5)).unwrap();

        let mut monitor = FrameMonitor::new(Arc::clone(&network));
        for line in out.split_inclusive(|&b| b == b'\n') {
            assert!(monitor.observe_line(line, Utc::now()).is_some());
        }
        assert_eq!(monitor.record(0x0100_0003).unwrap().count, 5);
    }

    #[test]
    fn test_empty_network_rejected() {
        let mut out: Vec<u8> = Vec::new();
        assert!(run(&Network::new(), &mut out, 0, Duration::ZERO, Some(1)).is_err());
    }
}
