//! Event-loop state
//!
//! A [`MonitorSession`] is the single owner of everything the event loop
//! mutates: the frame monitor, the detail selection, the key dispatcher with
//! the transport's writer half, and the cursor. Reader output and key presses
//! are both applied through it, one at a time.

use crate::dispatch::{DispatchError, KeyActionDispatcher};
use crate::monitor::{FrameMonitor, Selection};
use crate::network::Network;
use crate::reader::RawLine;
use crate::transport::FrameSink;
use std::sync::Arc;

/// Monitor, selection, dispatcher and transport writer of one running monitor
pub struct MonitorSession {
    monitor: FrameMonitor,
    selection: Selection,
    dispatcher: KeyActionDispatcher,
    sink: Option<Box<dyn FrameSink>>,
    cursor: usize,
    status: Option<String>,
}

impl MonitorSession {
    pub fn new(
        network: Arc<Network>,
        dispatcher: KeyActionDispatcher,
        sink: Option<Box<dyn FrameSink>>,
    ) -> Self {
        Self {
            monitor: FrameMonitor::new(network),
            selection: Selection::new(),
            dispatcher,
            sink,
            cursor: 0,
            status: None,
        }
    }

    /// Apply one line from the reader; returns whether it was a valid frame
    pub fn handle_line(&mut self, line: &RawLine) -> bool {
        self.monitor.observe_line(&line.data, line.received).is_some()
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.monitor.records().len() {
            self.cursor += 1;
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Toggle detail display of the record under the cursor
    pub fn toggle_selected(&mut self) -> Option<bool> {
        let can_id = self.monitor.records().get(self.cursor)?.can_id;
        Some(self.selection.toggle(can_id))
    }

    /// Dispatch the actions bound to `key`; returns the number of frames sent
    ///
    /// Failures are logged and the last one is kept as the status line.
    pub fn press_key(&mut self, key: &str) -> usize {
        let network = Arc::clone(self.monitor.network());
        let sink: Option<&mut dyn FrameSink> = match &mut self.sink {
            Some(sink) => Some(sink.as_mut()),
            None => None,
        };
        let results = self.dispatcher.dispatch(key, &network, sink);

        let mut sent = 0;
        let mut last_error: Option<DispatchError> = None;
        for result in results {
            match result {
                Ok(_) => sent += 1,
                Err(e) => {
                    log::warn!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            self.status = Some(e.to_string());
        } else if sent > 0 {
            self.status = Some(format!("Key '{}': sent {} frame(s)", key, sent));
        }

        sent
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn monitor(&self) -> &FrameMonitor {
        &self.monitor
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn has_transport(&self) -> bool {
        self.sink.is_some()
    }

    /// Full screen text: table, selected details, status
    ///
    /// The row under the cursor is marked with `>`, selected rows with `*`.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for (i, record) in self.monitor.records().iter().enumerate() {
            let cursor = if i == self.cursor { '>' } else { ' ' };
            let selected = if self.selection.contains(record.can_id) { '*' } else { ' ' };
            lines.push(format!("{}{} {}", cursor, selected, self.monitor.render_row(record)));
        }

        let details = self.monitor.render_selection(&self.selection);
        if !details.is_empty() {
            lines.push(String::new());
            lines.extend(details.lines().map(str::to_string));
        }

        let diagnostics = self.monitor.diagnostics();
        lines.push(String::new());
        lines.push(format!(
            "frames: {}  malformed: {}  unknown ids: {}  unknown values: {}",
            diagnostics.observed,
            diagnostics.malformed_lines,
            diagnostics.unknown_identifiers,
            diagnostics.unresolved_enum_values
        ));
        if let Some(status) = &self.status {
            lines.push(status.clone());
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{KeyAction, KeyMapping};
    use crate::frame::OutgoingFrame;
    use crate::network::Message;
    use crate::signal::Signal;
    use chrono::Utc;
    use std::io;
    use std::sync::Mutex;

    fn network() -> Arc<Network> {
        let mut network = Network::new();
        network
            .add_message(Message::new(0x10, "Speed", 0x3).with_signal(Signal::new("rpm", 0, 16)))
            .unwrap();
        network
            .add_message(Message::new(0x20, "Command", 0x1).with_signal(Signal::new("target", 0, 8)))
            .unwrap();
        Arc::new(network)
    }

    fn dispatcher() -> KeyActionDispatcher {
        let mut bindings = KeyMapping::new();
        bindings.insert("g".to_string(), vec![KeyAction::new("Command").with_signal("target", 7)]);
        bindings.insert("x".to_string(), vec![KeyAction::new("Nope")]);
        KeyActionDispatcher::new(bindings, 0x09)
    }

    fn line(can_id: u32, data: u64) -> RawLine {
        RawLine {
            data: OutgoingFrame::new(can_id, data).to_pdu().into_bytes(),
            received: Utc::now(),
        }
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<OutgoingFrame>>>);

    impl FrameSink for SharedSink {
        fn write_frame(&mut self, frame: &OutgoingFrame) -> io::Result<()> {
            self.0.lock().unwrap().push(*frame);
            Ok(())
        }
    }

    #[test]
    fn test_cursor_and_selection() {
        let mut session = MonitorSession::new(network(), dispatcher(), None);
        assert_eq!(session.toggle_selected(), None);

        assert!(session.handle_line(&line(0x0100_2013, 1)));
        assert!(session.handle_line(&line(0x0200_0051, 2)));
        assert!(!session.handle_line(&RawLine {
            data: b"xyz\n".to_vec(),
            received: Utc::now(),
        }));

        session.move_down();
        session.move_down();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.toggle_selected(), Some(true));
        assert!(session.selection().contains(0x0200_0051));

        let screen = session.render();
        assert!(screen[0].starts_with("   0x10"));
        assert!(screen[1].starts_with(">* 0x20"));
        assert!(screen.iter().any(|l| l == "Command | To: 0x00 From: 0x05"));
        assert!(screen.iter().any(|l| l.contains("malformed: 1")));

        session.move_up();
        session.move_up();
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_press_key_sends_frames() {
        let sink = SharedSink::default();
        let mut session = MonitorSession::new(network(), dispatcher(), Some(Box::new(sink.clone())));

        assert_eq!(session.press_key("g"), 1);
        assert_eq!(session.press_key("unbound"), 0);

        let sent = sink.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].can_id, 0x0200_0091);
        assert_eq!(sent[0].data, 7);
        assert_eq!(session.status(), Some("Key 'g': sent 1 frame(s)"));
    }

    #[test]
    fn test_dispatch_failures_become_status() {
        let mut session = MonitorSession::new(network(), dispatcher(), None);

        assert_eq!(session.press_key("g"), 0);
        assert_eq!(session.status(), Some("No writable transport"));

        let mut session = MonitorSession::new(
            network(),
            dispatcher(),
            Some(Box::new(SharedSink::default())),
        );
        session.press_key("x");
        assert_eq!(
            session.status(),
            Some("Key 'x' references unknown message 'Nope'")
        );
    }
}
