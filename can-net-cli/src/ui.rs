//! Terminal monitor
//!
//! A current-thread tokio runtime drives the event loop. Frames arrive from
//! the reader worker, keyboard input is polled on every tick, and the screen
//! is redrawn only when something changed.

use anyhow::Result;
use can_net_codec::reader::DEFAULT_SHUTDOWN_GRACE;
use can_net_codec::{FrameReader, LineSource, MonitorSession};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write};
use std::time::Duration;

/// Input poll and redraw interval
pub const TICK: Duration = Duration::from_millis(50);

/// What a key press asks the event loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Up,
    Down,
    ToggleDetails,
    /// Dispatch the actions bound to this key symbol
    Send(String),
}

/// Map a terminal key event to a command
pub fn translate(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Up => Some(Command::Up),
        KeyCode::Down => Some(Command::Down),
        KeyCode::Enter => Some(Command::ToggleDetails),
        KeyCode::Char(c) => Some(Command::Send(c.to_string())),
        KeyCode::F(n) => Some(Command::Send(format!("F{}", n))),
        _ => None,
    }
}

/// Restores the terminal when dropped
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Run the monitor until the user quits
pub fn run<S: LineSource>(session: MonitorSession, source: S, title: String) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = {
        let _guard = TerminalGuard::enter()?;
        rt.block_on(event_loop(session, source, &title))
    };

    // A reader blocked on a silent port is not waited for
    rt.shutdown_timeout(DEFAULT_SHUTDOWN_GRACE);
    result
}

async fn event_loop<S: LineSource>(mut session: MonitorSession, source: S, title: &str) -> Result<()> {
    let mut reader = FrameReader::spawn(source);
    let mut reader_open = true;
    let mut tick = tokio::time::interval(TICK);
    let mut dirty = true;

    'outer: loop {
        tokio::select! {
            line = reader.next(), if reader_open => match line {
                Some(line) => {
                    session.handle_line(&line);
                    dirty = true;
                }
                None => {
                    log::info!("Transport closed");
                    reader_open = false;
                    dirty = true;
                }
            },
            _ = tick.tick() => {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        dirty = true;
                        continue;
                    };
                    match translate(key) {
                        Some(Command::Quit) => break 'outer,
                        Some(Command::Up) => session.move_up(),
                        Some(Command::Down) => session.move_down(),
                        Some(Command::ToggleDetails) => {
                            session.toggle_selected();
                        }
                        Some(Command::Send(symbol)) => {
                            session.press_key(&symbol);
                        }
                        None => continue,
                    }
                    dirty = true;
                }

                if dirty {
                    draw(&session, title, reader_open)?;
                    dirty = false;
                }
            }
        }
    }

    reader.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    Ok(())
}

fn draw(session: &MonitorSession, title: &str, reader_open: bool) -> Result<()> {
    let (width, height) = terminal::size()?;
    let mut stdout = io::stdout();

    let state = if reader_open { "" } else { " [closed]" };
    let header = format!(
        "{}{}  (q quit, Up/Down move, Enter details)",
        title, state
    );

    queue!(stdout, terminal::Clear(ClearType::All))?;
    let lines = std::iter::once(header).chain(session.render());
    for (row, line) in lines.take(height as usize).enumerate() {
        let visible: String = line.chars().take(width as usize).collect();
        queue!(stdout, cursor::MoveTo(0, row as u16), Print(visible))?;
    }

    stdout.flush()?;
    Ok(())
}
