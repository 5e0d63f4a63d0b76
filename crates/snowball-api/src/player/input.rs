//! Keyboard input for the player.

use std::sync::{Arc, Mutex, PoisonError};

use snowball_navigation::application::router::MemoryAddressBar;
use snowball_navigation::application::session::SessionInput;
use snowball_navigation::domain::commands::UserIntent;
use snowball_navigation::domain::ports::AddressBar;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What one typed line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerLine {
    Send(SessionInput),
    /// Edit the address to `#<fragment>`.
    Goto(String),
    Ignore,
}

/// Interprets one line of keyboard input.
///
/// An empty line continues, a number picks a choice (counting from 1),
/// `#id` edits the address, `:q` quits and anything else is an answer,
/// including a bare `q`.
#[must_use]
pub fn parse_line(line: &str) -> PlayerLine {
    let line = line.trim();
    if line.is_empty() {
        return PlayerLine::Send(SessionInput::Intent(UserIntent::Continue));
    }
    if line.eq_ignore_ascii_case(":q") || line.eq_ignore_ascii_case(":quit") {
        return PlayerLine::Send(SessionInput::Quit);
    }
    if let Some(fragment) = line.strip_prefix('#') {
        return PlayerLine::Goto(fragment.trim().to_owned());
    }
    if let Ok(choice) = line.parse::<usize>() {
        return match choice.checked_sub(1) {
            Some(index) => PlayerLine::Send(SessionInput::Intent(UserIntent::Choose(index))),
            None => PlayerLine::Ignore,
        };
    }
    PlayerLine::Send(SessionInput::Intent(UserIntent::Answer(line.to_owned())))
}

/// Address bar shared between the session and the keyboard reader.
#[derive(Debug, Clone, Default)]
pub struct SharedAddressBar(Arc<Mutex<MemoryAddressBar>>);

impl SharedAddressBar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut MemoryAddressBar) -> T) -> T {
        let mut bar = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut bar)
    }

    /// Every entry, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.with(|bar| bar.history().to_vec())
    }
}

impl AddressBar for SharedAddressBar {
    fn fragment(&self) -> Option<String> {
        self.with(|bar| bar.fragment())
    }

    fn push(&mut self, fragment: &str) {
        self.with(|bar| bar.push(fragment));
    }

    fn replace(&mut self, fragment: &str) {
        self.with(|bar| bar.replace(fragment));
    }
}

/// Forwards typed lines to the session until input ends, then asks the
/// session to stop.
pub async fn read_lines<R>(input: R, mut bar: SharedAddressBar, inputs: mpsc::Sender<SessionInput>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read input");
                break;
            }
        };
        let input = match parse_line(&line) {
            PlayerLine::Send(input) => input,
            PlayerLine::Goto(fragment) => {
                bar.push(&fragment);
                SessionInput::AddressChanged
            }
            PlayerLine::Ignore => continue,
        };
        let quit = input == SessionInput::Quit;
        if inputs.send(input).await.is_err() || quit {
            return;
        }
    }
    debug!("input closed");
    // The session may already be gone.
    let _ = inputs.send(SessionInput::Quit).await;
}
