use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30);

/// Character-by-character reveal state. Only the newest bot reply is animated;
/// history re-renders pass `animate = false` and show the full text at once.
#[derive(Debug)]
pub struct Typewriter {
    text: String,
    revealed: usize, // byte offset, always on a char boundary
}

impl Typewriter {
    pub fn new(text: impl Into<String>, animate: bool) -> Self {
        let text = text.into();
        let revealed = if animate { 0 } else { text.len() };
        Self { text, revealed }
    }

    /// Reveal the next character, returning the newly visible slice. None
    /// once the string is exhausted.
    pub fn tick(&mut self) -> Option<&str> {
        let rest = &self.text[self.revealed..];
        let ch = rest.chars().next()?;
        let start = self.revealed;
        self.revealed += ch.len_utf8();
        Some(&self.text[start..self.revealed])
    }

    pub fn visible(&self) -> &str {
        &self.text[..self.revealed]
    }

    pub fn is_done(&self) -> bool {
        self.revealed == self.text.len()
    }

    /// Jump straight to the full text.
    #[allow(dead_code)]
    pub fn skip(&mut self) {
        self.revealed = self.text.len();
    }

    /// Start over with a new string, discarding any in-progress reveal.
    #[allow(dead_code)]
    pub fn restart(&mut self, text: impl Into<String>, animate: bool) {
        *self = Self::new(text, animate);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RevealEvent {
    /// The newly revealed slice (the whole string when not animating).
    Chunk(String),
    /// The reveal ran to completion. Not fired when cancelled.
    Done,
}

/// Drive a reveal at a fixed cadence, emitting chunks until the text is
/// exhausted or the token is cancelled. Restarting means cancelling this run
/// and starting another.
pub async fn run(
    text: &str,
    animate: bool,
    tick: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<RevealEvent>,
) {
    let mut typewriter = Typewriter::new(text, animate);

    if typewriter.is_done() {
        if !text.is_empty() {
            let _ = tx.send(RevealEvent::Chunk(text.to_string())).await;
        }
        let _ = tx.send(RevealEvent::Done).await;
        return;
    }

    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                return;
            }
            _ = ticker.tick() => {
                match typewriter.tick() {
                    Some(chunk) => {
                        if tx.send(RevealEvent::Chunk(chunk.to_string())).await.is_err() {
                            return;
                        }
                    }
                    None => break,
                }
                if typewriter.is_done() {
                    break;
                }
            }
        }
    }

    let _ = tx.send(RevealEvent::Done).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_reveals_one_char_at_a_time() {
        let mut tw = Typewriter::new("hi", true);
        assert_eq!(tw.visible(), "");
        assert_eq!(tw.tick(), Some("h"));
        assert_eq!(tw.tick(), Some("i"));
        assert!(tw.is_done());
        assert_eq!(tw.tick(), None);
        assert_eq!(tw.visible(), "hi");
    }

    #[test]
    fn test_multibyte_chars_stay_whole() {
        let mut tw = Typewriter::new("héllo", true);
        assert_eq!(tw.tick(), Some("h"));
        assert_eq!(tw.tick(), Some("é"));
        assert_eq!(tw.visible(), "hé");
    }

    #[test]
    fn test_animate_false_shows_everything() {
        let tw = Typewriter::new("already seen", false);
        assert!(tw.is_done());
        assert_eq!(tw.visible(), "already seen");
    }

    #[test]
    fn test_skip_jumps_to_full_text() {
        let mut tw = Typewriter::new("long reply", true);
        tw.tick();
        tw.skip();
        assert!(tw.is_done());
        assert_eq!(tw.visible(), "long reply");
    }

    #[test]
    fn test_restart_discards_progress() {
        let mut tw = Typewriter::new("first", true);
        tw.tick();
        tw.restart("second", true);
        assert_eq!(tw.visible(), "");
        assert_eq!(tw.tick(), Some("s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_chunks_then_done() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        tokio::spawn(async move {
            run("ab", true, Duration::from_millis(30), cancel, tx).await;
        });

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                RevealEvent::Chunk("a".to_string()),
                RevealEvent::Chunk("b".to_string()),
                RevealEvent::Done,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_animation_is_immediate() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        run("full text", false, Duration::from_millis(30), cancel, tx).await;

        assert_eq!(
            rx.recv().await,
            Some(RevealEvent::Chunk("full text".to_string()))
        );
        assert_eq!(rx.recv().await, Some(RevealEvent::Done));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_without_done() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run("a long string to reveal", true, Duration::from_millis(30), cancel, tx).await;
            })
        };

        assert!(matches!(rx.recv().await, Some(RevealEvent::Chunk(_))));
        cancel.cancel();
        handle.await.unwrap();

        // Drain: no Done after cancellation.
        let mut saw_done = false;
        while let Some(event) = rx.recv().await {
            saw_done |= event == RevealEvent::Done;
        }
        assert!(!saw_done);
    }
}
