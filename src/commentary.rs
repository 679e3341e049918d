//! Commentary on big merges and game over
//!
//! A provider turns a [`CommentaryRequest`] into a one-liner at its own pace;
//! the [`Commentator`] polls it, gives up after a timeout, and always ends
//! with some line so the presentation layer never waits on a dead service.

use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::CommentaryError;

/// Line used when the provider fails or times out
pub const FALLBACK_LINE: &str = "Nice move!";
/// Line used when the provider answers with nothing
pub const EMPTY_REPLY_LINE: &str = "Epic merge!";

/// What to comment on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentaryRequest {
    pub score: u64,
    /// Value of each tile in the merge being celebrated
    pub last_merge: u32,
    pub highest_tile: u32,
    pub is_game_over: bool,
}

impl CommentaryRequest {
    /// Prompt text for a language-model provider
    pub fn prompt(&self) -> String {
        if self.is_game_over {
            format!(
                "The player just lost a 2048 physics stacking game. Their score was {} and their highest tile was {}. Give them a short, witty, encouraging one-liner for their next try.",
                self.score, self.highest_tile
            )
        } else {
            format!(
                "The player just merged two {} tiles to make a {} in a 2048 physics game. Their current score is {}. Give a very short, hyped-up, 1-sentence reaction.",
                self.last_merge,
                self.last_merge as u64 * 2,
                self.score
            )
        }
    }
}

/// Result of polling a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentaryPoll {
    Pending,
    Ready(Result<String, CommentaryError>),
}

/// Non-blocking source of commentary lines
pub trait CommentaryProvider {
    /// Start a request. At most one is in flight.
    fn submit(&mut self, request: &CommentaryRequest) -> Result<(), CommentaryError>;

    fn poll(&mut self) -> CommentaryPoll;

    /// Drop the in-flight request, if any
    fn cancel(&mut self);
}

/// Drives a provider with a timeout and canned fallbacks
pub struct Commentator {
    provider: Box<dyn CommentaryProvider>,
    deadline: Option<u64>,
    timeout_ms: u64,
}

impl Commentator {
    pub fn new(provider: Box<dyn CommentaryProvider>, timeout_ms: u64) -> Self {
        Self {
            provider,
            deadline: None,
            timeout_ms,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Ask for a line. A stale request still in flight is dropped.
    ///
    /// Returns a fallback line right away if the provider refuses the request.
    pub fn request(&mut self, request: &CommentaryRequest, now_ms: u64) -> Option<String> {
        if self.deadline.take().is_some() {
            log::debug!("Replacing stale commentary request");
            self.provider.cancel();
        }
        match self.provider.submit(request) {
            Ok(()) => {
                self.deadline = Some(now_ms.saturating_add(self.timeout_ms));
                None
            }
            Err(e) => {
                log::warn!("Commentary request failed: {}", e);
                Some(FALLBACK_LINE.to_string())
            }
        }
    }

    /// Check on the in-flight request
    pub fn poll(&mut self, now_ms: u64) -> Option<String> {
        let deadline = self.deadline?;
        match self.provider.poll() {
            CommentaryPoll::Ready(Ok(line)) => {
                self.deadline = None;
                let line = line.trim();
                if line.is_empty() {
                    Some(EMPTY_REPLY_LINE.to_string())
                } else {
                    Some(line.to_string())
                }
            }
            CommentaryPoll::Ready(Err(e)) => {
                self.deadline = None;
                log::warn!("Commentary failed: {}", e);
                Some(FALLBACK_LINE.to_string())
            }
            CommentaryPoll::Pending if now_ms >= deadline => {
                self.deadline = None;
                self.provider.cancel();
                log::warn!("Commentary failed: {}", CommentaryError::Timeout);
                Some(FALLBACK_LINE.to_string())
            }
            CommentaryPoll::Pending => None,
        }
    }

    /// Drop any in-flight request
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            self.provider.cancel();
        }
    }
}

const MERGE_LINES: &[&str] = &[
    "Stack attack!",
    "That one rolled right in!",
    "Gravity is on your side!",
    "Bigger and bigger!",
    "Smooth drop!",
];

const GAME_OVER_LINES: &[&str] = &[
    "The tower fell, but legends rebuild.",
    "So close! Next stack is the one.",
    "Physics won this round. Rematch?",
    "Shake it off and drop again.",
];

/// Offline provider picking from fixed lines
#[derive(Debug, Clone)]
pub struct CannedCommentary {
    rng: Pcg32,
    ready: Option<String>,
}

impl CannedCommentary {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            ready: None,
        }
    }
}

impl CommentaryProvider for CannedCommentary {
    fn submit(&mut self, request: &CommentaryRequest) -> Result<(), CommentaryError> {
        let lines = if request.is_game_over {
            GAME_OVER_LINES
        } else {
            MERGE_LINES
        };
        self.ready = lines.choose(&mut self.rng).map(|s| s.to_string());
        Ok(())
    }

    fn poll(&mut self) -> CommentaryPoll {
        match self.ready.take() {
            Some(line) => CommentaryPoll::Ready(Ok(line)),
            None => CommentaryPoll::Pending,
        }
    }

    fn cancel(&mut self) {
        self.ready = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Provider that replays scripted poll results
    #[derive(Default)]
    struct Scripted {
        polls: VecDeque<CommentaryPoll>,
        submitted: Rc<RefCell<Vec<CommentaryRequest>>>,
        cancels: Rc<RefCell<u32>>,
        refuse: bool,
    }

    impl CommentaryProvider for Scripted {
        fn submit(&mut self, request: &CommentaryRequest) -> Result<(), CommentaryError> {
            if self.refuse {
                return Err(CommentaryError::Busy);
            }
            self.submitted.borrow_mut().push(*request);
            Ok(())
        }

        fn poll(&mut self) -> CommentaryPoll {
            self.polls.pop_front().unwrap_or(CommentaryPoll::Pending)
        }

        fn cancel(&mut self) {
            *self.cancels.borrow_mut() += 1;
        }
    }

    fn merge_request() -> CommentaryRequest {
        CommentaryRequest {
            score: 300,
            last_merge: 64,
            highest_tile: 128,
            is_game_over: false,
        }
    }

    fn commentator(polls: Vec<CommentaryPoll>) -> Commentator {
        let provider = Scripted {
            polls: polls.into(),
            ..Default::default()
        };
        Commentator::new(Box::new(provider), 4000)
    }

    #[test]
    fn test_prompts() {
        let merge = merge_request();
        assert!(merge.prompt().contains("merged two 64 tiles to make a 128"));
        assert!(merge.prompt().contains("current score is 300"));

        let over = CommentaryRequest {
            is_game_over: true,
            ..merge
        };
        assert!(over.prompt().contains("just lost"));
        assert!(over.prompt().contains("highest tile was 128"));
    }

    #[test]
    fn test_reply_is_trimmed() {
        let mut c = commentator(vec![
            CommentaryPoll::Pending,
            CommentaryPoll::Ready(Ok("  Huge!\n".into())),
        ]);
        assert!(c.request(&merge_request(), 0).is_none());
        assert!(c.is_pending());
        assert_eq!(c.poll(16), None);
        assert_eq!(c.poll(32).as_deref(), Some("Huge!"));
        assert!(!c.is_pending());
        assert_eq!(c.poll(48), None);
    }

    #[test]
    fn test_empty_reply_and_error_fallbacks() {
        let mut c = commentator(vec![CommentaryPoll::Ready(Ok("   ".into()))]);
        c.request(&merge_request(), 0);
        assert_eq!(c.poll(1).as_deref(), Some(EMPTY_REPLY_LINE));

        let mut c = commentator(vec![CommentaryPoll::Ready(Err(CommentaryError::Request(
            "quota".into(),
        )))]);
        c.request(&merge_request(), 0);
        assert_eq!(c.poll(1).as_deref(), Some(FALLBACK_LINE));
    }

    #[test]
    fn test_timeout_falls_back_and_cancels() {
        let cancels = Rc::new(RefCell::new(0));
        let provider = Scripted {
            cancels: cancels.clone(),
            ..Default::default()
        };
        let mut c = Commentator::new(Box::new(provider), 4000);
        c.request(&merge_request(), 1000);
        assert_eq!(c.poll(4999), None);
        assert_eq!(c.poll(5000).as_deref(), Some(FALLBACK_LINE));
        assert_eq!(*cancels.borrow(), 1);
        assert!(!c.is_pending());
    }

    #[test]
    fn test_new_request_replaces_stale_one() {
        let submitted = Rc::new(RefCell::new(Vec::new()));
        let cancels = Rc::new(RefCell::new(0));
        let provider = Scripted {
            submitted: submitted.clone(),
            cancels: cancels.clone(),
            ..Default::default()
        };
        let mut c = Commentator::new(Box::new(provider), 4000);
        c.request(&merge_request(), 0);
        let over = CommentaryRequest {
            is_game_over: true,
            ..merge_request()
        };
        c.request(&over, 100);

        assert_eq!(*cancels.borrow(), 1);
        assert_eq!(submitted.borrow().len(), 2);
        // Deadline follows the newer request
        assert_eq!(c.poll(4050), None);
    }

    #[test]
    fn test_refused_submit_answers_immediately() {
        let provider = Scripted {
            refuse: true,
            ..Default::default()
        };
        let mut c = Commentator::new(Box::new(provider), 4000);
        assert_eq!(c.request(&merge_request(), 0).as_deref(), Some(FALLBACK_LINE));
        assert!(!c.is_pending());
    }

    #[test]
    fn test_canned_provider_answers_on_first_poll() {
        let mut c = Commentator::new(Box::new(CannedCommentary::new(3)), 4000);
        c.request(&merge_request(), 0);
        let line = c.poll(0).unwrap();
        assert!(MERGE_LINES.contains(&line.as_str()));

        c.request(
            &CommentaryRequest {
                is_game_over: true,
                ..merge_request()
            },
            10,
        );
        let line = c.poll(10).unwrap();
        assert!(GAME_OVER_LINES.contains(&line.as_str()));
    }
}
