//! Cancelable delayed tasks
//!
//! Each pending task is keyed by a [`TimerToken`]. Scheduling a kind that is
//! already pending replaces it; cancelling removes the token before the task
//! can fire, and a firing is only honoured while its token is still current.

use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::runtime::{Inbox, Message};

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Hide a flashed overlay
    AutoHide,
    /// Pause a view that left its window
    DeferredPause,
}

/// Identity of one scheduled firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    seq: u64,
}

/// At most one pending task per [`TimerKind`]
pub struct Scheduler {
    inbox: Inbox,
    seq: u64,
    pending: HashMap<TimerKind, (TimerToken, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new(inbox: Inbox) -> Self {
        Self {
            inbox,
            seq: 0,
            pending: HashMap::new(),
        }
    }

    /// Post `Message::Timer` after `delay`, replacing any pending task of this kind
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        self.cancel(kind);
        self.seq += 1;
        let token = TimerToken {
            kind,
            seq: self.seq,
        };

        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inbox.send(Message::Timer(token));
        });
        self.pending.insert(kind, (token, task));
        trace!(?token, ?delay, "Timer scheduled");
        token
    }

    /// Cancel the pending task of this kind; false if none was pending
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.pending.remove(&kind) {
            Some((token, task)) => {
                task.abort();
                trace!(?token, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Claim a firing; false if the token was cancelled or replaced
    pub fn fire(&mut self, token: TimerToken) -> bool {
        match self.pending.get(&token.kind) {
            Some((current, _)) if *current == token => {
                self.pending.remove(&token.kind);
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, task)) in self.pending.drain() {
            task.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        let token = scheduler.schedule(TimerKind::AutoHide, Duration::from_secs(5));

        let Some(Message::Timer(fired)) = rx.recv().await else {
            panic!("expected a timer message");
        };
        assert_eq!(fired, token);
        assert!(scheduler.fire(fired));
        assert!(!scheduler.is_pending(TimerKind::AutoHide));
        assert!(!scheduler.fire(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        scheduler.schedule(TimerKind::DeferredPause, Duration::from_millis(200));
        tokio::task::yield_now().await;

        assert!(scheduler.cancel(TimerKind::DeferredPause));
        assert!(!scheduler.cancel(TimerKind::DeferredPause));

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_invalidates_old_token() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        let first = scheduler.schedule(TimerKind::AutoHide, Duration::from_secs(5));
        let second = scheduler.schedule(TimerKind::AutoHide, Duration::from_secs(5));

        assert_ne!(first, second);
        assert!(!scheduler.fire(first));
        assert!(scheduler.fire(second));
    }
}
