// One-shot timers for the playback drivers
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// No load signal arrived in time
    Probe,
    /// Force the sequencer past a stanza that cannot play
    Fallback,
    /// Deferred narration restart
    Replay,
}

/// Identifies a scheduled timer; the generation ties it to the driver
/// epoch that armed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

impl TimerToken {
    pub fn new(kind: TimerKind, generation: u64) -> Self {
        Self { kind, generation }
    }
}

/// Schedules one-shot timers whose expiry is delivered back to the driver
pub trait Scheduler {
    /// Dropping the guard cancels the timer
    type Guard: Send;

    fn schedule(&self, token: TimerToken, delay: Duration) -> Self::Guard;
}

/// Scheduler backed by tokio; expired tokens are sent over a channel
#[derive(Clone)]
pub struct TokioScheduler {
    fired: UnboundedSender<TimerToken>,
}

impl TokioScheduler {
    pub fn new(fired: UnboundedSender<TimerToken>) -> Self {
        Self { fired }
    }
}

/// Aborts the sleeping task when dropped
pub struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Scheduler for TokioScheduler {
    type Guard = AbortOnDrop;

    fn schedule(&self, token: TimerToken, delay: Duration) -> AbortOnDrop {
        let fired = self.fired.clone();
        AbortOnDrop(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(token);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        let start = tokio::time::Instant::now();

        let _guard = scheduler.schedule(TimerToken::new(TimerKind::Fallback, 3), Duration::from_secs(10));
        let token = rx.recv().await.unwrap();

        assert_eq!(token, TimerToken::new(TimerKind::Fallback, 3));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_millis(10_050));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_guard_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        let guard = scheduler.schedule(TimerToken::new(TimerKind::Probe, 1), Duration::from_millis(500));
        drop(guard);
        let _live = scheduler.schedule(TimerToken::new(TimerKind::Probe, 2), Duration::from_secs(1));

        assert_eq!(rx.recv().await.unwrap().generation, 2);
    }
}
