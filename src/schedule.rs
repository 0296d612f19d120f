//! Timers driving the game: one-second countdown and deferred match clears.
//!
//! Deadlines are plain `Instant`s polled by the event loop, so the game state
//! never reads the clock itself.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Countdown period.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second of play elapsed.
    CountdownTick,
    /// The oldest pending match finished its clear animation.
    MatchReady,
}

#[derive(Debug)]
pub struct Scheduler {
    match_delay: Duration,
    next_tick: Option<Instant>,
    /// One deadline per confirmed match, oldest first.
    match_deadlines: VecDeque<Instant>,
}

impl Scheduler {
    pub fn new(match_delay: Duration) -> Self {
        Self {
            match_delay,
            next_tick: None,
            match_deadlines: VecDeque::new(),
        }
    }

    #[cfg(test)]
    pub fn countdown_running(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn start_countdown(&mut self, now: Instant) {
        self.next_tick = Some(now + TICK_INTERVAL);
    }

    pub fn stop_countdown(&mut self) {
        self.next_tick = None;
    }

    /// Arm the one-shot clear for a match confirmed at `now`.
    pub fn schedule_match(&mut self, now: Instant) {
        self.match_deadlines.push_back(now + self.match_delay);
    }

    pub fn pending_matches(&self) -> usize {
        self.match_deadlines.len()
    }

    /// Drop every deadline (restart, game over).
    pub fn cancel_all(&mut self) {
        self.next_tick = None;
        self.match_deadlines.clear();
    }

    /// Earliest armed deadline, for bounding the input poll.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_tick, self.match_deadlines.front()) {
            (Some(t), Some(&m)) => Some(t.min(m)),
            (t, m) => t.or(m.copied()),
        }
    }

    /// Pop every event due at `now`, in deadline order. A lagging loop gets one
    /// `CountdownTick` per missed second.
    pub fn due(&mut self, now: Instant) -> Vec<TimerEvent> {
        let mut events: Vec<(Instant, TimerEvent)> = Vec::new();
        while let Some(t) = self.next_tick.filter(|&t| t <= now) {
            events.push((t, TimerEvent::CountdownTick));
            self.next_tick = Some(t + TICK_INTERVAL);
        }
        while let Some(&m) = self.match_deadlines.front().filter(|&&m| m <= now) {
            events.push((m, TimerEvent::MatchReady));
            self.match_deadlines.pop_front();
        }
        // Stable: a tick and a clear on the same instant keep tick first.
        events.sort_by_key(|&(at, _)| at);
        events.into_iter().map(|(_, e)| e).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_nothing_armed() {
        let mut s = Scheduler::new(ms(600));
        let now = Instant::now();
        assert_eq!(s.next_deadline(), None);
        assert!(s.due(now + ms(10_000)).is_empty());
    }

    #[test]
    fn test_countdown_fires_each_second() {
        let mut s = Scheduler::new(ms(600));
        let t0 = Instant::now();
        s.start_countdown(t0);
        assert!(s.due(t0 + ms(999)).is_empty());
        assert_eq!(s.due(t0 + ms(1000)), vec![TimerEvent::CountdownTick]);
        assert!(s.due(t0 + ms(1500)).is_empty());
        assert_eq!(s.next_deadline(), Some(t0 + ms(2000)));
    }

    #[test]
    fn test_lagging_loop_catches_up() {
        let mut s = Scheduler::new(ms(600));
        let t0 = Instant::now();
        s.start_countdown(t0);
        assert_eq!(s.due(t0 + ms(3200)).len(), 3);
        assert_eq!(s.next_deadline(), Some(t0 + ms(4000)));
    }

    #[test]
    fn test_matches_fire_in_order_after_delay() {
        let mut s = Scheduler::new(ms(600));
        let t0 = Instant::now();
        s.schedule_match(t0);
        s.schedule_match(t0 + ms(100));
        assert!(s.due(t0 + ms(599)).is_empty());
        assert_eq!(s.due(t0 + ms(650)), vec![TimerEvent::MatchReady]);
        assert_eq!(s.pending_matches(), 1);
        assert_eq!(s.due(t0 + ms(700)), vec![TimerEvent::MatchReady]);
        assert_eq!(s.pending_matches(), 0);
    }

    #[test]
    fn test_events_interleave_by_deadline() {
        let mut s = Scheduler::new(ms(600));
        let t0 = Instant::now();
        s.start_countdown(t0);
        s.schedule_match(t0 + ms(200));
        s.schedule_match(t0 + ms(500));
        assert_eq!(
            s.due(t0 + ms(1200)),
            vec![TimerEvent::MatchReady, TimerEvent::CountdownTick, TimerEvent::MatchReady]
        );
    }

    #[test]
    fn test_cancel_all_drops_deadlines() {
        let mut s = Scheduler::new(ms(600));
        let t0 = Instant::now();
        s.start_countdown(t0);
        s.schedule_match(t0);
        s.cancel_all();
        assert!(!s.countdown_running());
        assert_eq!(s.next_deadline(), None);
        assert!(s.due(t0 + ms(5000)).is_empty());
    }

    #[test]
    fn test_zero_delay_fires_immediately() {
        let mut s = Scheduler::new(Duration::ZERO);
        let t0 = Instant::now();
        s.schedule_match(t0);
        assert_eq!(s.due(t0), vec![TimerEvent::MatchReady]);
    }
}
