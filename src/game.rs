//! Game state: grid, session lifecycle, countdown, selection and pending matches.

use crate::GameConfig;
use crate::grid::{Coord, Grid};
use crate::rules::is_valid_match;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    Over,
}

/// What happened to a tile pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Session not running; nothing changed.
    Ignored,
    /// First tile of a pair remembered.
    Picked(Coord),
    /// Pair confirmed; the caller must schedule `apply_match`.
    Matched(Coord, Coord),
    /// Pair rejected; selection cleared.
    Missed,
}

/// Result of applying the oldest pending match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Tiles cleared, score and time awarded.
    Cleared(Coord, Coord),
    /// An earlier collapse moved the tiles; dropped without reward.
    Stale(Coord, Coord),
}

/// Game state: grid, score, remaining time, selection, pending matches.
#[derive(Debug)]
pub struct GameState {
    grid: Grid,
    phase: Phase,
    score: u32,
    /// Seconds left on the countdown.
    time_left: u32,
    matches: u32,
    selection: Option<Coord>,
    /// Confirmed pairs waiting for their clear animation, oldest first.
    pending: VecDeque<(Coord, Coord)>,
    rng: StdRng,
    rows: usize,
    cols: usize,
    time_limit: u32,
    match_score: u32,
    match_time_bonus: u32,
}

impl GameState {
    pub fn new(config: &GameConfig, mut rng: StdRng) -> Self {
        let grid = Grid::generate(config.rows, config.cols, &mut rng);
        Self {
            grid,
            phase: Phase::NotStarted,
            score: 0,
            time_left: config.time_limit,
            matches: 0,
            selection: None,
            pending: VecDeque::new(),
            rng,
            rows: config.rows,
            cols: config.cols,
            time_limit: config.time_limit,
            match_score: config.match_score,
            match_time_bonus: config.match_time_bonus,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    /// Pairs cleared this session.
    pub fn matches(&self) -> u32 {
        self.matches
    }

    /// Tile picked as the first half of a pair, if any.
    pub fn selected(&self) -> Option<Coord> {
        self.selection
    }

    /// Tiles waiting for their clear animation.
    pub fn animating(&self) -> impl Iterator<Item = Coord> + '_ {
        self.pending.iter().flat_map(|&(a, b)| [a, b])
    }

    pub fn is_animating(&self, at: Coord) -> bool {
        self.animating().any(|c| c == at)
    }

    pub fn pending_matches(&self) -> usize {
        self.pending.len()
    }

    /// Pending pairs, oldest first, at their current positions.
    pub fn pending_pairs(&self) -> impl Iterator<Item = (Coord, Coord)> + '_ {
        self.pending.iter().copied()
    }

    /// NotStarted -> Running. Returns false if the session was not waiting to start.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::NotStarted {
            return false;
        }
        self.phase = Phase::Running;
        info!(time_left = self.time_left, "game started");
        true
    }

    /// One elapsed second. Returns false when the countdown is not running.
    pub fn tick(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.end();
        }
        true
    }

    /// Pairs confirmed before time ran out stay queued and still score.
    fn end(&mut self) {
        self.phase = Phase::Over;
        self.selection = None;
        info!(
            score = self.score,
            matches = self.matches,
            pending = self.pending.len(),
            "game over"
        );
    }

    /// Any state -> NotStarted with a fresh grid and full time budget.
    pub fn restart(&mut self) {
        self.grid = Grid::generate(self.rows, self.cols, &mut self.rng);
        self.phase = Phase::NotStarted;
        self.score = 0;
        self.time_left = self.time_limit;
        self.matches = 0;
        self.selection = None;
        self.pending.clear();
        info!("game restarted");
    }

    /// Player picked `at`. The second pick of a pair is checked against the
    /// match rule and the selection is cleared whatever the result.
    pub fn select_tile(&mut self, at: Coord) -> SelectOutcome {
        if self.phase != Phase::Running {
            return SelectOutcome::Ignored;
        }
        self.grid.assert_contains(at);
        let Some(first) = self.selection.take() else {
            self.selection = Some(at);
            return SelectOutcome::Picked(at);
        };
        if self.is_animating(first) || self.is_animating(at) {
            debug!(%first, second = %at, "pair touches a clearing tile");
            return SelectOutcome::Missed;
        }
        if is_valid_match(&self.grid, first, at) {
            self.pending.push_back((first, at));
            debug!(%first, second = %at, pending = self.pending.len(), "match confirmed");
            SelectOutcome::Matched(first, at)
        } else {
            SelectOutcome::Missed
        }
    }

    /// Finish the oldest pending match: collapse the grid and award score and time.
    /// After game over the score still counts but the clock stays at zero.
    /// Returns None when nothing is pending.
    pub fn apply_match(&mut self) -> Option<ApplyOutcome> {
        let (a, b) = self.pending.pop_front()?;
        if self.phase == Phase::NotStarted || !is_valid_match(&self.grid, a, b) {
            debug!(%a, %b, "stale match dropped");
            return Some(ApplyOutcome::Stale(a, b));
        }
        let refilled = self.grid.collapse(a, b, &mut self.rng);
        debug_assert_eq!(self.grid.empty_count(), 0);
        self.follow_collapse(a, b);
        self.score += self.match_score;
        if self.phase == Phase::Running {
            self.time_left += self.match_time_bonus;
        }
        self.matches += 1;
        debug!(%a, %b, refilled, score = self.score, time_left = self.time_left, "match cleared");
        Some(ApplyOutcome::Cleared(a, b))
    }

    /// Move queued pairs and the selection along with their tiles after `a` and
    /// `b` were cleared. A tile falls one row for every cleared cell below it in
    /// its column.
    fn follow_collapse(&mut self, a: Coord, b: Coord) {
        let follow = |at: Coord| {
            let fallen = [a, b]
                .iter()
                .filter(|c| c.col == at.col && c.row > at.row)
                .count();
            Coord::new(at.row + fallen, at.col)
        };
        for pair in &mut self.pending {
            *pair = (follow(pair.0), follow(pair.1));
        }
        self.selection = self
            .selection
            .filter(|&at| at != a && at != b)
            .map(follow);
    }
}
