//! App: terminal init, main loop, timers, key and mouse handling.

use crate::GameConfig;
use crate::game::{ApplyOutcome, GameState, Phase, SelectOutcome};
use crate::grid::Coord;
use crate::input::{Action, key_to_action, left_click};
use crate::schedule::{Scheduler, TimerEvent};
use crate::theme::Theme;
use crate::ui::{self, ClearFx, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Redraw interval while a clear animation is playing.
const FRAME: Duration = Duration::from_millis(16);
/// Longest input wait when no timer is armed.
const IDLE_POLL: Duration = Duration::from_millis(500);

pub struct App {
    state: GameState,
    view: View,
    scheduler: Scheduler,
    /// One fade per pending match, same order as the game's queue.
    clear_fx: VecDeque<ClearFx>,
    animate: bool,
}

impl App {
    pub fn new(config: &GameConfig, theme: Theme) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let delay = config.match_delay();
        Self {
            state: GameState::new(config, rng),
            view: View {
                theme,
                cursor: Coord::new(0, 0),
                ascii: config.ascii,
                time_limit: config.time_limit,
                fade: delay,
            },
            scheduler: Scheduler::new(delay),
            clear_fx: VecDeque::new(),
            animate: !delay.is_zero(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        info!(
            rows = self.state.grid().height(),
            cols = self.state.grid().width(),
            "terminal ready"
        );

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        terminal.show_cursor()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            self.fire_timers(now);

            let mut board = None;
            terminal.draw(|f| {
                let area = f.area();
                board = Some(ui::board_layout(area, self.state.grid().height(), self.state.grid().width()));
                ui::draw(f, &self.state, &self.view, &mut self.clear_fx, now);
            })?;

            if !event::poll(self.poll_timeout(Instant::now()))? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let now = Instant::now();
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !self.handle_action(key_to_action(key), now) {
                            return Ok(());
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let (Some((x, y)), Some(layout)) = (left_click(mouse), board.as_ref()) {
                            self.handle_click(layout, x, y, now);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Wait for input until the next frame or timer, whichever comes first.
    fn poll_timeout(&self, now: Instant) -> Duration {
        let cap = if self.clear_fx.is_empty() { IDLE_POLL } else { FRAME };
        self.scheduler
            .next_deadline()
            .map(|at| at.saturating_duration_since(now))
            .map_or(cap, |wait| wait.min(cap))
    }

    /// Returns false when the player quits.
    fn handle_action(&mut self, action: Action, now: Instant) -> bool {
        let (rows, cols) = (self.state.grid().height(), self.state.grid().width());
        match action {
            Action::Quit => return false,
            Action::Restart => self.restart(),
            Action::Confirm => match self.state.phase() {
                Phase::NotStarted => self.start(now),
                Phase::Running => self.pick(self.view.cursor, now),
                Phase::Over => {}
            },
            Action::Up => self.view.move_cursor(-1, 0, rows, cols),
            Action::Down => self.view.move_cursor(1, 0, rows, cols),
            Action::Left => self.view.move_cursor(0, -1, rows, cols),
            Action::Right => self.view.move_cursor(0, 1, rows, cols),
            Action::None => {}
        }
        true
    }

    fn handle_click(&mut self, layout: &ui::BoardLayout, x: u16, y: u16, now: Instant) {
        match self.state.phase() {
            Phase::NotStarted => self.start(now),
            Phase::Running => {
                let (rows, cols) = (self.state.grid().height(), self.state.grid().width());
                if let Some(at) = ui::tile_at(layout, rows, cols, x, y) {
                    self.view.cursor = at;
                    self.pick(at, now);
                }
            }
            Phase::Over => {}
        }
    }

    fn start(&mut self, now: Instant) {
        if self.state.start() {
            self.scheduler.start_countdown(now);
        }
    }

    fn restart(&mut self) {
        self.scheduler.cancel_all();
        self.clear_fx.clear();
        self.state.restart();
        self.view.cursor = Coord::new(0, 0);
    }

    fn pick(&mut self, at: Coord, now: Instant) {
        match self.state.select_tile(at) {
            SelectOutcome::Matched(a, b) => {
                self.scheduler.schedule_match(now);
                if self.animate {
                    self.clear_fx.push_back(ClearFx::new(a, b));
                }
            }
            SelectOutcome::Missed => debug!(%at, "no match"),
            SelectOutcome::Picked(_) | SelectOutcome::Ignored => {}
        }
    }

    /// Run every timer callback that is due, oldest first.
    fn fire_timers(&mut self, now: Instant) {
        for event in self.scheduler.due(now) {
            match event {
                TimerEvent::CountdownTick => {
                    self.state.tick();
                    // Pending clears still land after time runs out.
                    if self.state.phase() == Phase::Over {
                        self.scheduler.stop_countdown();
                    }
                }
                TimerEvent::MatchReady => {
                    self.clear_fx.pop_front();
                    match self.state.apply_match() {
                        Some(ApplyOutcome::Cleared(..)) => {
                            for (fx, (a, b)) in self.clear_fx.iter().zip(self.state.pending_pairs()) {
                                fx.retarget(a, b);
                            }
                        }
                        Some(ApplyOutcome::Stale(a, b)) => debug!(%a, %b, "queued match no longer valid"),
                        None => {}
                    }
                }
            }
        }
        debug_assert_eq!(self.scheduler.pending_matches(), self.state.pending_matches());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(config: GameConfig) -> App {
        App::new(&config, Theme::default())
    }

    /// First pair of equal neighbours on the board.
    fn matching_pair(state: &GameState) -> (Coord, Coord) {
        let grid = state.grid();
        for row in 0..grid.height() {
            for col in 0..grid.width() {
                let a = Coord::new(row, col);
                for b in [Coord::new(row, col + 1), Coord::new(row + 1, col)] {
                    if grid.contains(b) && crate::rules::is_valid_match(grid, a, b) {
                        return (a, b);
                    }
                }
            }
        }
        panic!("seeded board has no adjacent pair");
    }

    fn seeded() -> GameConfig {
        GameConfig {
            seed: Some(3),
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_confirm_starts_countdown() {
        let mut app = app(seeded());
        let t0 = Instant::now();
        assert!(app.handle_action(Action::Confirm, t0));
        assert_eq!(app.state.phase(), Phase::Running);
        app.fire_timers(t0 + Duration::from_millis(3000));
        assert_eq!(app.state.time_left(), 57);
    }

    #[test]
    fn test_quit_stops_loop() {
        let mut app = app(seeded());
        assert!(!app.handle_action(Action::Quit, Instant::now()));
    }

    #[test]
    fn test_countdown_reaches_game_over() {
        let mut app = app(GameConfig {
            time_limit: 2,
            ..seeded()
        });
        let t0 = Instant::now();
        app.handle_action(Action::Confirm, t0);
        app.fire_timers(t0 + Duration::from_secs(5));
        assert_eq!(app.state.phase(), Phase::Over);
        assert_eq!(app.state.time_left(), 0);
        assert!(!app.scheduler.countdown_running());
    }

    #[test]
    fn test_last_second_match_lands_after_game_over() {
        let mut app = app(GameConfig {
            time_limit: 1,
            ..seeded()
        });
        let t0 = Instant::now();
        app.handle_action(Action::Confirm, t0);
        let (a, b) = matching_pair(&app.state);
        let late = t0 + Duration::from_millis(900);
        app.pick(a, late);
        app.pick(b, late);
        app.fire_timers(t0 + Duration::from_secs(1));
        assert_eq!(app.state.phase(), Phase::Over);
        assert!(!app.scheduler.countdown_running());
        assert_eq!(app.scheduler.pending_matches(), 1);

        app.fire_timers(t0 + Duration::from_millis(1500));
        assert_eq!(app.state.score(), 5);
        assert_eq!(app.state.time_left(), 0);
        assert_eq!(app.scheduler.next_deadline(), None);
    }

    #[test]
    fn test_restart_cancels_timers() {
        let mut app = app(seeded());
        let t0 = Instant::now();
        app.handle_action(Action::Confirm, t0);
        app.scheduler.schedule_match(t0);
        app.handle_action(Action::Restart, t0);
        assert_eq!(app.state.phase(), Phase::NotStarted);
        assert_eq!(app.scheduler.next_deadline(), None);
        app.fire_timers(t0 + Duration::from_secs(10));
        assert_eq!(app.state.time_left(), 60);
    }

    #[test]
    fn test_cursor_moves_and_confirm_picks() {
        let mut app = app(seeded());
        let t0 = Instant::now();
        app.handle_action(Action::Confirm, t0);
        app.handle_action(Action::Down, t0);
        app.handle_action(Action::Right, t0);
        app.handle_action(Action::Confirm, t0);
        assert_eq!(app.state.selected(), Some(Coord::new(1, 1)));
    }

    #[test]
    fn test_click_on_title_starts_game() {
        let mut app = app(seeded());
        let layout = ui::board_layout(ratatui::layout::Rect::new(0, 0, 80, 30), 9, 6);
        app.handle_click(&layout, 0, 0, Instant::now());
        assert_eq!(app.state.phase(), Phase::Running);
    }

    #[test]
    fn test_poll_timeout_bounded_by_deadline() {
        let mut app = app(seeded());
        let t0 = Instant::now();
        assert_eq!(app.poll_timeout(t0), IDLE_POLL);
        app.handle_action(Action::Confirm, t0);
        assert_eq!(app.poll_timeout(t0 + Duration::from_millis(900)), Duration::from_millis(100));
    }
}
