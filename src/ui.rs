//! Layout and drawing: title screen, board, timer, clear animation, game over.

use crate::game::{GameState, Phase};
use crate::grid::Coord;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns/rows per tile, including a one-cell gap right and below.
const TILE_W: u16 = 6;
const TILE_H: u16 = 2;
/// Glyph offset inside a tile; leaves room for the cursor brackets.
const GLYPH_X: u16 = 2;
/// Timer turns red at or below this many seconds.
const LOW_TIME_SECS: u32 = 10;

/// Presentation state owned by the app, not by the game.
#[derive(Debug, Clone)]
pub struct View {
    pub theme: Theme,
    pub cursor: Coord,
    pub ascii: bool,
    pub time_limit: u32,
    pub fade: Duration,
}

impl View {
    /// Move the keyboard cursor, clamped to the board.
    pub fn move_cursor(&mut self, d_row: isize, d_col: isize, rows: usize, cols: usize) {
        let clamp = |v: usize, d: isize, n: usize| v.saturating_add_signed(d).min(n.saturating_sub(1));
        self.cursor = Coord::new(
            clamp(self.cursor.row, d_row, rows),
            clamp(self.cursor.col, d_col, cols),
        );
    }
}

/// Fade-out for one confirmed pair; built lazily on first draw.
pub struct ClearFx {
    /// Shared with the effect's cell filter so the fade follows falling tiles.
    tiles: Arc<Mutex<[Coord; 2]>>,
    effect: Option<Effect>,
    last_processed: Option<Instant>,
}

impl ClearFx {
    pub fn new(a: Coord, b: Coord) -> Self {
        Self {
            tiles: Arc::new(Mutex::new([a, b])),
            effect: None,
            last_processed: None,
        }
    }

    /// Point the running fade at the pair's new position.
    pub fn retarget(&self, a: Coord, b: Coord) {
        if let Ok(mut tiles) = self.tiles.lock() {
            *tiles = [a, b];
        }
    }
}

/// Screen regions for a board of `rows` x `cols` centred in `area`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    /// Bordered board.
    pub outer: Rect,
    /// Tiles only.
    pub inner: Rect,
    /// Time gauge under the board.
    pub gauge: Rect,
}

pub fn board_layout(area: Rect, rows: usize, cols: usize) -> BoardLayout {
    let w = (cols as u16).saturating_mul(TILE_W).saturating_add(2);
    let h = (rows as u16).saturating_mul(TILE_H).saturating_add(2);
    let total_h = h + 1;
    let outer = Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(total_h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    };
    let inner = Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    };
    let gauge = Rect {
        x: outer.x,
        y: (outer.y + outer.height).min(area.bottom().saturating_sub(1)),
        width: outer.width,
        height: 1,
    };
    BoardLayout { outer, inner, gauge }
}

/// Filled part of a tile (without the gap).
fn tile_rect(inner: Rect, at: Coord) -> Rect {
    Rect {
        x: inner.x + at.col as u16 * TILE_W,
        y: inner.y + at.row as u16 * TILE_H,
        width: TILE_W - 1,
        height: TILE_H - 1,
    }
}

/// Tile under terminal cell (x, y), if any.
pub fn tile_at(layout: &BoardLayout, rows: usize, cols: usize, x: u16, y: u16) -> Option<Coord> {
    if !layout.inner.contains(Position { x, y }) {
        return None;
    }
    let at = Coord::new(
        ((y - layout.inner.y) / TILE_H) as usize,
        ((x - layout.inner.x) / TILE_W) as usize,
    );
    (at.row < rows && at.col < cols).then_some(at)
}

/// Draw the current screen and run clear animations.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    view: &View,
    clear_fx: &mut VecDeque<ClearFx>,
    now: Instant,
) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(view.theme.bg))
        .render(area, frame.buffer_mut());
    match state.phase() {
        Phase::NotStarted => draw_title(frame, view, area),
        Phase::Running => {
            let layout = board_layout(area, state.grid().height(), state.grid().width());
            draw_board(frame, state, view, &layout);
            apply_clear_effects(frame, view, &layout, clear_fx, now);
        }
        Phase::Over => {
            let layout = board_layout(area, state.grid().height(), state.grid().width());
            draw_board(frame, state, view, &layout);
            apply_clear_effects(frame, view, &layout, clear_fx, now);
            draw_game_over(frame, state, view, layout.outer);
        }
    }
}

fn draw_title(frame: &mut Frame, view: &View, area: Rect) {
    let theme = &view.theme;
    let popup_w = 44u16;
    let popup_h = 13u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let fruit: Vec<Span> = crate::grid::Symbol::ALL
        .iter()
        .map(|s| {
            let glyph = if view.ascii { s.letter() } else { s.emoji() };
            Span::styled(format!("{glyph} "), Style::default().fg(theme.tile_color(s.index())))
        })
        .collect();
    let key = Style::default().fg(theme.selected);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Welcome to Tile Connect!", Style::default().fg(theme.title).bold())),
        Line::from(""),
        Line::from(fruit),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "Match adjacent tiles to clear them. Try to get the highest score before {}s run out!",
                view.time_limit
            ),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " [ START GAME ] ",
            Style::default().fg(theme.bg).bg(theme.title).bold(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ENTER ", key),
            Span::from("START   "),
            Span::styled(" Q ", key),
            Span::from("QUIT"),
        ]),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_board(frame: &mut Frame, state: &GameState, view: &View, layout: &BoardLayout) {
    let theme = &view.theme;
    let timer_style = if state.time_left() <= LOW_TIME_SECS {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default().fg(theme.main_fg)
    };
    let title = Line::from(vec![
        Span::styled(" Tile Connect ", Style::default().fg(theme.title).bold()),
        Span::styled(format!(" ⏱ {}s ", state.time_left()), timer_style),
        Span::styled(format!(" ⭐ {} ", state.score()), Style::default().fg(theme.main_fg)),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(title)
        .title_bottom(Line::from(Span::styled(
            " ⏎ pick  r restart  q quit ",
            Style::default().fg(theme.inactive_fg),
        )));
    block.render(layout.outer, frame.buffer_mut());

    let selected = state.selected();
    let running = state.phase() == Phase::Running;
    let buf = frame.buffer_mut();
    for (row, cells) in state.grid().rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let at = Coord::new(row, col);
            let r = tile_rect(layout.inner, at).intersection(layout.inner);
            if r.is_empty() {
                continue;
            }
            let bg = if selected == Some(at) { theme.selected } else { theme.tile_bg };
            buf.set_style(r, Style::default().bg(bg));
            if let Some(symbol) = cell.symbol() {
                let (glyph, fg) = if view.ascii {
                    (symbol.letter(), theme.tile_color(symbol.index()))
                } else {
                    (symbol.emoji(), theme.main_fg)
                };
                buf.set_stringn(
                    r.x + GLYPH_X,
                    r.y,
                    glyph,
                    r.width.saturating_sub(GLYPH_X) as usize,
                    Style::default().fg(fg).bg(bg).bold(),
                );
            }
            if running && view.cursor == at {
                let cursor = Style::default().fg(theme.title).bg(bg).bold();
                buf.set_stringn(r.x, r.y, "[", r.width as usize, cursor);
                if r.width >= TILE_W - 1 {
                    buf.set_string(r.x + TILE_W - 2, r.y, "]", cursor);
                }
            }
        }
    }

    let ratio = (state.time_left() as f64 / view.time_limit.max(1) as f64).min(1.0);
    let bar_color = if state.time_left() <= LOW_TIME_SECS {
        Color::Red
    } else if ratio < 0.5 {
        Color::Yellow
    } else {
        Color::Green
    };
    Gauge::default()
        .ratio(ratio)
        .label(format!("{}s", state.time_left()))
        .gauge_style(Style::default().fg(bar_color).bg(theme.tile_bg))
        .render(layout.gauge, frame.buffer_mut());
}

/// True if `pos` lies on the filled part of any of `tiles`.
fn covers(inner: Rect, tiles: &[Coord], pos: Position) -> bool {
    tiles
        .iter()
        .any(|&at| tile_rect(inner, at).intersection(inner).contains(pos))
}

/// Fade each pending pair to the background over the match delay (TachyonFX).
fn apply_clear_effects(
    frame: &mut Frame,
    view: &View,
    layout: &BoardLayout,
    clear_fx: &mut VecDeque<ClearFx>,
    now: Instant,
) {
    let fade_ms = view.fade.as_millis().min(u32::MAX as u128) as u32;
    for fx_state in clear_fx.iter_mut() {
        let delta = fx_state
            .last_processed
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::ZERO);
        let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
        fx_state.last_processed = Some(now);

        if fx_state.effect.is_none() {
            let tiles = Arc::clone(&fx_state.tiles);
            let inner = layout.inner;
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
                tiles.lock().is_ok_and(|t| covers(inner, &t[..], pos))
            }));
            let bg = view.theme.bg;
            let effect = fx::fade_to(bg, bg, (fade_ms, Interpolation::Linear))
                .with_filter(filter)
                .with_area(layout.inner);
            fx_state.effect = Some(effect);
        }
        if let Some(effect) = fx_state.effect.as_mut() {
            frame.render_effect(effect, layout.inner, TfxDuration::from_millis(delta_ms));
        }
    }
}

fn draw_game_over(frame: &mut Frame, state: &GameState, view: &View, board: Rect) {
    let theme = &view.theme;
    let popup_w = 30u16.min(board.width);
    let popup_h = 9u16.min(board.height);
    let popup = Rect {
        x: board.x + board.width.saturating_sub(popup_w) / 2,
        y: board.y + board.height.saturating_sub(popup_h) / 2,
        width: popup_w,
        height: popup_h,
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Game Over ", Style::default().fg(Color::White).bg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Your Score: {} ⭐ ", state.score()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Matches: {} ", state.matches()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(" R  Restart    Q  Quit ", Style::default().fg(theme.main_fg))),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .style(Style::default().bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> View {
        View {
            theme: Theme::default(),
            cursor: Coord::new(0, 0),
            ascii: true,
            time_limit: 60,
            fade: Duration::from_millis(600),
        }
    }

    #[test]
    fn test_board_is_centred() {
        let area = Rect::new(0, 0, 80, 30);
        let layout = board_layout(area, 9, 6);
        assert_eq!(layout.outer.width, 6 * TILE_W + 2);
        assert_eq!(layout.outer.height, 9 * TILE_H + 2);
        assert_eq!(layout.outer.x, (80 - layout.outer.width) / 2);
        assert_eq!(layout.gauge.y, layout.outer.bottom());
        assert_eq!(layout.inner.x, layout.outer.x + 1);
    }

    #[test]
    fn test_tile_at_maps_clicks() {
        let layout = board_layout(Rect::new(0, 0, 80, 30), 9, 6);
        let inner = layout.inner;
        assert_eq!(tile_at(&layout, 9, 6, inner.x, inner.y), Some(Coord::new(0, 0)));
        assert_eq!(
            tile_at(&layout, 9, 6, inner.x + 2 * TILE_W + 3, inner.y + 4 * TILE_H),
            Some(Coord::new(4, 2))
        );
        assert_eq!(
            tile_at(&layout, 9, 6, inner.right() - 1, inner.bottom() - 1),
            Some(Coord::new(8, 5))
        );
        // Border and outside.
        assert_eq!(tile_at(&layout, 9, 6, layout.outer.x, layout.outer.y), None);
        assert_eq!(tile_at(&layout, 9, 6, 0, 0), None);
    }

    #[test]
    fn test_cursor_clamps_to_board() {
        let mut v = view();
        v.move_cursor(-1, -1, 9, 6);
        assert_eq!(v.cursor, Coord::new(0, 0));
        v.move_cursor(20, 20, 9, 6);
        assert_eq!(v.cursor, Coord::new(8, 5));
        v.move_cursor(-1, 0, 9, 6);
        assert_eq!(v.cursor, Coord::new(7, 5));
    }

    #[test]
    fn test_covers_filled_area_only() {
        let inner = Rect::new(1, 1, 6 * TILE_W, 9 * TILE_H);
        let tiles = [Coord::new(0, 0)];
        let hits = (0..inner.right())
            .flat_map(|x| (0..inner.bottom()).map(move |y| Position { x, y }))
            .filter(|&pos| covers(inner, &tiles, pos))
            .count();
        assert_eq!(hits, ((TILE_W - 1) * (TILE_H - 1)) as usize);
        assert!(covers(inner, &tiles, Position { x: 1, y: 1 }));
        assert!(!covers(inner, &tiles, Position { x: 1 + TILE_W - 1, y: 1 }));
    }

    #[test]
    fn test_retarget_moves_fade() {
        let inner = Rect::new(1, 1, 6 * TILE_W, 9 * TILE_H);
        let fx = ClearFx::new(Coord::new(0, 0), Coord::new(0, 1));
        fx.retarget(Coord::new(2, 0), Coord::new(2, 1));
        let tiles = *fx.tiles.lock().unwrap();
        assert!(covers(inner, &tiles, Position { x: 1, y: 1 + 2 * TILE_H }));
        assert!(!covers(inner, &tiles, Position { x: 1, y: 1 }));
    }
}
