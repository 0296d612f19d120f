//! Tile Connect — timed fruit tile-matching puzzle in the terminal.

mod app;
mod game;
mod grid;
mod input;
mod rules;
mod schedule;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_ROWS: usize = 9;
pub const DEFAULT_COLS: usize = 6;
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 60;
pub const MATCH_SCORE: u32 = 5;
pub const MATCH_TIME_BONUS_SECS: u32 = 1;
pub const DEFAULT_MATCH_DELAY_MS: u64 = 600;
/// Largest board that still fits a sensible terminal.
pub const MAX_DIMENSION: usize = 32;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    /// Starting countdown, seconds.
    pub time_limit: u32,
    pub match_score: u32,
    /// Seconds added per cleared pair.
    pub match_time_bonus: u32,
    pub match_delay_ms: u64,
    pub no_animation: bool,
    pub seed: Option<u64>,
    pub ascii: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            time_limit: DEFAULT_TIME_LIMIT_SECS,
            match_score: MATCH_SCORE,
            match_time_bonus: MATCH_TIME_BONUS_SECS,
            match_delay_ms: DEFAULT_MATCH_DELAY_MS,
            no_animation: false,
            seed: None,
            ascii: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid must be between 1x1 and {max}x{max}, got {rows}x{cols}", max = MAX_DIMENSION)]
    Dimensions { rows: usize, cols: usize },
    #[error("time limit must be at least one second")]
    ZeroTimeLimit,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = Self {
            rows: args.rows,
            cols: args.cols,
            time_limit: args.time_limit,
            match_delay_ms: args.match_delay_ms,
            no_animation: args.no_animation,
            seed: args.seed,
            ascii: args.ascii,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |n: usize| (1..=MAX_DIMENSION).contains(&n);
        if !in_range(self.rows) || !in_range(self.cols) {
            return Err(ConfigError::Dimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.time_limit == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        Ok(())
    }

    /// Delay between confirming a pair and clearing it; zero without animation.
    pub fn match_delay(&self) -> Duration {
        if self.no_animation {
            Duration::ZERO
        } else {
            Duration::from_millis(self.match_delay_ms)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let config = GameConfig::from_args(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!(error = %e, "theme not loaded, using defaults");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let mut app = App::new(&config, theme);
    app.run()?;
    Ok(())
}

/// Send tracing output to `path`; the terminal itself belongs to the game.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let log_file = std::fs::File::create(path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Timed fruit tile-matching puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tileconnect",
    version,
    about = "Timed fruit tile-matching puzzle in the terminal. Pair matching tiles to clear them before time runs out.",
    long_about = "Tile Connect is a terminal puzzle game.\n\n\
        Pick two tiles with the same fruit that are next to each other (or both sit \
        on the top edge of their columns, in different columns) to clear them. Tiles \
        above fall down and new fruit drops in. Each pair scores 5 points and adds one \
        second to the clock.\n\n\
        CONTROLS:\n  Mouse click   Pick tile\n  Arrows / hjkl Move cursor   Enter/Space Pick tile / start\n  R             Restart      Q / Esc     Quit"
)]
pub struct Args {
    /// Grid rows.
    #[arg(long, default_value_t = DEFAULT_ROWS, value_name = "N")]
    pub rows: usize,

    /// Grid columns.
    #[arg(long, default_value_t = DEFAULT_COLS, value_name = "N")]
    pub cols: usize,

    /// Starting time budget in seconds.
    #[arg(long, default_value_t = DEFAULT_TIME_LIMIT_SECS, value_name = "SECS")]
    pub time_limit: u32,

    /// How long a matched pair fades before it is cleared.
    #[arg(long, default_value_t = DEFAULT_MATCH_DELAY_MS, value_name = "MS")]
    pub match_delay_ms: u64,

    /// Disable the clear animation (pairs clear immediately).
    #[arg(long)]
    pub no_animation: bool,

    /// Seed for the fruit generator (same seed, same boards).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Draw letters instead of fruit emoji.
    #[arg(long)]
    pub ascii: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Tile colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
