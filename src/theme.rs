//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark defaults: tile accents, then bg, tile_bg, div_line, main_fg, title, selected, inactive_fg.
const ONEDARK_TILES: [&str; 6] = ["#E06C75", "#E5C07B", "#61AFEF", "#D19A66", "#C678DD", "#98C379"];
const ONEDARK_BG: &str = "#282C34";
const ONEDARK_TILE_BG: &str = "#31353F";
const ONEDARK_DIV_LINE: &str = "#3F444F";
const ONEDARK_MAIN_FG: &str = "#ABB2BF";
const ONEDARK_TITLE: &str = "#E5C07B";
const ONEDARK_SELECTED: &str = "#56B6C2";
const ONEDARK_INACTIVE_FG: &str = "#5C6370";

/// Colours for the board and its chrome.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Per-symbol accent (index = `Symbol::index`): letter colour in ASCII mode.
    pub tiles: [Color; 6],
    /// Screen background.
    pub bg: Color,
    /// Unselected tile background.
    pub tile_bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, timer).
    pub main_fg: Color,
    /// Titles.
    pub title: Color,
    /// Background of the picked tile.
    pub selected: Color,
    /// Hints and keyboard cursor.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

fn rgb(hex: &str) -> Color {
    parse_hex(hex).unwrap_or(Color::Reset)
}

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            tiles: ONEDARK_TILES.map(rgb),
            bg: rgb(ONEDARK_BG),
            tile_bg: rgb(ONEDARK_TILE_BG),
            div_line: rgb(ONEDARK_DIV_LINE),
            main_fg: rgb(ONEDARK_MAIN_FG),
            title: rgb(ONEDARK_TITLE),
            selected: rgb(ONEDARK_SELECTED),
            inactive_fg: rgb(ONEDARK_INACTIVE_FG),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark if path is None or the file does not exist.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override tile accents for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tiles = ["#FF0000", "#FFFF00", "#0088FF", "#FF8800", "#FF00FF", "#00FF00"].map(rgb);
                self.selected = rgb("#FFFFFF");
            }
            crate::Palette::Colorblind => {
                // Tol bright scheme.
                self.tiles = ["#EE6677", "#CCBB44", "#4477AA", "#EE7733", "#AA3377", "#228833"].map(rgb);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let tile_keys = [
            ["cpu_end", "temp_end"],
            ["title", "cpu_mid"],
            ["cpu_box", "hi_fg"],
            ["used_end", "download_end"],
            ["net_box", "upload_end"],
            ["mem_box", "cpu_start"],
        ];
        let mut tiles = ONEDARK_TILES.map(rgb);
        for (slot, [key, alt]) in tiles.iter_mut().zip(tile_keys) {
            if let Some(c) = get(key).or_else(|| get(alt)) {
                *slot = c;
            }
        }
        Self {
            tiles,
            bg: get("main_bg").unwrap_or_else(|| rgb(ONEDARK_BG)),
            tile_bg: get("meter_bg").unwrap_or_else(|| rgb(ONEDARK_TILE_BG)),
            div_line: get("div_line").unwrap_or_else(|| rgb(ONEDARK_DIV_LINE)),
            main_fg: get("main_fg").unwrap_or_else(|| rgb(ONEDARK_MAIN_FG)),
            title: get("title").unwrap_or_else(|| rgb(ONEDARK_TITLE)),
            selected: get("selected_bg").unwrap_or_else(|| rgb(ONEDARK_SELECTED)),
            inactive_fg: get("inactive_fg").unwrap_or_else(|| rgb(ONEDARK_INACTIVE_FG)),
        }
    }

    /// Accent colour for a symbol index (0..6).
    #[inline]
    pub fn tile_color(&self, index: u8) -> Color {
        self.tiles[(index as usize) % 6]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
