//! Map CSS-like style properties onto terminal styling.
//!
//! The terminal can only approximate a browser button: colours map to
//! foreground/background, pixel padding is scaled down to cells and a non-zero
//! border radius selects rounded border glyphs. Anything that does not parse is
//! ignored here but stays in the style state.

use crate::style::StyleState;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{BorderType, Padding};
use std::str::FromStr;

/// Pixels per terminal column when scaling horizontal lengths.
const PX_PER_COLUMN: f32 = 5.0;
/// Pixels per terminal row when scaling vertical lengths.
const PX_PER_ROW: f32 = 10.0;
const MAX_PAD_COLUMNS: u16 = 12;
const MAX_PAD_ROWS: u16 = 3;

/// How the target button is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonLook {
    pub style: Style,
    pub padding: Padding,
    pub border: Option<BorderType>,
}

impl ButtonLook {
    pub fn from_styles(styles: &StyleState) -> Self {
        let mut style = Style::default();
        if let Some(bg) = styles.property("backgroundColor").and_then(parse_color) {
            style = style.bg(bg);
        }
        if let Some(fg) = styles.property("color").and_then(parse_color) {
            style = style.fg(fg);
        }
        if styles.property("fontWeight").is_some_and(is_bold) {
            style = style.add_modifier(Modifier::BOLD);
        }
        if styles.property("fontStyle") == Some("italic") {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if styles
            .property("textDecoration")
            .is_some_and(|d| d.contains("underline"))
        {
            style = style.add_modifier(Modifier::UNDERLINED);
        }

        let padding = styles
            .property("padding")
            .map(parse_padding)
            .unwrap_or(Padding::ZERO);

        let rounded = styles
            .property("borderRadius")
            .and_then(parse_px)
            .is_some_and(|px| px > 0.0);
        let border = if rounded {
            Some(BorderType::Rounded)
        } else if styles.property("border").is_some_and(|b| b != "none") {
            Some(BorderType::Plain)
        } else {
            None
        };

        Self {
            style,
            padding,
            border,
        }
    }

    /// Outer size needed to draw `label` with this look.
    pub fn size(&self, label: &str) -> (u16, u16) {
        let frame = if self.border.is_some() { 2 } else { 0 };
        let width = label.chars().count() as u16 + self.padding.left + self.padding.right + frame;
        let height = 1 + self.padding.top + self.padding.bottom + frame;
        (width, height)
    }
}

/// Parse a CSS colour: `#rgb`, `#rrggbb`, `rgb(r, g, b)` or a name.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = value
        .strip_prefix("rgb(")
        .or_else(|| value.strip_prefix("rgba("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels: Vec<u8> = args
            .split(',')
            .take(3)
            .filter_map(|c| c.trim().parse().ok())
            .collect();
        return match channels[..] {
            [r, g, b] => Some(Color::Rgb(r, g, b)),
            _ => None,
        };
    }
    css_named(&value).or_else(|| Color::from_str(&value).ok())
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// CSS names the terminal palette does not know about.
fn css_named(name: &str) -> Option<Color> {
    let rgb = match name {
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "lime" => (0, 255, 0),
        "silver" => (192, 192, 192),
        "brown" => (165, 42, 42),
        "gold" => (255, 215, 0),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "transparent" => return Some(Color::Reset),
        _ => return None,
    };
    Some(Color::Rgb(rgb.0, rgb.1, rgb.2))
}

fn is_bold(weight: &str) -> bool {
    match weight.trim() {
        "bold" | "bolder" => true,
        other => other.parse::<u16>().is_ok_and(|w| w >= 600),
    }
}

/// Parse a single length such as `6px`, `6` or `0.5rem` into pixels.
fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    if let Some(px) = value.strip_suffix("px") {
        px.trim().parse().ok()
    } else if let Some(rem) = value.strip_suffix("rem").or_else(|| value.strip_suffix("em")) {
        rem.trim().parse::<f32>().ok().map(|r| r * 16.0)
    } else {
        value.parse().ok()
    }
}

/// CSS padding shorthand (1 to 4 values) scaled down to cells.
fn parse_padding(value: &str) -> Padding {
    let px: Vec<f32> = value.split_whitespace().filter_map(parse_px).collect();
    let (top, right, bottom, left) = match px[..] {
        [all] => (all, all, all, all),
        [vertical, horizontal] => (vertical, horizontal, vertical, horizontal),
        [top, horizontal, bottom] => (top, horizontal, bottom, horizontal),
        [top, right, bottom, left] => (top, right, bottom, left),
        _ => return Padding::ZERO,
    };
    let columns = |px: f32| ((px / PX_PER_COLUMN).round() as u16).min(MAX_PAD_COLUMNS);
    let rows = |px: f32| ((px / PX_PER_ROW).round() as u16).min(MAX_PAD_ROWS);
    Padding::new(columns(left), columns(right), rows(top), rows(bottom))
}
