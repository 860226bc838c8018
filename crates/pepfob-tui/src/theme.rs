//! Palette and semantic styling for the simulated display.

use ratatui::style::{Color, Modifier, Style};

use pepfob_core::Color as DeviceColor;

// ── Core Palette ──────────────────────────────────────────────────────

pub const ELECTRIC_PURPLE: Color = Color::Rgb(225, 53, 255); // #e135ff
pub const NEON_CYAN: Color = Color::Rgb(128, 255, 234); // #80ffea
pub const ELECTRIC_YELLOW: Color = Color::Rgb(241, 250, 140); // #f1fa8c
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99); // #ff6363

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 42, 54); // #282a36
pub const LIGHT_BLUE: Color = Color::Rgb(139, 233, 253); // #8be9fd

/// Map a device colour onto the terminal palette. `Default` defers to
/// the surrounding style.
pub fn device(color: DeviceColor) -> Option<Color> {
    match color {
        DeviceColor::Default => None,
        DeviceColor::White => Some(Color::White),
        DeviceColor::Black => Some(Color::Black),
        DeviceColor::Green => Some(SUCCESS_GREEN),
        DeviceColor::Yellow => Some(ELECTRIC_YELLOW),
        DeviceColor::Red => Some(ERROR_RED),
        DeviceColor::Grey => Some(BORDER_GRAY),
        DeviceColor::Blue => Some(LIGHT_BLUE),
    }
}

/// `base` recoloured with a device foreground and background.
pub fn device_style(base: Style, fg: DeviceColor, bg: DeviceColor) -> Style {
    let mut style = base;
    if let Some(fg) = device(fg) {
        style = style.fg(fg);
    }
    if let Some(bg) = device(bg) {
        style = style.bg(bg);
    }
    style
}

// ── Semantic Styles ───────────────────────────────────────────────────

pub fn title_style() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(ELECTRIC_PURPLE)
}

pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

pub fn item() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// The highlighted menu item.
pub fn item_selected() -> Style {
    Style::default()
        .fg(ELECTRIC_PURPLE)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

pub fn countdown() -> Style {
    Style::default().fg(ELECTRIC_YELLOW).add_modifier(Modifier::BOLD)
}

pub fn banner() -> Style {
    Style::default().fg(Color::Black).bg(ERROR_RED).add_modifier(Modifier::BOLD)
}

/// Key hint text (e.g., "q quit").
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}
