// ── Composed screen ──
//
// What a render pass produces. Drawing it is the display collaborator's
// job; the frame only names colours and text.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Default,
    White,
    Black,
    Green,
    Yellow,
    Red,
    Grey,
    Blue,
}

/// Secondary text shown beside an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuxText {
    pub text: String,
    pub fg: Color,
    pub bg: Color,
}

impl AuxText {
    pub fn new(text: impl Into<String>, fg: Color) -> Self {
        Self {
            text: text.into(),
            fg,
            bg: Color::Default,
        }
    }

    /// A colour swatch without text (status indicators).
    pub fn swatch(color: Color) -> Self {
        Self {
            text: String::new(),
            fg: color,
            bg: color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameItem {
    pub text: String,
    pub aux: Option<AuxText>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameLine {
    pub text: String,
    pub color: Color,
}

impl FrameLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Color::Default,
        }
    }

    pub fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// One composed screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub title: String,
    pub items: Vec<FrameItem>,
    /// Free-form content painted by the page's render hook.
    pub body: Vec<FrameLine>,
    /// Countdown label and `mm:ss` readout.
    pub countdown: Option<(String, String)>,
    /// Alert strip (e.g. "Unavailable!").
    pub banner: Option<FrameLine>,
}

impl Frame {
    pub fn line(&mut self, text: impl Into<String>) {
        self.body.push(FrameLine::new(text));
    }

    pub fn line_colored(&mut self, text: impl Into<String>, color: Color) {
        self.body.push(FrameLine::colored(text, color));
    }
}
