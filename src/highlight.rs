//! Word highlight colour palette.
//!
//! Word only offers a fixed set of highlight colours, identified by a
//! numeric index in the UI and by a keyword in `w:highlight/@w:val`.
//! Arbitrary colours must be applied as run shading (`w:shd/@w:fill`).

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightColor {
    None,
    Black,
    Blue,
    Turquoise,
    BrightGreen,
    Pink,
    Red,
    Yellow,
    White,
    DarkBlue,
    Teal,
    Green,
    Violet,
    DarkRed,
    DarkYellow,
    Gray50,
    Gray25,
}

const PALETTE: [HighlightColor; 17] = [
    HighlightColor::None,
    HighlightColor::Black,
    HighlightColor::Blue,
    HighlightColor::Turquoise,
    HighlightColor::BrightGreen,
    HighlightColor::Pink,
    HighlightColor::Red,
    HighlightColor::Yellow,
    HighlightColor::White,
    HighlightColor::DarkBlue,
    HighlightColor::Teal,
    HighlightColor::Green,
    HighlightColor::Violet,
    HighlightColor::DarkRed,
    HighlightColor::DarkYellow,
    HighlightColor::Gray50,
    HighlightColor::Gray25,
];

impl HighlightColor {
    pub fn all() -> &'static [HighlightColor] {
        &PALETTE
    }

    pub fn from_index(index: u8) -> Option<Self> {
        PALETTE.get(index as usize).copied()
    }

    pub fn index(self) -> u8 {
        PALETTE.iter().position(|c| *c == self).unwrap_or(0) as u8
    }

    /// Name as shown in Word's highlight menu.
    pub fn display_name(self) -> &'static str {
        match self {
            HighlightColor::None => "None",
            HighlightColor::Black => "Black",
            HighlightColor::Blue => "Blue",
            HighlightColor::Turquoise => "Turquoise",
            HighlightColor::BrightGreen => "Bright Green",
            HighlightColor::Pink => "Pink",
            HighlightColor::Red => "Red",
            HighlightColor::Yellow => "Yellow",
            HighlightColor::White => "White",
            HighlightColor::DarkBlue => "Dark Blue",
            HighlightColor::Teal => "Teal",
            HighlightColor::Green => "Green",
            HighlightColor::Violet => "Violet",
            HighlightColor::DarkRed => "Dark Red",
            HighlightColor::DarkYellow => "Dark Yellow",
            HighlightColor::Gray50 => "Gray50",
            HighlightColor::Gray25 => "Gray25",
        }
    }

    /// Value of `w:highlight/@w:val`.
    pub fn ooxml_value(self) -> &'static str {
        match self {
            HighlightColor::None => "none",
            HighlightColor::Black => "black",
            HighlightColor::Blue => "blue",
            HighlightColor::Turquoise => "cyan",
            HighlightColor::BrightGreen => "green",
            HighlightColor::Pink => "magenta",
            HighlightColor::Red => "red",
            HighlightColor::Yellow => "yellow",
            HighlightColor::White => "white",
            HighlightColor::DarkBlue => "darkBlue",
            HighlightColor::Teal => "darkCyan",
            HighlightColor::Green => "darkGreen",
            HighlightColor::Violet => "darkMagenta",
            HighlightColor::DarkRed => "darkRed",
            HighlightColor::DarkYellow => "darkYellow",
            HighlightColor::Gray50 => "darkGray",
            HighlightColor::Gray25 => "lightGray",
        }
    }

    pub fn from_ooxml(value: &str) -> Option<Self> {
        PALETTE.iter().copied().find(|c| c.ooxml_value() == value)
    }

    /// Canonical `#RRGGBB` for the palette entry; `None` has no colour.
    pub fn hex(self) -> Option<&'static str> {
        let hex = match self {
            HighlightColor::None => return None,
            HighlightColor::Black => "#000000",
            HighlightColor::Blue => "#0000FF",
            HighlightColor::Turquoise => "#00FFFF",
            HighlightColor::BrightGreen => "#00FF00",
            HighlightColor::Pink => "#FFC0CB",
            HighlightColor::Red => "#FF0000",
            HighlightColor::Yellow => "#FFFF00",
            HighlightColor::White => "#FFFFFF",
            HighlightColor::DarkBlue => "#00008B",
            HighlightColor::Teal => "#008080",
            HighlightColor::Green => "#008000",
            HighlightColor::Violet => "#EE82EE",
            HighlightColor::DarkRed => "#8B0000",
            HighlightColor::DarkYellow => "#9B870C",
            HighlightColor::Gray50 => "#808080",
            HighlightColor::Gray25 => "#C0C0C0",
        };
        Some(hex)
    }

    /// Map a background colour to the palette, case-insensitively.
    /// Returns `None` when the colour has no highlight equivalent.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = normalize_hex(hex)?;
        if hex == "#BEBEBE" || hex == "#D3D3D3" {
            return Some(HighlightColor::Gray25);
        }
        PALETTE
            .iter()
            .copied()
            .find(|c| c.hex() == Some(hex.as_str()))
    }
}

/// How a background colour ends up on a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Highlight(HighlightColor),
    /// Shading fill, `RRGGBB` without the `#`.
    Shading(String),
}

impl Background {
    /// Palette colours become a highlight, anything else becomes shading.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if let Some(c) = HighlightColor::from_hex(hex) {
            return Some(Background::Highlight(c));
        }
        normalize_hex(hex).map(|h| Background::Shading(h.trim_start_matches('#').to_string()))
    }
}

/// `#rgb`/`rrggbb`/`#RRGGBB` → `#RRGGBB`; `None` if not a colour.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let s = raw.trim().trim_start_matches('#');
    let expanded: String = match s.len() {
        3 => s.chars().flat_map(|c| [c, c]).collect(),
        6 => s.to_string(),
        _ => return None,
    };
    if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", expanded.to_ascii_uppercase()))
}
