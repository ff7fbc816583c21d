//! Goal Card Style System
//!
//! Provides color mapping for goal cards based on their status, with
//! wire-supplied style tokens taking precedence over the palette.

use goalgraph_core::{GoalStatus, GoalStyle};

/// RGB color representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_tuple(&self) -> (u8, u8, u8, u8) {
        (self.r, self.g, self.b, self.a)
    }

    pub fn darken(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) * (1.0 - factor)) as u8,
            g: ((self.g as f32) * (1.0 - factor)) as u8,
            b: ((self.b as f32) * (1.0 - factor)) as u8,
            a: self.a,
        }
    }

    pub fn lighten(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) + (255.0 - self.r as f32) * factor) as u8,
            g: ((self.g as f32) + (255.0 - self.g as f32) * factor) as u8,
            b: ((self.b as f32) + (255.0 - self.b as f32) * factor) as u8,
            a: self.a,
        }
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` token. Anything else is `None`.
    pub fn from_hex(token: &str) -> Option<Self> {
        let hex = token.strip_prefix('#')?;
        match hex.len() {
            6 => {
                let value = u32::from_str_radix(hex, 16).ok()?;
                Some(Self::rgb(
                    (value >> 16) as u8,
                    (value >> 8) as u8,
                    value as u8,
                ))
            }
            8 => {
                let value = u32::from_str_radix(hex, 16).ok()?;
                Some(Self::rgba(
                    (value >> 24) as u8,
                    (value >> 16) as u8,
                    (value >> 8) as u8,
                    value as u8,
                ))
            }
            _ => None,
        }
    }
}

/// Resolved card colors for one goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusColors {
    pub fill: Color,
    pub accent: Color,
}

const PENDING_FILL: Color = Color::rgb(0x9e, 0x9e, 0x9e);
const ACTIVE_FILL: Color = Color::rgb(0x42, 0xa5, 0xf5);
const DONE_FILL: Color = Color::rgb(0x66, 0xbb, 0x6a);
const BLOCKED_FILL: Color = Color::rgb(0xef, 0x53, 0x50);

/// Palette colors for a status, used whenever the wire tokens are absent or
/// unparseable.
pub fn status_colors(status: GoalStatus) -> StatusColors {
    let fill = match status {
        GoalStatus::Pending => PENDING_FILL,
        GoalStatus::Active => ACTIVE_FILL,
        GoalStatus::Done => DONE_FILL,
        GoalStatus::Blocked => BLOCKED_FILL,
    };
    StatusColors {
        fill,
        accent: fill.darken(0.3),
    }
}

/// Resolve the presentation colors for a goal: wire tokens win when they
/// parse, the status palette fills every gap.
pub fn resolve_style(style: &GoalStyle, status: GoalStatus) -> StatusColors {
    let palette = status_colors(status);
    StatusColors {
        fill: Color::from_hex(&style.fill).unwrap_or(palette.fill),
        accent: Color::from_hex(&style.accent).unwrap_or(palette.accent),
    }
}
