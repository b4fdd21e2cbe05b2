//! Fixed status color pairs shared by the cover and the overlays.

use super::TaskStatus;
use crate::pdf::Rgb;

/// Background and text color for one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusColors {
    /// Light fill used for stat boxes and translucent overlays.
    pub background: Rgb,
    /// Strong color used for text, borders and badges.
    pub text: Rgb,
}

/// Maps task statuses to their color pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPalette;

impl StatusPalette {
    /// Fallback for statuses outside the known set.
    pub const NEUTRAL: StatusColors = StatusColors {
        background: Rgb::from_hex(0x00f3_f4f6),
        text: Rgb::from_hex(0x006b_7280),
    };

    /// Color of every point marker, regardless of task status.
    pub const MARKER: Rgb = Rgb::from_hex(0x0025_63eb);

    /// Returns the color pair for `status`.
    #[must_use]
    pub const fn colors(status: &TaskStatus) -> StatusColors {
        match status {
            TaskStatus::Open => StatusColors {
                background: Rgb::from_hex(0x00fe_f2f2),
                text: Rgb::from_hex(0x00b9_1c1c),
            },
            TaskStatus::InProgress => StatusColors {
                background: Rgb::from_hex(0x00fe_fce8),
                text: Rgb::from_hex(0x00a1_6207),
            },
            TaskStatus::Completed => StatusColors {
                background: Rgb::from_hex(0x00f0_fdf4),
                text: Rgb::from_hex(0x0015_803d),
            },
            TaskStatus::Verified => StatusColors {
                background: Rgb::from_hex(0x00ef_f6ff),
                text: Rgb::from_hex(0x001d_4ed8),
            },
            TaskStatus::Other(_) => Self::NEUTRAL,
        }
    }
}
