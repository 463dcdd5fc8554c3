use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Layout behavior flags. The bit values are part of the packet format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayoutFlags: u32 {
        /// Keep and split every free rectangle so later items can back-fill gaps.
        const FILL_GAPS = 1;
        /// Grow the container to the right instead of downwards.
        const HORIZONTAL = 2;
        /// Mirror slots against the final container width.
        const ALIGN_RIGHT = 4;
        /// Mirror slots against the final container height.
        const ALIGN_BOTTOM = 8;
        /// Round seed, item and final dimensions to whole pixels.
        const ROUNDING = 16;
    }
}

impl LayoutFlags {
    /// Encode for the packet options slot.
    pub fn to_wire(self) -> f32 {
        self.bits() as f32
    }

    /// Decode a packet options slot. Unknown bits are dropped.
    pub fn from_wire(value: f32) -> Self {
        if !value.is_finite() || value < 0.0 {
            return LayoutFlags::empty();
        }
        LayoutFlags::from_bits_truncate(value as u32)
    }

    /// Apply a partial update. Fields left as `None` keep their current bit.
    pub fn merged(self, update: &PartialOptions) -> Self {
        let mut flags = self;
        let fields = [
            (LayoutFlags::FILL_GAPS, update.fill_gaps),
            (LayoutFlags::HORIZONTAL, update.horizontal),
            (LayoutFlags::ALIGN_RIGHT, update.align_right),
            (LayoutFlags::ALIGN_BOTTOM, update.align_bottom),
            (LayoutFlags::ROUNDING, update.rounding),
        ];
        for (flag, value) in fields {
            if let Some(on) = value {
                flags.set(flag, on);
            }
        }
        flags
    }
}

/// Named form of [`LayoutFlags`], used by configuration and request files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub fill_gaps: bool,
    pub horizontal: bool,
    pub align_right: bool,
    pub align_bottom: bool,
    pub rounding: bool,
}

impl From<LayoutOptions> for LayoutFlags {
    fn from(options: LayoutOptions) -> Self {
        LayoutFlags::empty().merged(&PartialOptions::from(options))
    }
}

impl From<LayoutFlags> for LayoutOptions {
    fn from(flags: LayoutFlags) -> Self {
        LayoutOptions {
            fill_gaps: flags.contains(LayoutFlags::FILL_GAPS),
            horizontal: flags.contains(LayoutFlags::HORIZONTAL),
            align_right: flags.contains(LayoutFlags::ALIGN_RIGHT),
            align_bottom: flags.contains(LayoutFlags::ALIGN_BOTTOM),
            rounding: flags.contains(LayoutFlags::ROUNDING),
        }
    }
}

/// Field-wise option override for [`crate::Packer::set_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialOptions {
    pub fill_gaps: Option<bool>,
    pub horizontal: Option<bool>,
    pub align_right: Option<bool>,
    pub align_bottom: Option<bool>,
    pub rounding: Option<bool>,
}

impl From<LayoutOptions> for PartialOptions {
    fn from(options: LayoutOptions) -> Self {
        PartialOptions {
            fill_gaps: Some(options.fill_gaps),
            horizontal: Some(options.horizontal),
            align_right: Some(options.align_right),
            align_bottom: Some(options.align_bottom),
            rounding: Some(options.rounding),
        }
    }
}
