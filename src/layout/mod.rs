pub mod arena;
pub mod item;
pub mod options;
pub mod processor;

use std::fmt;

pub use self::arena::{Rect, RectHandle, RectStore};
pub use self::item::{Item, Margins, PackItem};
pub use self::options::{LayoutFlags, LayoutOptions, PartialOptions};
pub use self::processor::PackerProcessor;

/// Largest id that survives the f32 packet header exactly (2^24).
pub const MAX_LAYOUT_ID: u32 = 1 << 24;

/// Caller-chosen identifier of one layout request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(pub u32);

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Top-left corner of an item's outer box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Slot {
    pub left: f32,
    pub top: f32,
}

/// Output of one [`PackerProcessor::fill_layout`] pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedLayout {
    pub width: f32,
    pub height: f32,
    /// One slot per item, in input order.
    pub slots: Vec<Slot>,
}

/// The container dimension a layout computes (the other one is fixed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowAxis {
    Width,
    Height,
}

impl GrowAxis {
    pub fn of(flags: LayoutFlags) -> Self {
        if flags.contains(LayoutFlags::HORIZONTAL) {
            GrowAxis::Width
        } else {
            GrowAxis::Height
        }
    }

    /// Seed dimensions for a container of the given size: the growing
    /// dimension always starts from zero.
    pub fn seed(self, width: f32, height: f32) -> (f32, f32) {
        match self {
            GrowAxis::Width => (0.0, height),
            GrowAxis::Height => (width, 0.0),
        }
    }
}

/// A finished layout as delivered to the completion callback.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub id: LayoutId,
    pub width: f32,
    pub height: f32,
    pub slots: Vec<Slot>,
    pub grow: GrowAxis,
}

impl LayoutResult {
    pub fn from_packed(id: LayoutId, packed: PackedLayout, grow: GrowAxis) -> Self {
        LayoutResult {
            id,
            width: packed.width,
            height: packed.height,
            slots: packed.slots,
            grow,
        }
    }
}
