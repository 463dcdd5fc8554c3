use serde::{Deserialize, Serialize};

/// Anything the packer can place: all it needs is the outer size.
pub trait PackItem {
    /// Width and height including margins.
    fn outer_size(&self) -> (f32, f32);
}

impl PackItem for (f32, f32) {
    fn outer_size(&self) -> (f32, f32) {
        *self
    }
}

impl PackItem for [f32; 2] {
    fn outer_size(&self) -> (f32, f32) {
        (self[0], self[1])
    }
}

impl<T: PackItem + ?Sized> PackItem for &T {
    fn outer_size(&self) -> (f32, f32) {
        (**self).outer_size()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Margins {
    pub const fn uniform(value: f32) -> Self {
        Margins {
            left: value,
            right: value,
            top: value,
            bottom: value,
        }
    }
}

/// An item with a content box and margins. The packed slot is the outer
/// (margin) box; renderers offset by the left/top margin themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub margins: Margins,
}

impl Item {
    pub const fn new(width: f32, height: f32) -> Self {
        Item {
            width,
            height,
            margins: Margins::uniform(0.0),
        }
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }
}

impl PackItem for Item {
    fn outer_size(&self) -> (f32, f32) {
        (
            self.width + self.margins.left + self.margins.right,
            self.height + self.margins.top + self.margins.bottom,
        )
    }
}
