// Public library interface for gridpack
// The debug and validation binaries build on these modules

pub mod batch;
pub mod config;
pub mod error;
pub mod layout;
pub mod worker;

pub use batch::{fill_layouts, LayoutJob};
pub use config::PackerConfig;
pub use error::LayoutError;
pub use layout::{
    GrowAxis, Item, LayoutFlags, LayoutId, LayoutOptions, LayoutResult, Margins, PackItem,
    PackedLayout, PackerProcessor, PartialOptions, Slot, MAX_LAYOUT_ID,
};
pub use worker::{CancelHandle, CancelOutcome, LayoutCallback, Packer, Packet};
