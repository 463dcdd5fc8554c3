use thiserror::Error;

use crate::layout::{LayoutId, MAX_LAYOUT_ID};

/// Errors surfaced by the layout orchestrator.
///
/// The packing algorithm itself never fails; everything here comes from
/// request bookkeeping or the worker wire format.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("a layout with id {0} is currently being processed")]
    DuplicateId(LayoutId),

    #[error("layout id {0} does not fit a packet header (max {MAX_LAYOUT_ID})")]
    IdOutOfRange(u32),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("failed to spawn packer worker: {0}")]
    Spawn(#[from] std::io::Error),
}
