use rayon::prelude::*;

use crate::layout::{GrowAxis, LayoutFlags, PackItem, PackedLayout, PackerProcessor};

/// One independent layout for [`fill_layouts`].
#[derive(Debug, Clone)]
pub struct LayoutJob<I> {
    pub items: Vec<I>,
    pub width: f32,
    pub height: f32,
    pub flags: LayoutFlags,
}

impl<I> LayoutJob<I> {
    /// Uses the same seed convention as [`Packer`](crate::Packer): the
    /// growing dimension starts from zero.
    pub fn new(items: Vec<I>, width: f32, height: f32, flags: LayoutFlags) -> Self {
        let (width, height) = GrowAxis::of(flags).seed(width, height);
        LayoutJob {
            items,
            width,
            height,
            flags,
        }
    }
}

/// Pack many layouts across the rayon pool, one processor per rayon worker.
/// Output order matches `jobs`.
pub fn fill_layouts<I: PackItem + Sync>(jobs: &[LayoutJob<I>]) -> Vec<PackedLayout> {
    tracing::debug!("Packing {} layouts in parallel", jobs.len());
    jobs.par_iter()
        .map_init(PackerProcessor::new, |processor, job| {
            processor.fill_layout(&job.items, job.width, job.height, job.flags)
        })
        .collect()
}
