use std::cmp::Ordering;
use std::mem;

use super::arena::{Rect, RectHandle, RectStore};
use super::item::PackItem;
use super::options::LayoutFlags;
use super::{PackedLayout, Slot};

/// Slack allowed when testing whether an item fits a free rectangle.
const FIT_EPSILON: f32 = 0.001;
/// Free fragments thinner than this (in either dimension) are dropped.
const MIN_FRAGMENT: f32 = 0.5;

/// Shelf/guillotine packer with reusable scratch state.
///
/// Items are placed one at a time into the first free rectangle that fits
/// them; when nothing fits the item goes to the packing frontier and the
/// container grows. The rectangle arena and both free lists are truncated,
/// not freed, at the end of every call, so one instance can serve many
/// layouts without reallocating. An instance handles one layout at a time.
#[derive(Debug, Default)]
pub struct PackerProcessor {
    store: RectStore,
    /// Active free-rectangle set, in gravity order.
    free: Vec<RectHandle>,
    /// Candidate list for the next item; swapped with `free` after each placement.
    scratch: Vec<RectHandle>,
    /// Item sizes kept for the alignment pass.
    sizes: Vec<(f32, f32)>,
}

/// Container dimensions while a fill pass is running.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    width: f32,
    height: f32,
}

impl PackerProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a slot for every item and the final container size.
    ///
    /// In vertical mode `width` is the fixed dimension and `height` the
    /// starting height; horizontal mode swaps the roles.
    pub fn fill_layout<I: PackItem>(
        &mut self,
        items: &[I],
        width: f32,
        height: f32,
        flags: LayoutFlags,
    ) -> PackedLayout {
        self.fill_sizes(items.iter().map(PackItem::outer_size), width, height, flags)
    }

    /// Same as [`fill_layout`](Self::fill_layout) over raw `(width, height)` pairs.
    pub fn fill_sizes<S>(&mut self, sizes: S, width: f32, height: f32, flags: LayoutFlags) -> PackedLayout
    where
        S: IntoIterator<Item = (f32, f32)>,
    {
        let fill_gaps = flags.contains(LayoutFlags::FILL_GAPS);
        let horizontal = flags.contains(LayoutFlags::HORIZONTAL);
        let align_right = flags.contains(LayoutFlags::ALIGN_RIGHT);
        let align_bottom = flags.contains(LayoutFlags::ALIGN_BOTTOM);
        let rounding = flags.contains(LayoutFlags::ROUNDING);

        let mut bounds = Bounds { width, height };
        if rounding {
            bounds.width = bounds.width.round();
            bounds.height = bounds.height.round();
        }

        let sizes = sizes.into_iter();
        let mut slots = Vec::with_capacity(sizes.size_hint().0);

        for (index, (w, h)) in sizes.enumerate() {
            let (mut w, mut h) = (sanitize(index, w), sanitize(index, h));
            if rounding {
                w = w.round();
                h = h.round();
            }

            let slot = self.next_slot(&mut bounds, w, h, fill_gaps, horizontal);

            if horizontal {
                bounds.width = bounds.width.max(slot.right());
            } else {
                bounds.height = bounds.height.max(slot.bottom());
            }

            slots.push(Slot {
                left: slot.left,
                top: slot.top,
            });
            if align_right || align_bottom {
                self.sizes.push((w, h));
            }
        }

        if align_right {
            for (slot, &(w, _)) in slots.iter_mut().zip(&self.sizes) {
                slot.left = bounds.width - (slot.left + w);
            }
        }
        if align_bottom {
            for (slot, &(_, h)) in slots.iter_mut().zip(&self.sizes) {
                slot.top = bounds.height - (slot.top + h);
            }
        }

        if rounding {
            bounds.width = bounds.width.round();
            bounds.height = bounds.height.round();
        }

        self.reset();

        PackedLayout {
            width: bounds.width,
            height: bounds.height,
            slots,
        }
    }

    /// Place one item and rebuild the free-rectangle set around it.
    fn next_slot(
        &mut self,
        bounds: &mut Bounds,
        width: f32,
        height: f32,
        fill_gaps: bool,
        horizontal: bool,
    ) -> Rect {
        let PackerProcessor {
            store,
            free,
            scratch,
            ..
        } = self;
        scratch.clear();

        // First fit in gravity order.
        let fit = free.iter().enumerate().find_map(|(i, &handle)| {
            if handle.is_none() {
                return None;
            }
            let rect = store.get(handle);
            let fits = width <= rect.width + FIT_EPSILON && height <= rect.height + FIT_EPSILON;
            fits.then_some((i, rect))
        });

        // Without gap filling, free space ahead of the chosen rectangle is
        // abandoned; a frontier placement abandons all of it.
        let (slot, first_split) = match fit {
            Some((i, rect)) => (
                Rect::new(rect.left, rect.top, width, height),
                if fill_gaps { 0 } else { i },
            ),
            None => {
                let slot = if horizontal {
                    Rect::new(bounds.width, 0.0, width, height)
                } else {
                    Rect::new(0.0, bounds.height, width, height)
                };
                (slot, if fill_gaps { 0 } else { free.len() })
            }
        };

        if !horizontal && slot.bottom() > bounds.height {
            if slot.left > 0.0 {
                scratch.push(store.add(0.0, bounds.height, slot.left, f32::INFINITY));
            }
            if slot.right() < bounds.width {
                scratch.push(store.add(
                    slot.right(),
                    bounds.height,
                    bounds.width - slot.left - slot.width,
                    f32::INFINITY,
                ));
            }
            bounds.height = slot.bottom();
        }

        if horizontal && slot.right() > bounds.width {
            if slot.top > 0.0 {
                scratch.push(store.add(bounds.width, 0.0, f32::INFINITY, slot.top));
            }
            if slot.bottom() < bounds.height {
                scratch.push(store.add(
                    bounds.width,
                    slot.bottom(),
                    f32::INFINITY,
                    bounds.height - slot.top - slot.height,
                ));
            }
            bounds.width = slot.right();
        }

        // Fragments starting at or past the grown edge are dropped in both
        // gap modes.
        let limit = *bounds;
        let keep = |rect: &Rect| {
            rect.width >= MIN_FRAGMENT
                && rect.height >= MIN_FRAGMENT
                && if horizontal {
                    rect.left < limit.width
                } else {
                    rect.top < limit.height
                }
        };

        for &handle in &free[first_split..] {
            if handle.is_none() {
                continue;
            }
            let rect = store.get(handle);
            if !rect.overlaps(&slot) {
                if keep(&rect) {
                    scratch.push(handle);
                }
                continue;
            }
            for fragment in split_rect(&rect, &slot).into_iter().flatten() {
                if keep(&fragment) {
                    scratch.push(store.add(fragment.left, fragment.top, fragment.width, fragment.height));
                }
            }
        }

        if !scratch.is_empty() {
            purge_contained(store, scratch);
            scratch.retain(|handle| !handle.is_none());
            let gravity = if horizontal { cmp_left_top } else { cmp_top_left };
            scratch.sort_by(|a, b| gravity(&store.get(*a), &store.get(*b)));
        }

        mem::swap(free, scratch);
        slot
    }

    fn reset(&mut self) {
        self.store.reset();
        self.free.clear();
        self.scratch.clear();
        self.sizes.clear();
    }
}

/// Negative and non-finite sizes are treated as zero.
fn sanitize(index: usize, value: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        tracing::warn!("Packer: item {} has invalid dimension {}, using 0", index, value);
        0.0
    }
}

/// Guillotine-split `rect` around `hole` into the left, right, top and
/// bottom remainders, each clipped to `rect`.
fn split_rect(rect: &Rect, hole: &Rect) -> [Option<Rect>; 4] {
    let left = (rect.left < hole.left)
        .then(|| Rect::new(rect.left, rect.top, hole.left - rect.left, rect.height));

    let right = (rect.right() > hole.right()).then(|| {
        Rect::new(
            hole.right(),
            rect.top,
            rect.right() - hole.right(),
            rect.height,
        )
    });

    let top = (rect.top < hole.top)
        .then(|| Rect::new(rect.left, rect.top, rect.width, hole.top - rect.top));

    let bottom = (rect.bottom() > hole.bottom()).then(|| {
        Rect::new(
            rect.left,
            hole.bottom(),
            rect.width,
            rect.bottom() - hole.bottom(),
        )
    });

    [left, right, top, bottom]
}

/// Tombstone every rectangle that lies within another live one. Walks from
/// the back so of two identical rectangles the earlier one survives.
fn purge_contained(store: &RectStore, handles: &mut [RectHandle]) {
    for i in (0..handles.len()).rev() {
        if handles[i].is_none() {
            continue;
        }
        let rect = store.get(handles[i]);
        let contained = handles.iter().enumerate().any(|(j, &other)| {
            j != i && !other.is_none() && rect.is_within(&store.get(other))
        });
        if contained {
            handles[i] = RectHandle::NONE;
        }
    }
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn cmp_top_left(a: &Rect, b: &Rect) -> Ordering {
    cmp_f32(a.top, b.top).then_with(|| cmp_f32(a.left, b.left))
}

fn cmp_left_top(a: &Rect, b: &Rect) -> Ordering {
    cmp_f32(a.left, b.left).then_with(|| cmp_f32(a.top, b.top))
}
