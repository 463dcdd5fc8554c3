use crate::error::LayoutError;
use crate::layout::{LayoutFlags, LayoutId, PackItem, PackedLayout, Slot, MAX_LAYOUT_ID};

const INDEX_ID: usize = 0;
const INDEX_WIDTH: usize = 1;
const INDEX_HEIGHT: usize = 2;
const INDEX_OPTIONS: usize = 3;

/// Number of f32 slots before the per-item pairs.
pub const HEADER_LEN: usize = 4;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketHeader {
    pub id: LayoutId,
    pub width: f32,
    pub height: f32,
    pub flags: LayoutFlags,
}

/// Flat f32 buffer exchanged with a worker:
/// `[id, width, height, options, a0, b0, a1, b1, ...]`.
///
/// Requests carry item `(width, height)` pairs; the worker overwrites them
/// in place with `(left, top)` slots and the header with the final size.
/// The buffer is moved between threads, never shared; `Packet` is not `Clone`.
#[derive(Debug, PartialEq)]
pub struct Packet {
    data: Box<[f32]>,
}

impl Packet {
    /// Serialize a layout request.
    pub fn request<I: PackItem>(
        id: LayoutId,
        width: f32,
        height: f32,
        flags: LayoutFlags,
        items: &[I],
    ) -> Self {
        let mut data = Vec::with_capacity(HEADER_LEN + items.len() * 2);
        data.push(id.0 as f32);
        data.push(width);
        data.push(height);
        data.push(flags.to_wire());
        for item in items {
            let (w, h) = item.outer_size();
            data.push(w);
            data.push(h);
        }
        Packet {
            data: data.into_boxed_slice(),
        }
    }

    /// Wrap an already-encoded buffer (e.g. received from another process).
    pub fn from_vec(data: Vec<f32>) -> Self {
        Packet {
            data: data.into_boxed_slice(),
        }
    }

    /// Rebuild a packet from its native-endian byte view.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LayoutError> {
        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            return Err(LayoutError::MalformedPacket(format!(
                "{} bytes is not a whole number of f32 values",
                bytes.len()
            )));
        }
        Ok(Packet::from_vec(bytemuck::pod_collect_to_vec(bytes)))
    }

    /// Native-endian byte view of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of item pairs after the header.
    pub fn item_count(&self) -> usize {
        self.data.len().saturating_sub(HEADER_LEN) / 2
    }

    /// Validate the layout and decode the header.
    pub fn header(&self) -> Result<PacketHeader, LayoutError> {
        if self.data.len() < HEADER_LEN {
            return Err(LayoutError::MalformedPacket(format!(
                "{} values is shorter than the {}-value header",
                self.data.len(),
                HEADER_LEN
            )));
        }
        if (self.data.len() - HEADER_LEN) % 2 != 0 {
            return Err(LayoutError::MalformedPacket(format!(
                "body of {} values is not a list of pairs",
                self.data.len() - HEADER_LEN
            )));
        }

        let raw_id = self.data[INDEX_ID];
        if !(raw_id.is_finite() && raw_id >= 0.0 && raw_id.fract() == 0.0 && raw_id <= MAX_LAYOUT_ID as f32) {
            return Err(LayoutError::MalformedPacket(format!("invalid layout id {raw_id}")));
        }

        Ok(PacketHeader {
            id: LayoutId(raw_id as u32),
            width: self.data[INDEX_WIDTH],
            height: self.data[INDEX_HEIGHT],
            flags: LayoutFlags::from_wire(self.data[INDEX_OPTIONS]),
        })
    }

    /// The `(a, b)` pairs after the header: item sizes in a request, slots
    /// in a response.
    pub fn pairs(&self) -> impl ExactSizeIterator<Item = (f32, f32)> + '_ {
        self.data
            .get(HEADER_LEN..)
            .unwrap_or(&[])
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
    }

    /// Response slots.
    pub fn slots(&self) -> impl ExactSizeIterator<Item = Slot> + '_ {
        self.pairs().map(|(left, top)| Slot { left, top })
    }

    /// Turn a request into its response in place.
    pub fn write_layout(&mut self, layout: &PackedLayout) -> Result<(), LayoutError> {
        if layout.slots.len() != self.item_count() {
            return Err(LayoutError::MalformedPacket(format!(
                "{} slots do not fit a packet with {} items",
                layout.slots.len(),
                self.item_count()
            )));
        }
        self.data[INDEX_WIDTH] = layout.width;
        self.data[INDEX_HEIGHT] = layout.height;
        for (pair, slot) in self.data[HEADER_LEN..].chunks_exact_mut(2).zip(&layout.slots) {
            pair[0] = slot.left;
            pair[1] = slot.top;
        }
        Ok(())
    }
}
