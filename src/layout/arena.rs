/// Index into the rectangle arena. Uses u32 to keep handle lists compact.
///
/// Handle 0 is reserved as a tombstone so handle lists can drop entries in
/// place without shifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RectHandle(pub u32);

impl RectHandle {
    pub const NONE: RectHandle = RectHandle(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Axis-aligned rectangle. Width or height may be `f32::INFINITY` for an
/// unbounded shelf.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Whether the two rectangles share any interior area. Touching edges
    /// do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.right() <= other.left
            || other.right() <= self.left
            || self.bottom() <= other.top
            || other.bottom() <= self.top)
    }

    /// Whether `self` lies fully within `outer` (edges may coincide).
    pub fn is_within(&self, outer: &Rect) -> bool {
        self.left >= outer.left
            && self.top >= outer.top
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }
}

/// Append-only rectangle arena.
///
/// Handles are assigned in increasing order and never recycled until
/// [`RectStore::reset`], which drops every rectangle at once.
#[derive(Debug, Clone)]
pub struct RectStore {
    /// Slot 0 holds the tombstone; live rectangles start at index 1.
    rects: Vec<Rect>,
}

impl RectStore {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut rects = Vec::with_capacity(capacity + 1);
        rects.push(Rect::default());
        RectStore { rects }
    }

    /// Store a rectangle and return its handle.
    pub fn add(&mut self, left: f32, top: f32, width: f32, height: f32) -> RectHandle {
        let handle = RectHandle(self.rects.len() as u32);
        self.rects.push(Rect::new(left, top, width, height));
        handle
    }

    /// Get a rectangle by handle. The tombstone handle reads as an empty
    /// rectangle at the origin.
    pub fn get(&self, handle: RectHandle) -> Rect {
        self.rects[handle.index()]
    }

    /// Number of live rectangles.
    pub fn len(&self) -> usize {
        self.rects.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all rectangles, keeping the allocation. Handle numbering
    /// restarts at 1.
    pub fn reset(&mut self) {
        self.rects.truncate(1);
    }
}

impl Default for RectStore {
    fn default() -> Self {
        Self::new()
    }
}
