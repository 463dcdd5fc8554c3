pub mod packet;
mod pool;

use std::collections::{HashMap, VecDeque};

pub use self::packet::{Packet, PacketHeader, HEADER_LEN};
pub use self::pool::process_packet;
use self::pool::{WorkerPool, WorkerReply};

use crate::config::PackerConfig;
use crate::error::LayoutError;
use crate::layout::{
    GrowAxis, LayoutFlags, LayoutId, LayoutOptions, LayoutResult, PackItem, PackerProcessor,
    PartialOptions, MAX_LAYOUT_ID,
};

/// Completion callback. Runs on the thread that owns the [`Packer`].
pub type LayoutCallback = Box<dyn FnOnce(LayoutResult)>;

/// Bookkeeping for a request that has been accepted but not delivered.
struct PendingLayout {
    callback: LayoutCallback,
    item_count: usize,
    grow: GrowAxis,
    /// Present while the request waits in the queue; taken on dispatch.
    packet: Option<Packet>,
}

/// What [`Packer::cancel_layout`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The request was still queued and has been dropped.
    Dequeued,
    /// A worker already has the request; its result will be discarded.
    Detached,
    /// No pending request with that id.
    Unknown,
}

/// Cancels one specific request. Returned by [`Packer::create_layout`] for
/// requests that did not resolve synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelHandle {
    id: LayoutId,
}

impl CancelHandle {
    pub fn id(&self) -> LayoutId {
        self.id
    }

    pub fn cancel(self, packer: &mut Packer) -> CancelOutcome {
        packer.cancel_layout(self.id)
    }
}

/// Layout orchestrator.
///
/// Accepts layout requests by id and either packs them immediately on the
/// caller's thread or ships them to a pool of worker threads, queueing
/// requests while every worker is busy. All bookkeeping lives on the
/// owning thread; worker results are picked up by [`poll`](Self::poll) or
/// [`wait`](Self::wait), which run the completion callbacks.
pub struct Packer {
    flags: LayoutFlags,
    /// In-process path, also used when the pool has lost every worker.
    processor: PackerProcessor,
    pool: Option<WorkerPool>,
    queue: VecDeque<LayoutId>,
    pending: HashMap<LayoutId, PendingLayout>,
    last_id: u32,
}

impl Packer {
    pub fn new(config: &PackerConfig) -> Result<Self, LayoutError> {
        let pool = if config.workers > 0 {
            Some(WorkerPool::spawn(config.workers)?)
        } else {
            tracing::debug!("Packer running in-process");
            None
        };
        Ok(Packer {
            flags: LayoutFlags::from(config.options),
            processor: PackerProcessor::new(),
            pool,
            queue: VecDeque::new(),
            pending: HashMap::new(),
            last_id: 0,
        })
    }

    /// A packer without worker threads. Every layout resolves inside
    /// [`create_layout`](Self::create_layout).
    pub fn in_process(options: LayoutOptions) -> Self {
        Packer {
            flags: LayoutFlags::from(options),
            processor: PackerProcessor::new(),
            pool: None,
            queue: VecDeque::new(),
            pending: HashMap::new(),
            last_id: 0,
        }
    }

    /// Override the given options; `None` fields keep their current value.
    pub fn set_options(&mut self, update: PartialOptions) -> &mut Self {
        self.flags = self.flags.merged(&update);
        self
    }

    pub fn options(&self) -> LayoutOptions {
        LayoutOptions::from(self.flags)
    }

    pub fn flags(&self) -> LayoutFlags {
        self.flags
    }

    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::worker_count)
    }

    /// Requests accepted but not yet delivered or cancelled.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Requests waiting for a free worker.
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Whether `id` is queued, running, or still held by a worker after
    /// cancellation.
    pub fn is_in_flight(&self, id: LayoutId) -> bool {
        self.pending.contains_key(&id) || self.pool.as_ref().is_some_and(|pool| pool.is_running(id))
    }

    /// Allocate a fresh id from this packer's id space.
    pub fn next_id(&mut self) -> LayoutId {
        loop {
            self.last_id = if self.last_id >= MAX_LAYOUT_ID {
                1
            } else {
                self.last_id + 1
            };
            let id = LayoutId(self.last_id);
            if !self.is_in_flight(id) {
                return id;
            }
        }
    }

    /// Request a layout of `items` inside a `width` x `height` container.
    ///
    /// Only the fixed dimension of the container is used: `width` in
    /// vertical mode, `height` in horizontal mode. Empty requests and
    /// in-process packers invoke `on_complete` before returning and yield no
    /// cancel handle. Otherwise the request is queued for a worker and
    /// `on_complete` runs from a later [`poll`](Self::poll) or
    /// [`wait`](Self::wait), exactly once unless cancelled.
    pub fn create_layout<I, F>(
        &mut self,
        id: LayoutId,
        items: &[I],
        width: f32,
        height: f32,
        on_complete: F,
    ) -> Result<Option<CancelHandle>, LayoutError>
    where
        I: PackItem,
        F: FnOnce(LayoutResult) + 'static,
    {
        if id.0 > MAX_LAYOUT_ID {
            return Err(LayoutError::IdOutOfRange(id.0));
        }
        if self.is_in_flight(id) {
            return Err(LayoutError::DuplicateId(id));
        }

        let flags = self.flags;
        let grow = GrowAxis::of(flags);
        let (width, height) = grow.seed(width, height);

        if items.is_empty() {
            let (width, height) = if flags.contains(LayoutFlags::ROUNDING) {
                (width.round(), height.round())
            } else {
                (width, height)
            };
            tracing::debug!("Layout {} has no items, resolving immediately", id);
            on_complete(LayoutResult {
                id,
                width,
                height,
                slots: Vec::new(),
                grow,
            });
            return Ok(None);
        }

        if self.worker_count() == 0 {
            let packed = self.processor.fill_layout(items, width, height, flags);
            on_complete(LayoutResult::from_packed(id, packed, grow));
            return Ok(None);
        }

        let packet = Packet::request(id, width, height, flags, items);
        self.pending.insert(
            id,
            PendingLayout {
                callback: Box::new(on_complete),
                item_count: items.len(),
                grow,
                packet: Some(packet),
            },
        );
        self.queue.push_back(id);
        tracing::debug!(
            "Layout {} queued ({} items, {} waiting)",
            id,
            items.len(),
            self.queue.len()
        );

        self.dispatch_queued();
        Ok(Some(CancelHandle { id }))
    }

    /// Drop the bookkeeping for `id`. A queued request never reaches a
    /// worker; a running one finishes but its callback does not fire.
    pub fn cancel_layout(&mut self, id: LayoutId) -> CancelOutcome {
        let Some(pending) = self.pending.remove(&id) else {
            return CancelOutcome::Unknown;
        };
        if pending.packet.is_some() {
            self.queue.retain(|queued| *queued != id);
            tracing::debug!("Layout {} cancelled before dispatch", id);
            CancelOutcome::Dequeued
        } else {
            tracing::debug!("Layout {} cancelled while running, result will be discarded", id);
            CancelOutcome::Detached
        }
    }

    /// Deliver every result that has already arrived, without blocking.
    /// Returns the number of callbacks fired.
    pub fn poll(&mut self) -> Result<usize, LayoutError> {
        let mut fired = 0;
        loop {
            let Some(reply) = self.pool.as_ref().and_then(WorkerPool::try_recv) else {
                break;
            };
            if self.complete(reply)? {
                fired += 1;
            }
        }
        Ok(fired)
    }

    /// Block until no request is queued or running, delivering results as
    /// they arrive. Returns the number of callbacks fired.
    pub fn wait(&mut self) -> Result<usize, LayoutError> {
        let mut fired = 0;
        loop {
            let Some(pool) = self.pool.as_ref() else {
                break;
            };
            if pool.in_flight() == 0 {
                break;
            }
            let Some(reply) = pool.recv() else {
                tracing::error!("All packer workers exited with {} layouts in flight", pool.in_flight());
                break;
            };
            if self.complete(reply)? {
                fired += 1;
            }
        }
        Ok(fired)
    }

    /// Release every worker and forget all pending requests. Later requests
    /// run in-process.
    pub fn destroy(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
        if !self.pending.is_empty() {
            tracing::debug!("Dropping {} pending layouts", self.pending.len());
        }
        self.queue.clear();
        self.pending.clear();
    }

    /// Handle one worker reply: free the worker, deliver the result, and
    /// feed the worker the next queued request.
    fn complete(&mut self, reply: WorkerReply) -> Result<bool, LayoutError> {
        let assigned = self.pool.as_mut().and_then(|pool| pool.release(reply.worker));
        let delivered = self.deliver(assigned, reply.packet);
        self.dispatch_queued();
        delivered
    }

    /// Decode a response packet and run its callback if the request is
    /// still pending. Results for cancelled ids are dropped silently.
    fn deliver(&mut self, assigned: Option<LayoutId>, packet: Packet) -> Result<bool, LayoutError> {
        let header = packet.header()?;
        if let Some(assigned) = assigned {
            if assigned != header.id {
                return Err(LayoutError::MalformedPacket(format!(
                    "worker was running layout {} but answered for {}",
                    assigned, header.id
                )));
            }
        }

        let Some(pending) = self.pending.remove(&header.id) else {
            tracing::debug!("Discarding result for cancelled layout {}", header.id);
            return Ok(false);
        };
        if packet.item_count() != pending.item_count {
            return Err(LayoutError::MalformedPacket(format!(
                "layout {} came back with {} slots for {} items",
                header.id,
                packet.item_count(),
                pending.item_count
            )));
        }

        let result = LayoutResult {
            id: header.id,
            width: header.width,
            height: header.height,
            slots: packet.slots().collect(),
            grow: pending.grow,
        };
        (pending.callback)(result);
        Ok(true)
    }

    /// Hand queued requests to idle workers until one side runs out.
    fn dispatch_queued(&mut self) {
        loop {
            let Some(pool) = self.pool.as_mut() else {
                return;
            };
            if pool.worker_count() == 0 {
                self.drain_in_process();
                return;
            }
            if !pool.has_idle() {
                return;
            }
            let Some(id) = self.queue.pop_front() else {
                return;
            };
            let Some(packet) = self.pending.get_mut(&id).and_then(|p| p.packet.take()) else {
                continue;
            };
            match pool.dispatch(id, packet) {
                Ok(()) => tracing::debug!("Layout {} dispatched", id),
                Err(packet) => {
                    if let Some(pending) = self.pending.get_mut(&id) {
                        pending.packet = Some(packet);
                    }
                    self.queue.push_front(id);
                }
            }
        }
    }

    /// Pack every queued request on this thread. Only used once the pool
    /// has no workers left.
    fn drain_in_process(&mut self) {
        if !self.queue.is_empty() {
            tracing::warn!("No packer workers left, packing {} queued layouts in-process", self.queue.len());
        }
        while let Some(id) = self.queue.pop_front() {
            let Some(packet) = self.pending.get_mut(&id).and_then(|p| p.packet.take()) else {
                continue;
            };
            let packet = process_packet(&mut self.processor, packet);
            if let Err(e) = self.deliver(Some(id), packet) {
                tracing::error!("In-process fallback failed for layout {}: {}", id, e);
            }
        }
    }
}

impl Drop for Packer {
    fn drop(&mut self) {
        self.destroy();
    }
}
