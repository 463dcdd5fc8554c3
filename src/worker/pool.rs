use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::packet::Packet;
use crate::error::LayoutError;
use crate::layout::{LayoutId, PackerProcessor};

/// A finished packet, tagged with the worker that produced it.
pub(crate) struct WorkerReply {
    pub worker: usize,
    pub packet: Packet,
}

/// One packing thread with its own processor.
struct Worker {
    index: usize,
    jobs: Sender<Packet>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn(index: usize, replies: Sender<WorkerReply>) -> Result<Self, LayoutError> {
        let (jobs, inbox) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("gridpack-worker-{index}"))
            .spawn(move || run_worker(index, inbox, replies))?;
        Ok(Worker { index, jobs, handle })
    }
}

fn run_worker(index: usize, inbox: Receiver<Packet>, replies: Sender<WorkerReply>) {
    let mut processor = PackerProcessor::new();
    // Ends when the pool drops our job sender.
    for packet in inbox {
        let packet = process_packet(&mut processor, packet);
        if replies.send(WorkerReply { worker: index, packet }).is_err() {
            break;
        }
    }
    tracing::debug!("Packer worker {} exiting", index);
}

/// Run a request packet through `processor`, turning it into the response
/// in place. Malformed requests come back untouched so the receiving side
/// reports them.
pub fn process_packet(processor: &mut PackerProcessor, mut packet: Packet) -> Packet {
    let header = match packet.header() {
        Ok(header) => header,
        Err(e) => {
            tracing::warn!("Packer worker got a bad request ({}), returning it as is", e);
            return packet;
        }
    };
    let layout = processor.fill_sizes(packet.pairs(), header.width, header.height, header.flags);
    if let Err(e) = packet.write_layout(&layout) {
        tracing::error!("Packer worker could not write layout {}: {}", header.id, e);
    }
    packet
}

/// Fixed set of worker threads. Each worker holds at most one request.
pub(crate) struct WorkerPool {
    /// Used as a stack: the most recently freed worker is reused first.
    idle: Vec<Worker>,
    busy: Vec<(LayoutId, Worker)>,
    replies: Receiver<WorkerReply>,
}

impl WorkerPool {
    pub fn spawn(count: usize) -> Result<Self, LayoutError> {
        let (reply_tx, replies) = mpsc::channel();
        let mut idle = Vec::with_capacity(count);
        for index in 0..count {
            idle.push(Worker::spawn(index, reply_tx.clone())?);
        }
        tracing::info!("Packer pool started with {} workers", count);
        Ok(WorkerPool {
            idle,
            busy: Vec::new(),
            replies,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.idle.len() + self.busy.len()
    }

    pub fn has_idle(&self) -> bool {
        !self.idle.is_empty()
    }

    /// Number of requests currently held by workers.
    pub fn in_flight(&self) -> usize {
        self.busy.len()
    }

    pub fn is_running(&self, id: LayoutId) -> bool {
        self.busy.iter().any(|(running, _)| *running == id)
    }

    /// Move `packet` to an idle worker. If there is none, or the worker's
    /// thread is gone, the packet is handed back; a dead worker is dropped
    /// from the pool.
    pub fn dispatch(&mut self, id: LayoutId, packet: Packet) -> Result<(), Packet> {
        let Some(worker) = self.idle.pop() else {
            return Err(packet);
        };
        match worker.jobs.send(packet) {
            Ok(()) => {
                self.busy.push((id, worker));
                Ok(())
            }
            Err(mpsc::SendError(packet)) => {
                tracing::error!("Packer worker {} is gone, removing it from the pool", worker.index);
                Err(packet)
            }
        }
    }

    pub fn try_recv(&self) -> Option<WorkerReply> {
        self.replies.try_recv().ok()
    }

    /// Block for the next reply. `None` once every worker has exited.
    pub fn recv(&self) -> Option<WorkerReply> {
        self.replies.recv().ok()
    }

    /// Return a worker to the idle set, yielding the layout it was running.
    pub fn release(&mut self, worker: usize) -> Option<LayoutId> {
        let position = self.busy.iter().position(|(_, w)| w.index == worker)?;
        let (id, worker) = self.busy.swap_remove(position);
        self.idle.push(worker);
        Some(id)
    }

    /// Stop all workers. Idle ones are joined; busy ones are detached and
    /// exit after their current packet, whose reply is dropped.
    pub fn shutdown(&mut self) {
        if self.worker_count() == 0 {
            return;
        }
        let detached = self.busy.len();
        for Worker { index, jobs, handle } in self.idle.drain(..) {
            drop(jobs);
            if handle.join().is_err() {
                tracing::error!("Packer worker {} panicked", index);
            }
        }
        self.busy.clear();
        tracing::info!("Packer pool shut down ({} busy workers detached)", detached);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
