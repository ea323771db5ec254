// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Fallback worker pool

use super::{generate, SdfParams};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct Job<K> {
    key: K,
    params: SdfParams,
}

struct Done<K> {
    slot: usize,
    key: K,
    data: Vec<u8>,
    elapsed: Duration,
}

struct Worker<K> {
    send: Sender<Job<K>>,
    handle: JoinHandle<()>,
}

struct Slot<K> {
    worker: Option<Worker<K>>,
    outstanding: usize,
    idle_since: Option<Instant>,
}

/// A completed job
#[derive(Debug)]
pub struct PoolOutput<K> {
    pub key: K,
    pub data: Vec<u8>,
    /// Time spent generating (on the worker)
    pub elapsed: Duration,
}

/// A fixed number of lazily-spawned SDF worker threads
///
/// Jobs are assigned to slots round-robin. Workers only see their arguments
/// and return an owned buffer over a channel; results are collected on the
/// thread calling [`WorkerPool::poll`] or [`WorkerPool::wait`].
///
/// A slot whose outstanding count returns to zero arms an idle deadline;
/// [`WorkerPool::reap`] tears down workers past their deadline. Submitting to
/// a slot disarms it, respawning the worker if needed.
pub struct WorkerPool<K> {
    slots: Vec<Slot<K>>,
    next: usize,
    idle_timeout: Duration,
    send: Sender<Done<K>>,
    recv: Receiver<Done<K>>,
}

impl<K: Send + 'static> WorkerPool<K> {
    /// Construct with `size` slots (at least 1)
    pub fn new(size: usize, idle_timeout: Duration) -> Self {
        let (send, recv) = unbounded();
        WorkerPool {
            slots: (0..size.max(1))
                .map(|_| Slot {
                    worker: None,
                    outstanding: 0,
                    idle_since: None,
                })
                .collect(),
            next: 0,
            idle_timeout,
            send,
            recv,
        }
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of live worker threads
    pub fn num_workers(&self) -> usize {
        self.slots.iter().filter(|s| s.worker.is_some()).count()
    }

    /// Number of submitted jobs not yet collected
    pub fn num_outstanding(&self) -> usize {
        self.slots.iter().map(|s| s.outstanding).sum()
    }

    fn spawn(&self, index: usize) -> std::io::Result<Worker<K>> {
        let (send, recv) = unbounded::<Job<K>>();
        let done = self.send.clone();
        let handle = thread::Builder::new()
            .name(format!("sdf-worker-{index}"))
            .spawn(move || {
                for Job { key, params } in recv {
                    let start = Instant::now();
                    let data = generate(&params);
                    let elapsed = start.elapsed();
                    let done_msg = Done {
                        slot: index,
                        key,
                        data,
                        elapsed,
                    };
                    if done.send(done_msg).is_err() {
                        break;
                    }
                }
            })?;
        log::debug!("WorkerPool: spawned sdf-worker-{index}");
        Ok(Worker { send, handle })
    }

    /// Submit a job
    pub fn submit(&mut self, key: K, params: SdfParams) {
        let index = self.next % self.slots.len();
        self.next = self.next.wrapping_add(1);

        if self.slots[index].worker.is_none() {
            match self.spawn(index) {
                Ok(worker) => self.slots[index].worker = Some(worker),
                Err(err) => log::warn!("WorkerPool: failed to spawn worker ({err})"),
            }
        }

        let slot = &mut self.slots[index];
        slot.outstanding += 1;
        slot.idle_since = None;

        let job = Job { key, params };
        let job = match &slot.worker {
            Some(worker) => match worker.send.send(job) {
                Ok(()) => return,
                Err(err) => err.into_inner(),
            },
            None => job,
        };

        // No worker: run inline so the job still completes
        let start = Instant::now();
        let data = generate(&job.params);
        let _ = self.send.send(Done {
            slot: index,
            key: job.key,
            data,
            elapsed: start.elapsed(),
        });
    }

    fn finish(&mut self, done: Done<K>) -> PoolOutput<K> {
        let slot = &mut self.slots[done.slot];
        slot.outstanding = slot.outstanding.saturating_sub(1);
        if slot.outstanding == 0 {
            slot.idle_since = Some(Instant::now());
        }
        PoolOutput {
            key: done.key,
            data: done.data,
            elapsed: done.elapsed,
        }
    }

    /// Collect all completed jobs without blocking
    pub fn poll(&mut self) -> Vec<PoolOutput<K>> {
        let mut out = vec![];
        while let Ok(done) = self.recv.try_recv() {
            out.push(self.finish(done));
        }
        out
    }

    /// Block until at least one job completes (or `timeout` elapses), then
    /// collect all completed jobs
    pub fn wait(&mut self, timeout: Duration) -> Vec<PoolOutput<K>> {
        if self.num_outstanding() == 0 {
            return vec![];
        }
        match self.recv.recv_timeout(timeout) {
            Ok(done) => {
                let mut out = vec![self.finish(done)];
                out.extend(self.poll());
                out
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => vec![],
        }
    }

    /// Tear down workers idle since before `now - idle_timeout`
    ///
    /// Returns the number of workers torn down.
    pub fn reap(&mut self, now: Instant) -> usize {
        let timeout = self.idle_timeout;
        let mut n = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let expired = slot
                .idle_since
                .is_some_and(|t| now.saturating_duration_since(t) >= timeout);
            if slot.outstanding == 0 && expired {
                slot.idle_since = None;
                if let Some(worker) = slot.worker.take() {
                    // Closing the channel ends the worker's loop
                    drop(worker.send);
                    let _ = worker.handle.join();
                    log::debug!("WorkerPool: sdf-worker-{index} idle; torn down");
                    n += 1;
                }
            }
        }
        n
    }
}

impl<K> Drop for WorkerPool<K> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Some(worker) = slot.worker.take() {
                drop(worker.send);
                let _ = worker.handle.join();
            }
        }
    }
}
