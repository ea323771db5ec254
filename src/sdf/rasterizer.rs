// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Rasterization scheduling

use super::{generate_culled, PoolOutput, SdfError, SdfParams, TimeSlicedQueue, WorkerPool};
use crate::config::EngineConfig;
use std::fmt;
use std::sync::Once;
use std::time::{Duration, Instant};

/// Generator used by the accelerated strategy
///
/// Runs on the calling thread, inside a time slice.
pub trait SdfBackend: fmt::Debug {
    /// Generate a field of exactly `params.len()` bytes
    fn generate(&mut self, params: &SdfParams) -> Result<Vec<u8>, SdfError>;
}

/// The default backend: [`generate_culled`] on the CPU
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl SdfBackend for CpuBackend {
    fn generate(&mut self, params: &SdfParams) -> Result<Vec<u8>, SdfError> {
        Ok(generate_culled(params))
    }
}

/// Which strategy produced an [`SdfOutput`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Time-sliced on the calling thread
    Accelerated,
    /// The worker pool
    Pool,
}

/// A generated field, ready to copy into an atlas channel
#[derive(Debug)]
pub struct SdfOutput<K> {
    pub key: K,
    pub data: Vec<u8>,
    pub elapsed: Duration,
    pub strategy: Strategy,
}

impl<K> From<PoolOutput<K>> for SdfOutput<K> {
    fn from(out: PoolOutput<K>) -> Self {
        SdfOutput {
            key: out.key,
            data: out.data,
            elapsed: out.elapsed,
            strategy: Strategy::Pool,
        }
    }
}

static ACCELERATED_FAILED: Once = Once::new();

/// Schedules SDF generation over the two strategies
///
/// With the accelerated strategy enabled, jobs are queued and run by
/// [`Rasterizer::tick`] within the configured time budget. A job whose
/// backend fails (or returns the wrong amount of data) is resubmitted to the
/// worker pool; the next job tries the backend again. Without the
/// accelerated strategy jobs go straight to the pool.
///
/// `K` identifies the destination of each job; it is returned unchanged
/// with the output.
pub struct Rasterizer<K> {
    backend: Box<dyn SdfBackend>,
    use_accelerated: bool,
    budget: Duration,
    queue: TimeSlicedQueue<(K, SdfParams)>,
    pool: WorkerPool<K>,
}

impl<K: Send + 'static> Rasterizer<K> {
    /// Construct with the [`CpuBackend`]
    pub fn new(config: &EngineConfig) -> Self {
        Rasterizer {
            backend: Box::new(CpuBackend),
            use_accelerated: config.use_accelerated,
            budget: config.time_budget(),
            queue: TimeSlicedQueue::new(),
            pool: WorkerPool::new(config.pool_size, config.idle_timeout()),
        }
    }

    /// Replace the accelerated backend
    pub fn set_backend(&mut self, backend: Box<dyn SdfBackend>) {
        self.backend = backend;
    }

    /// Access the worker pool
    pub fn pool(&self) -> &WorkerPool<K> {
        &self.pool
    }

    /// Number of submitted jobs without output yet
    pub fn num_pending(&self) -> usize {
        self.queue.len() + self.pool.num_outstanding()
    }

    /// Submit a job
    pub fn submit(&mut self, key: K, params: SdfParams) {
        if self.use_accelerated {
            self.queue.push((key, params));
        } else {
            self.pool.submit(key, params);
        }
    }

    /// Run one time slice and collect finished pool jobs
    ///
    /// Also tears down idle pool workers.
    pub fn tick(&mut self) -> Vec<SdfOutput<K>> {
        let mut out = vec![];
        let Rasterizer {
            backend,
            budget,
            queue,
            pool,
            ..
        } = self;

        queue.tick(*budget, |(key, params)| {
            let start = Instant::now();
            let result = backend.generate(&params).and_then(|data| {
                if data.is_empty() && !params.is_empty() {
                    Err(SdfError::EmptyOutput)
                } else if data.len() != params.len() {
                    Err(SdfError::SizeMismatch {
                        expected: params.len(),
                        actual: data.len(),
                    })
                } else {
                    Ok(data)
                }
            });
            match result {
                Ok(data) => out.push(SdfOutput {
                    key,
                    data,
                    elapsed: start.elapsed(),
                    strategy: Strategy::Accelerated,
                }),
                Err(err) => {
                    ACCELERATED_FAILED.call_once(|| {
                        log::warn!("accelerated SDF generation failed ({err}); using worker pool");
                    });
                    pool.submit(key, params);
                }
            }
        });

        out.extend(pool.poll().into_iter().map(SdfOutput::from));
        pool.reap(Instant::now());
        out
    }

    /// Make progress, blocking up to `timeout` on the pool if the queue is
    /// empty
    pub fn wait(&mut self, timeout: Duration) -> Vec<SdfOutput<K>> {
        if !self.queue.is_empty() {
            return self.tick();
        }
        let out = self.pool.wait(timeout);
        out.into_iter().map(SdfOutput::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Rect;
    use crate::sdf::{generate, GlyphPath, PathCommand};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Broken;

    impl SdfBackend for Broken {
        fn generate(&mut self, _: &SdfParams) -> Result<Vec<u8>, SdfError> {
            Ok(vec![0; 3])
        }
    }

    fn params() -> SdfParams {
        let path = GlyphPath::new(vec![
            PathCommand::MoveTo(0.0, 0.0),
            PathCommand::LineTo(10.0, 0.0),
            PathCommand::LineTo(5.0, 10.0),
            PathCommand::Close,
        ]);
        SdfParams {
            width: 8,
            height: 8,
            path: Arc::new(path),
            view_box: Rect::new(-2.0, -2.0, 12.0, 12.0),
            max_distance: 2.0,
            exponent: 9.0,
        }
    }

    fn drain(r: &mut Rasterizer<u32>) -> Vec<SdfOutput<u32>> {
        let mut out = vec![];
        while r.num_pending() > 0 {
            out.extend(r.wait(Duration::from_secs(10)));
        }
        out
    }

    #[test]
    fn accelerated_runs_inline() {
        let mut r = Rasterizer::new(&EngineConfig::default());
        r.submit(7, params());
        let out = r.tick();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, 7);
        assert_eq!(out[0].strategy, Strategy::Accelerated);
        assert_eq!(out[0].data, generate(&params()));
        assert_eq!(r.pool().num_workers(), 0);
    }

    #[test]
    fn bad_output_falls_back_per_call() {
        let mut r = Rasterizer::new(&EngineConfig::default());
        r.set_backend(Box::new(Broken));
        r.submit(1, params());
        r.submit(2, params());
        let out = drain(&mut r);
        assert_eq!(out.len(), 2);
        for o in &out {
            assert_eq!(o.strategy, Strategy::Pool);
            assert_eq!(o.data, generate(&params()));
        }
    }

    #[test]
    fn pool_only() {
        let config = EngineConfig {
            use_accelerated: false,
            ..Default::default()
        };
        let mut r = Rasterizer::new(&config);
        r.submit(3, params());
        assert_eq!(r.pool().num_outstanding(), 1);
        let out = drain(&mut r);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].strategy, Strategy::Pool);
    }
}
