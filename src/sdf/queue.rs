// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Time-boxed job queue

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A FIFO of jobs run cooperatively on the calling thread
///
/// Each [`TimeSlicedQueue::tick`] runs jobs until a time budget is used up,
/// then returns so that the host can continue with its frame. At least one
/// job is run per tick so that a tiny budget still makes progress.
#[derive(Debug)]
pub struct TimeSlicedQueue<J> {
    jobs: VecDeque<J>,
}

impl<J> Default for TimeSlicedQueue<J> {
    fn default() -> Self {
        TimeSlicedQueue {
            jobs: VecDeque::new(),
        }
    }
}

impl<J> TimeSlicedQueue<J> {
    /// Construct an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a job
    #[inline]
    pub fn push(&mut self, job: J) {
        self.jobs.push_back(job);
    }

    /// Number of queued jobs
    #[inline]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run jobs with `run` until `budget` is exhausted or the queue is empty
    ///
    /// Returns the number of jobs run.
    pub fn tick(&mut self, budget: Duration, mut run: impl FnMut(J)) -> usize {
        let start = Instant::now();
        let mut n = 0;
        while let Some(job) = self.jobs.pop_front() {
            run(job);
            n += 1;
            if start.elapsed() >= budget {
                break;
            }
        }
        log::trace!(
            "TimeSlicedQueue::tick: ran {n} jobs in {:?}; {} remain",
            start.elapsed(),
            self.jobs.len()
        );
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn runs_everything_within_budget() {
        let mut queue = TimeSlicedQueue::new();
        queue.push(1);
        queue.push(2);
        let mut seen = vec![];
        assert_eq!(queue.tick(Duration::from_secs(10), |j| seen.push(j)), 2);
        assert_eq!(seen, [1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn yields_when_budget_spent() {
        let mut queue = TimeSlicedQueue::new();
        for i in 0..3 {
            queue.push(i);
        }
        let budget = Duration::from_millis(1);
        let n = queue.tick(budget, |_| sleep(Duration::from_millis(2)));
        assert_eq!(n, 1);
        assert_eq!(queue.len(), 2);
        // Zero budget still makes progress
        assert_eq!(queue.tick(Duration::ZERO, |_| ()), 1);
        assert_eq!(queue.len(), 1);
    }
}
