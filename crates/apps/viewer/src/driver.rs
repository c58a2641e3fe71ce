use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use streaming::client::Backend;
use tracing::debug;

use crate::app::{fetch, AppContext, Completion, Job};

enum Event {
    Tick,
    Done(Completion),
}

/// Single-threaded event loop: in-flight requests complete in any order and
/// are applied to the context one at a time, between frame ticks.
pub struct Driver<'a, B: Backend> {
    backend: &'a B,
    pending: FuturesUnordered<LocalBoxFuture<'a, Completion>>,
}

impl<'a, B: Backend> Driver<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            pending: FuturesUnordered::new(),
        }
    }

    pub fn submit(&mut self, jobs: impl IntoIterator<Item = Job>) {
        for job in jobs {
            debug!(url = job.url(), "request issued");
            self.pending.push(fetch(self.backend, job).boxed_local());
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Applies completions, and the requests they trigger, until nothing is
    /// in flight.
    pub async fn settle(&mut self, ctx: &mut AppContext) {
        while let Some(done) = self.pending.next().await {
            let follow_up = ctx.complete(done);
            self.submit(follow_up);
        }
    }

    /// Runs `frames` render ticks at the context's frame rate, applying
    /// completions as they land in between.
    pub async fn run_frames(&mut self, ctx: &mut AppContext, frames: u64) {
        let mut interval = tokio::time::interval(Duration::from_secs_f64(ctx.frame().dt_s));
        let mut ticked = 0;
        while ticked < frames {
            let event = tokio::select! {
                _ = interval.tick() => Event::Tick,
                Some(done) = self.pending.next(), if !self.pending.is_empty() => Event::Done(done),
            };
            match event {
                Event::Tick => {
                    ctx.tick();
                    ticked += 1;
                }
                Event::Done(done) => {
                    let follow_up = ctx.complete(done);
                    self.submit(follow_up);
                }
            }
        }
    }
}
