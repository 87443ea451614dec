use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use super::process::{ProcessError, ProcessOutput, ProcessRequest, ProcessRunner, ProcessStatus};

type Handler = dyn Fn(&ProcessRequest<'_>) -> Result<ProcessOutput, ProcessError> + Send + Sync;

/// In-memory [`ProcessRunner`] whose responses come from a closure.
///
/// Each call sleeps for the `elapsed` of the returned output. An output slower than
/// the time limit is turned into [`ProcessStatus::TimedOut`].
pub struct FakeProcessRunner {
    handler: Box<Handler>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProcessRunner {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ProcessRequest<'_>) -> Result<ProcessOutput, ProcessError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Commands received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FakeProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeProcessRunner")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProcessRunner for FakeProcessRunner {
    async fn run(&self, req: &ProcessRequest<'_>) -> Result<ProcessOutput, ProcessError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(req.command.to_owned());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut res = (self.handler)(req);
        if let Ok(out) = &mut res {
            if out.elapsed > req.time_limit {
                out.status = ProcessStatus::TimedOut;
                out.elapsed = req.time_limit;
            }
            tokio::time::sleep(out.elapsed).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }
}
