use super::Decoder;
use anyhow::{Context, Result};
use image::RgbImage;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

struct Request {
    id: u64,
    frame: RgbImage,
}

struct Response {
    id: u64,
    text: Option<String>,
}

/// Runs a decoder on a worker thread and bounds how long a call may wait
///
/// A call that does not get an answer within `budget` returns `None`. While
/// that request is still being worked on, further calls return `None`
/// without queueing. A late answer is kept and handed out by the next call.
pub struct BudgetedDecoder {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    worker: Option<JoinHandle<()>>,
    budget: Duration,
    next_id: u64,
    outstanding: Option<u64>,
    late: Option<String>,
}

impl BudgetedDecoder {
    pub fn new<D>(mut decoder: D, budget: Duration) -> Result<Self>
    where
        D: Decoder + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (response_tx, response_rx) = mpsc::channel::<Response>();

        let worker = std::thread::Builder::new()
            .name("decode-worker".to_string())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    let text = decoder.decode(&request.frame);
                    if response_tx.send(Response { id: request.id, text }).is_err() {
                        break;
                    }
                }
                tracing::debug!("Decode worker stopped");
            })
            .context("Failed to spawn decode worker")?;

        tracing::info!("Decode worker started with {}ms budget", budget.as_millis());

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
            budget,
            next_id: 0,
            outstanding: None,
            late: None,
        })
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// True while a timed-out request is still running on the worker
    pub fn is_busy(&mut self) -> bool {
        self.drain_late();
        self.outstanding.is_some()
    }

    /// Collect the answer to a request that already timed out
    fn drain_late(&mut self) {
        while let Some(id) = self.outstanding {
            match self.responses.try_recv() {
                Ok(response) if response.id == id => {
                    tracing::debug!("Late decode result for request {} arrived", id);
                    self.outstanding = None;
                    if response.text.is_some() {
                        self.late = response.text;
                    }
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.outstanding = None;
                }
            }
        }
    }
}

impl Decoder for BudgetedDecoder {
    fn decode(&mut self, frame: &RgbImage) -> Option<String> {
        if self.is_busy() {
            tracing::debug!("Decoder still busy, skipping frame");
            return None;
        }

        let late = self.late.take();
        self.next_id += 1;
        let id = self.next_id;

        let Some(requests) = self.requests.as_ref() else {
            return late;
        };
        if requests
            .send(Request {
                id,
                frame: frame.clone(),
            })
            .is_err()
        {
            tracing::warn!("Decode worker is gone");
            return late;
        }
        self.outstanding = Some(id);

        loop {
            match self.responses.recv_timeout(self.budget) {
                Ok(response) if response.id == id => {
                    self.outstanding = None;
                    return response.text.or(late);
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::debug!(
                        "Decode exceeded {}ms budget, result deferred",
                        self.budget.as_millis()
                    );
                    return late;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Decode worker exited unexpectedly");
                    self.outstanding = None;
                    return late;
                }
            }
        }
    }
}

impl Drop for BudgetedDecoder {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Decode worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct SlowDecoder {
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl Decoder for SlowDecoder {
        fn decode(&mut self, frame: &RgbImage) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Some(format!("{}x{}", frame.width(), frame.height()))
        }
    }

    fn slow(delay_ms: u64) -> (SlowDecoder, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            SlowDecoder {
                delay: Duration::from_millis(delay_ms),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    #[test]
    fn test_fast_decode_returns_result() {
        let (decoder, _) = slow(0);
        let mut budgeted = BudgetedDecoder::new(decoder, Duration::from_secs(5)).unwrap();
        assert_eq!(budgeted.decode(&RgbImage::new(8, 4)), Some("8x4".to_string()));
    }

    #[test]
    fn test_slow_decode_reports_no_result() {
        let (decoder, calls) = slow(300);
        let mut budgeted = BudgetedDecoder::new(decoder, Duration::from_millis(10)).unwrap();

        assert_eq!(budgeted.decode(&RgbImage::new(8, 4)), None);
        // Still working on the first frame, the second is not queued
        assert_eq!(budgeted.decode(&RgbImage::new(8, 4)), None);

        std::thread::sleep(Duration::from_millis(600));
        assert!(!budgeted.is_busy());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_result_returned_by_next_call() {
        let (decoder, calls) = slow(80);
        let mut budgeted = BudgetedDecoder::new(decoder, Duration::from_millis(20)).unwrap();

        assert_eq!(budgeted.decode(&RgbImage::new(3, 2)), None);
        std::thread::sleep(Duration::from_millis(200));

        // Every decode overruns the budget, yet each answer still surfaces
        assert_eq!(budgeted.decode(&RgbImage::new(5, 4)), Some("3x2".to_string()));
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(budgeted.decode(&RgbImage::new(7, 6)), Some("5x4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
