//! Background worker for tutor requests.
//!
//! Gateway calls block on the network, so they run on their own thread. The
//! UI side sends [`TutorDispatch`]es and drains [`TutorResponse`]s tagged with
//! the request id they answer; deciding whether a response is still wanted is
//! left to the selection controller.

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::tutor::{TutorError, TutorGateway, TutorRequest, TutorSuggestion};

/// Unique identifier for tutor requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TutorDispatch {
    pub id: RequestId,
    pub request: TutorRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TutorResponse {
    pub id: RequestId,
    pub result: Result<TutorSuggestion, TutorError>,
}

enum WorkerRequest {
    Suggest(TutorDispatch),
    Shutdown,
}

/// Dropping the worker never waits for the network: queued requests are
/// abandoned and the thread exits after the call in flight, if any.
pub struct TutorWorker {
    request_tx: Sender<WorkerRequest>,
    response_rx: Receiver<TutorResponse>,
    shutdown: Arc<AtomicBool>,
}

impl TutorWorker {
    pub fn spawn(gateway: Box<dyn TutorGateway>) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shutdown = Arc::clone(&shutdown);
        std::thread::spawn(move || {
            tutor_worker(gateway, request_rx, response_tx, worker_shutdown);
        });

        Self {
            request_tx,
            response_rx,
            shutdown,
        }
    }

    pub fn dispatch(&self, dispatch: TutorDispatch) -> Result<()> {
        self.request_tx
            .send(WorkerRequest::Suggest(dispatch))
            .ok()
            .context("Tutor worker has stopped")
    }

    pub fn try_recv(&self) -> Option<TutorResponse> {
        self.response_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<TutorResponse> {
        self.response_rx.recv_timeout(timeout).ok()
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
    }
}

impl Drop for TutorWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn tutor_worker(
    gateway: Box<dyn TutorGateway>,
    requests: Receiver<WorkerRequest>,
    responses: Sender<TutorResponse>,
    shutdown: Arc<AtomicBool>,
) {
    for request in requests {
        if shutdown.load(Ordering::Acquire) {
            break;
        }
        match request {
            WorkerRequest::Suggest(TutorDispatch { id, request }) => {
                let result = gateway.suggest_translation(&request);
                if let Err(e) = &result {
                    log::warn!("Tutor request {} failed: {e}", id.0);
                }
                if responses.send(TutorResponse { id, result }).is_err() {
                    break;
                }
            }
            WorkerRequest::Shutdown => break,
        }
    }
    log::debug!("Tutor worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::{SegmentId, TextId};
    use serde_json::Map;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct EchoGateway;

    impl TutorGateway for EchoGateway {
        fn suggest_translation(
            &self,
            request: &TutorRequest,
        ) -> Result<TutorSuggestion, TutorError> {
            if request.selection == "fail" {
                return Err(TutorError::Rejected {
                    status: 503,
                    detail: "LLM features are currently disabled".to_string(),
                });
            }
            Ok(TutorSuggestion {
                translation: format!("<{}>", request.selection),
                literal_gloss: None,
                rationale: "echo".to_string(),
                confidence: 0.5,
                source_language: request.language.clone(),
            })
        }
    }

    fn dispatch(id: u64, selection: &str) -> TutorDispatch {
        TutorDispatch {
            id: RequestId::new(id),
            request: TutorRequest {
                text_id: TextId(1),
                segment_id: SegmentId(10),
                selection: selection.to_string(),
                translation_draft: None,
                language: Some("grc".to_string()),
                metadata: Map::new(),
            },
        }
    }

    #[test]
    fn test_responses_carry_request_ids_in_order() {
        let worker = TutorWorker::spawn(Box::new(EchoGateway));
        worker.dispatch(dispatch(1, "μῆνιν")).unwrap();
        worker.dispatch(dispatch(2, "fail")).unwrap();

        let first = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.id, RequestId::new(1));
        assert_eq!(first.result.unwrap().translation, "<μῆνιν>");

        let second = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.id, RequestId::new(2));
        assert_eq!(
            second.result.unwrap_err().to_string(),
            "LLM features are currently disabled"
        );
    }

    #[test]
    fn test_try_recv_empty_when_idle() {
        let worker = TutorWorker::spawn(Box::new(EchoGateway));
        assert!(worker.try_recv().is_none());
    }

    struct SlowGateway {
        calls: Arc<AtomicUsize>,
    }

    impl TutorGateway for SlowGateway {
        fn suggest_translation(
            &self,
            request: &TutorRequest,
        ) -> Result<TutorSuggestion, TutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            EchoGateway.suggest_translation(request)
        }
    }

    #[test]
    fn test_drop_does_not_wait_for_queued_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let worker = TutorWorker::spawn(Box::new(SlowGateway {
            calls: Arc::clone(&calls),
        }));
        for id in 1..=3 {
            worker.dispatch(dispatch(id, "μῆνιν")).unwrap();
        }

        let started = Instant::now();
        drop(worker);
        assert!(started.elapsed() < Duration::from_millis(250));

        // Only a call already in flight may still run
        std::thread::sleep(Duration::from_millis(900));
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }
}
