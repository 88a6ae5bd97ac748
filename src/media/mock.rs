//! Scripted media engine for tests and signaling-only hosts.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{CandidateInit, MediaEngine, MediaError, SdpKind, SessionDescription};

/// Everything a [`MockMediaEngine`] was asked to do, in call order.
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
    pub local_descriptions: Vec<SessionDescription>,
    pub remote_descriptions: Vec<SessionDescription>,
    pub candidates: Vec<CandidateInit>,
    pub close_calls: usize,
}

/// In-memory engine that records calls and returns canned descriptions.
/// Individual operations can be scripted to fail for stall-path tests.
pub struct MockMediaEngine {
    log: Mutex<EngineLog>,
    fail_create_offer: bool,
    fail_create_answer: bool,
    fail_set_remote: bool,
    candidate_tx: mpsc::UnboundedSender<CandidateInit>,
    candidate_rx: Mutex<Option<mpsc::UnboundedReceiver<CandidateInit>>>,
}

impl MockMediaEngine {
    pub fn new() -> Self {
        let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
        Self {
            log: Mutex::new(EngineLog::default()),
            fail_create_offer: false,
            fail_create_answer: false,
            fail_set_remote: false,
            candidate_tx,
            candidate_rx: Mutex::new(Some(candidate_rx)),
        }
    }

    pub fn with_failing_create_offer(mut self) -> Self {
        self.fail_create_offer = true;
        self
    }

    pub fn with_failing_create_answer(mut self) -> Self {
        self.fail_create_answer = true;
        self
    }

    pub fn with_failing_set_remote(mut self) -> Self {
        self.fail_set_remote = true;
        self
    }

    /// Feed a candidate into the local-candidate stream, as if the engine had
    /// just gathered it.
    pub fn push_local_candidate(&self, candidate: CandidateInit) {
        let _ = self.candidate_tx.send(candidate);
    }

    pub fn log(&self) -> EngineLog {
        self.log.lock().unwrap().clone()
    }
}

impl Default for MockMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEngine for MockMediaEngine {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError> {
        if self.fail_create_offer {
            return Err(MediaError::Description("scripted offer failure".into()));
        }
        Ok(SessionDescription {
            kind: SdpKind::Offer,
            sdp: "v=0 mock-offer".to_string(),
        })
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        if self.fail_create_answer {
            return Err(MediaError::Description("scripted answer failure".into()));
        }
        Ok(SessionDescription {
            kind: SdpKind::Answer,
            sdp: "v=0 mock-answer".to_string(),
        })
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.log.lock().unwrap().local_descriptions.push(desc);
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        if self.fail_set_remote {
            return Err(MediaError::Description("scripted remote failure".into()));
        }
        self.log.lock().unwrap().remote_descriptions.push(desc);
        Ok(())
    }

    async fn add_candidate(&self, candidate: CandidateInit) -> Result<(), MediaError> {
        self.log.lock().unwrap().candidates.push(candidate);
        Ok(())
    }

    async fn close(&self) {
        self.log.lock().unwrap().close_calls += 1;
    }

    async fn local_candidates(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<CandidateInit>, MediaError> {
        self.candidate_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(MediaError::CandidatesTaken)
    }
}
