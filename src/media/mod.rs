//! Media engine seam.
//!
//! The negotiation core never touches `webrtc` types directly; it drives an
//! engine through this trait. `WebRtcEngine` is the production adapter,
//! [`mock::MockMediaEngine`] a scripted double for tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod mock;
pub mod webrtc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// A session description as the core sees it: just its kind and SDP text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

/// One ICE candidate, in the shape both the wire format and the engine accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateInit {
    pub candidate: String,
    pub sdp_mid: String,
    pub sdp_mline_index: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media engine setup failed: {0}")]
    Setup(String),
    #[error("description rejected: {0}")]
    Description(String),
    #[error("candidate rejected: {0}")]
    Candidate(String),
    #[error("local candidate stream already taken")]
    CandidatesTaken,
}

/// Asynchronous media engine contract.
///
/// Description operations complete at an unspecified later time; the caller
/// must not assume synchronous completion. `set_remote_description` returning
/// `Ok` is the trigger for flushing buffered remote candidates.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError>;

    async fn create_answer(&self) -> Result<SessionDescription, MediaError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError>;

    async fn add_candidate(&self, candidate: CandidateInit) -> Result<(), MediaError>;

    /// Release the underlying connection. Safe to call more than once.
    async fn close(&self);

    /// Take the stream of locally gathered candidates. Single consumer; a
    /// second take fails with [`MediaError::CandidatesTaken`].
    async fn local_candidates(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<CandidateInit>, MediaError>;
}
