//! The negotiation state machine.
//!
//! Owns role assignment and phase tracking for one call attempt, validates
//! every signal against the current state, and drives the media engine
//! through the offer/answer sequence. Methods must be invoked from a single
//! task; the dispatcher guarantees that.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::media::{CandidateInit, MediaEngine, SdpKind, SessionDescription};
use crate::protocol::SignalMessage;

use super::candidates::CandidateBuffer;
use super::{NegotiationPhase, Role};

pub struct Negotiator {
    engine: Arc<dyn MediaEngine>,
    outbound: mpsc::UnboundedSender<SignalMessage>,
    phase_tx: watch::Sender<NegotiationPhase>,
    role: Role,
    phase: NegotiationPhase,
    remote_description_set: bool,
    pending_remote: CandidateBuffer,
}

impl Negotiator {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        outbound: mpsc::UnboundedSender<SignalMessage>,
        phase_tx: watch::Sender<NegotiationPhase>,
    ) -> Self {
        Self {
            engine,
            outbound,
            phase_tx,
            role: Role::Unassigned,
            phase: NegotiationPhase::Idle,
            remote_description_set: false,
            pending_remote: CandidateBuffer::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    /// Start an outgoing call: become the caller, create and publish an
    /// offer. A repeat call with the role already assigned is a no-op, so a
    /// double invocation cannot produce duplicate offers.
    pub async fn start_call(&mut self) {
        if self.phase.is_closed() {
            debug!("start_call ignored: session closed");
            return;
        }
        if self.role != Role::Unassigned {
            debug!(role = ?self.role, "start_call ignored: role already assigned");
            return;
        }
        self.role = Role::Caller;
        let offer = match self.engine.create_offer().await {
            Ok(desc) => desc,
            Err(err) => {
                warn!(error = %err, "offer creation failed; session stalled");
                return;
            }
        };
        if let Err(err) = self.engine.set_local_description(offer.clone()).await {
            warn!(error = %err, "local offer rejected by engine; session stalled");
            return;
        }
        self.set_phase(NegotiationPhase::OfferCreated);
        self.emit(SignalMessage::Offer { sdp: offer.sdp });
        info!("offer sent");
    }

    /// Apply one inbound signal. Signals that do not fit the current role and
    /// phase are dropped without touching session state; that is the defense
    /// against reordered, duplicated, or hostile traffic.
    pub async fn handle_inbound(&mut self, message: SignalMessage) {
        if self.phase.is_closed() {
            debug!("inbound signal ignored: session closed");
            return;
        }
        match message {
            SignalMessage::Offer { sdp } => self.accept_offer(sdp).await,
            SignalMessage::Answer { sdp } => self.accept_answer(sdp).await,
            SignalMessage::Ice {
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => {
                self.accept_candidate(CandidateInit {
                    candidate,
                    sdp_mid,
                    sdp_mline_index,
                })
                .await
            }
        }
    }

    /// Publish a locally gathered candidate. Candidates flow at any phase;
    /// the remote side buffers them if it is not ready.
    pub fn handle_local_candidate(&mut self, candidate: CandidateInit) {
        if self.phase.is_closed() {
            debug!("local candidate dropped: session closed");
            return;
        }
        self.emit(SignalMessage::Ice {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
        });
    }

    /// Close the session. Idempotent; a late completion from the engine after
    /// this point is discarded by the phase guard in every other method.
    pub async fn end_call(&mut self) {
        if self.phase.is_closed() {
            debug!("end_call ignored: already closed");
            return;
        }
        self.set_phase(NegotiationPhase::Closed);
        self.engine.close().await;
        info!("call ended");
    }

    async fn accept_offer(&mut self, sdp: String) {
        if self.role == Role::Caller || self.phase != NegotiationPhase::Idle {
            debug!(role = ?self.role, phase = ?self.phase, "offer rejected");
            return;
        }
        self.role = Role::Callee;
        let desc = SessionDescription {
            kind: SdpKind::Offer,
            sdp,
        };
        if let Err(err) = self.engine.set_remote_description(desc).await {
            warn!(error = %err, "remote offer rejected by engine; session stalled");
            return;
        }
        self.remote_description_set = true;
        self.set_phase(NegotiationPhase::OfferReceived);
        self.apply_pending_candidates().await;

        let answer = match self.engine.create_answer().await {
            Ok(desc) => desc,
            Err(err) => {
                warn!(error = %err, "answer creation failed; session stalled");
                return;
            }
        };
        if let Err(err) = self.engine.set_local_description(answer.clone()).await {
            warn!(error = %err, "local answer rejected by engine; session stalled");
            return;
        }
        self.set_phase(NegotiationPhase::AnswerCreated);
        self.emit(SignalMessage::Answer { sdp: answer.sdp });
        info!("answer sent");
    }

    async fn accept_answer(&mut self, sdp: String) {
        if self.role != Role::Caller || self.phase != NegotiationPhase::OfferCreated {
            debug!(role = ?self.role, phase = ?self.phase, "answer rejected");
            return;
        }
        let desc = SessionDescription {
            kind: SdpKind::Answer,
            sdp,
        };
        if let Err(err) = self.engine.set_remote_description(desc).await {
            warn!(error = %err, "remote answer rejected by engine; session stalled");
            return;
        }
        self.remote_description_set = true;
        self.set_phase(NegotiationPhase::AnswerReceived);
        self.apply_pending_candidates().await;
        self.set_phase(NegotiationPhase::Connected);
        info!("call connected");
    }

    async fn accept_candidate(&mut self, candidate: CandidateInit) {
        if self.remote_description_set {
            if let Err(err) = self.engine.add_candidate(candidate).await {
                warn!(error = %err, "candidate rejected by engine");
            }
        } else {
            self.pending_remote.push(candidate);
            debug!(
                buffered = self.pending_remote.len(),
                "remote description not set; candidate buffered"
            );
        }
    }

    async fn apply_pending_candidates(&mut self) {
        for candidate in self.pending_remote.drain() {
            if let Err(err) = self.engine.add_candidate(candidate).await {
                warn!(error = %err, "buffered candidate rejected by engine");
            }
        }
    }

    fn set_phase(&mut self, phase: NegotiationPhase) {
        self.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    fn emit(&self, message: SignalMessage) {
        // The dispatcher owns the receiving end; if it is gone the session is
        // being torn down and the message is moot.
        let _ = self.outbound.send(message);
    }
}
