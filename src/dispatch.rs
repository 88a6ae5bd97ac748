//! Signaling dispatcher.
//!
//! One task owns the [`Negotiator`] and everything it mutates. Host commands,
//! inbound frames, locally gathered candidates, and outbound messages all
//! funnel through this task, so state-machine invocations are serialized by
//! construction rather than by caller discipline.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::media::{CandidateInit, MediaEngine, MediaError};
use crate::protocol::{self, SignalMessage};
use crate::session::{NegotiationPhase, Negotiator};
use crate::transport::SignalingChannel;

enum Command {
    StartCall,
    EndCall,
}

/// Handle to a running call session. Cheap to clone; dropping every handle
/// tears the session down.
#[derive(Clone)]
pub struct CallSession {
    commands: mpsc::UnboundedSender<Command>,
    phase_rx: watch::Receiver<NegotiationPhase>,
}

impl CallSession {
    /// Spawn the dispatcher task for one call attempt.
    pub async fn spawn(
        engine: Arc<dyn MediaEngine>,
        channel: Arc<dyn SignalingChannel>,
    ) -> Result<CallSession, MediaError> {
        let local_candidates = engine.local_candidates().await?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(NegotiationPhase::Idle);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let negotiator = Negotiator::new(engine, outbound_tx, phase_tx);
        tokio::spawn(run_dispatch(
            negotiator,
            channel,
            command_rx,
            local_candidates,
            outbound_rx,
        ));
        Ok(CallSession {
            commands: command_tx,
            phase_rx,
        })
    }

    /// Ask the session to place an outgoing call. No-op if a role was already
    /// assigned.
    pub fn start_call(&self) {
        let _ = self.commands.send(Command::StartCall);
    }

    /// End the call and tear the session down. Idempotent.
    pub fn end_call(&self) {
        let _ = self.commands.send(Command::EndCall);
    }

    /// Current negotiation phase.
    pub fn phase(&self) -> NegotiationPhase {
        *self.phase_rx.borrow()
    }

    /// Watch phase transitions, e.g. to render call state.
    pub fn phase_changes(&self) -> watch::Receiver<NegotiationPhase> {
        self.phase_rx.clone()
    }
}

async fn run_dispatch(
    mut negotiator: Negotiator,
    channel: Arc<dyn SignalingChannel>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut local_candidates: mpsc::UnboundedReceiver<CandidateInit>,
    mut outbound: mpsc::UnboundedReceiver<SignalMessage>,
) {
    // The engine drops its candidate sender when it shuts down; that must not
    // busy-loop the select below.
    let mut candidates_open = true;
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::StartCall) => negotiator.start_call().await,
                // All handles gone means nobody can end the call later
                Some(Command::EndCall) | None => break,
            },
            inbound = channel.recv() => match inbound {
                Some(text) => match protocol::decode(&text) {
                    Ok(message) => negotiator.handle_inbound(message).await,
                    Err(err) => debug!(error = %err, "dropping undecodable signaling frame"),
                },
                None => {
                    debug!("signaling channel closed by peer");
                    break;
                }
            },
            candidate = local_candidates.recv(), if candidates_open => match candidate {
                Some(candidate) => negotiator.handle_local_candidate(candidate),
                None => candidates_open = false,
            },
            // The negotiator holds the sender, so this arm never yields None
            // while the loop runs.
            Some(message) = outbound.recv() => {
                send_signal(channel.as_ref(), &message).await;
            }
        }
    }

    negotiator.end_call().await;
    // Flush anything emitted by the final state-machine step before the
    // channel goes away.
    while let Ok(message) = outbound.try_recv() {
        send_signal(channel.as_ref(), &message).await;
    }
    channel.disconnect().await;
}

async fn send_signal(channel: &dyn SignalingChannel, message: &SignalMessage) {
    match protocol::encode(message) {
        Ok(text) => {
            if let Err(err) = channel.send(text).await {
                warn!(error = %err, "outbound signal dropped");
            }
        }
        Err(err) => warn!(error = %err, "outbound signal could not be encoded"),
    }
}
