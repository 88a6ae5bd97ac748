//! Peer-to-peer audio call negotiation core.
//!
//! Drives the offer/answer handshake and out-of-band ICE candidate exchange
//! between two peers over a pluggable signaling channel. Media handling is
//! delegated to a [`media::MediaEngine`]; signaling transport to a
//! [`transport::SignalingChannel`]. All session state lives behind a single
//! dispatcher task, so negotiation is serialized by construction.

pub mod config;
pub mod dispatch;
pub mod media;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::CallConfig;
pub use dispatch::CallSession;
pub use protocol::{DecodeError, SignalMessage};
pub use session::{NegotiationPhase, Role};
