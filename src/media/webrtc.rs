//! Production media engine over `webrtc`'s `RTCPeerConnection`.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::debug;

use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MediaEngine as RtcMediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::config::CallConfig;

use super::{CandidateInit, MediaEngine, MediaError, SdpKind, SessionDescription};

/// [`MediaEngine`] adapter over an `RTCPeerConnection` carrying a single
/// bidirectional Opus audio transceiver.
pub struct WebRtcEngine {
    peer: Arc<RTCPeerConnection>,
    candidate_rx: AsyncMutex<Option<mpsc::UnboundedReceiver<CandidateInit>>>,
}

impl WebRtcEngine {
    pub async fn new(config: &CallConfig) -> Result<Self, MediaError> {
        let mut media_engine = RtcMediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|err| MediaError::Setup(err.to_string()))?;
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|err| MediaError::Setup(err.to_string()))?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .stun_servers
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|err| MediaError::Setup(err.to_string()))?,
        );

        attach_audio_transceiver(&peer).await?;

        let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
        peer.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = candidate_tx.clone();
            Box::pin(async move {
                // None marks the end of gathering
                let Some(candidate) = candidate else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx.send(CandidateInit {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid.unwrap_or_default(),
                            sdp_mline_index: init.sdp_mline_index.unwrap_or_default(),
                        });
                    }
                    Err(err) => {
                        debug!(error = %err, "local candidate could not be serialized");
                    }
                }
            })
        }));

        Ok(Self {
            peer,
            candidate_rx: AsyncMutex::new(Some(candidate_rx)),
        })
    }
}

async fn attach_audio_transceiver(
    peer: &Arc<RTCPeerConnection>,
) -> Result<Arc<RTCRtpTransceiver>, MediaError> {
    let track = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        "audio0".to_owned(),
        "stream0".to_owned(),
    ));
    peer.add_transceiver_from_track(
        track as Arc<dyn TrackLocal + Send + Sync>,
        Some(RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Sendrecv,
            send_encodings: vec![],
        }),
    )
    .await
    .map_err(|err| MediaError::Setup(err.to_string()))
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, MediaError> {
    let result = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    result.map_err(|err| MediaError::Description(err.to_string()))
}

#[async_trait]
impl MediaEngine for WebRtcEngine {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError> {
        let offer = self
            .peer
            .create_offer(None)
            .await
            .map_err(|err| MediaError::Description(err.to_string()))?;
        Ok(SessionDescription {
            kind: SdpKind::Offer,
            sdp: offer.sdp,
        })
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        let answer = self
            .peer
            .create_answer(None)
            .await
            .map_err(|err| MediaError::Description(err.to_string()))?;
        Ok(SessionDescription {
            kind: SdpKind::Answer,
            sdp: answer.sdp,
        })
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.peer
            .set_local_description(to_rtc_description(desc)?)
            .await
            .map_err(|err| MediaError::Description(err.to_string()))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.peer
            .set_remote_description(to_rtc_description(desc)?)
            .await
            .map_err(|err| MediaError::Description(err.to_string()))
    }

    async fn add_candidate(&self, candidate: CandidateInit) -> Result<(), MediaError> {
        self.peer
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: Some(candidate.sdp_mid),
                sdp_mline_index: Some(candidate.sdp_mline_index),
                ..Default::default()
            })
            .await
            .map_err(|err| MediaError::Candidate(err.to_string()))
    }

    async fn close(&self) {
        if let Err(err) = self.peer.close().await {
            debug!(error = %err, "peer connection close reported an error");
        }
    }

    async fn local_candidates(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<CandidateInit>, MediaError> {
        self.candidate_rx
            .lock()
            .await
            .take()
            .ok_or(MediaError::CandidatesTaken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offers_include_an_audio_section() {
        let engine = WebRtcEngine::new(&CallConfig::localhost())
            .await
            .expect("engine setup");
        let offer = engine.create_offer().await.expect("offer");
        assert_eq!(offer.kind, SdpKind::Offer);
        assert!(offer.sdp.contains("m=audio"), "offer: {}", offer.sdp);
    }

    #[tokio::test]
    async fn candidate_stream_is_single_consumer() {
        let engine = WebRtcEngine::new(&CallConfig::localhost())
            .await
            .expect("engine setup");
        assert!(engine.local_candidates().await.is_ok());
        assert!(matches!(
            engine.local_candidates().await,
            Err(MediaError::CandidatesTaken)
        ));
    }
}
