//! HTTP contract tests for the ElevenLabs synthesizer and its fallback.

use std::sync::Arc;
use std::time::Duration;

use brainstorm_speech::mock::{MockAudioPlayer, MockLocalSynthesizer};
use brainstorm_speech::{
    ElevenLabsSynthesizer, PlaybackPath, RemoteSynthesizer, SpeechError, SpeechOutcome,
    SpeechOutputService, SynthesisRequest, VoiceDefaults,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn synthesizer(server: &MockServer) -> ElevenLabsSynthesizer {
    ElevenLabsSynthesizer::new(
        server.uri(),
        Some("test-key".to_string()),
        "eleven_monolingual_v1",
        Duration::from_secs(5),
    )
    .unwrap()
}

fn request(text: &str) -> SynthesisRequest {
    SynthesisRequest {
        text: text.to_string(),
        voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
        stability: 0.5,
        similarity_boost: 0.75,
    }
}

#[tokio::test]
async fn test_synthesize_sends_expected_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
        .and(header("xi-api-key", "test-key"))
        .and(header("accept", "audio/mpeg"))
        .and(body_partial_json(serde_json::json!({
            "text": "Hello there",
            "model_id": "eleven_monolingual_v1",
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3-fake-mpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let audio = synthesizer(&server)
        .synthesize(&request("Hello there"))
        .await
        .unwrap();
    assert_eq!(audio, b"ID3-fake-mpeg".to_vec());
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = synthesizer(&server)
        .synthesize(&request("Hi"))
        .await
        .unwrap_err();
    match err {
        SpeechError::RemoteSynthesisFailed(reason) => assert!(reason.contains("401")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_payload_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(synthesizer(&server).synthesize(&request("Hi")).await.is_err());
}

#[tokio::test]
async fn test_server_error_falls_back_to_local_voice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let player = MockAudioPlayer::auto_finishing();
    let local = MockLocalSynthesizer::auto_finishing();
    let service = SpeechOutputService::new(VoiceDefaults::default())
        .with_remote(Arc::new(synthesizer(&server)), Arc::new(player.clone()))
        .with_local(Arc::new(local.clone()));

    let outcome = service.say("Tell me more").await.unwrap();
    assert_eq!(outcome, SpeechOutcome::Completed(PlaybackPath::Local));
    assert_eq!(player.log().count(), 0);
    assert_eq!(local.log().labels(), vec!["Tell me more".to_string()]);
    assert_eq!(service.fallback_count(), 1);
}

#[tokio::test]
async fn test_remote_audio_reaches_player() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mpeg-bytes".to_vec()))
        .mount(&server)
        .await;

    let player = MockAudioPlayer::auto_finishing();
    let service = SpeechOutputService::new(VoiceDefaults::default())
        .with_remote(Arc::new(synthesizer(&server)), Arc::new(player.clone()));

    let outcome = service.say("Hi").await.unwrap();
    assert_eq!(outcome, SpeechOutcome::Completed(PlaybackPath::Remote));
    assert_eq!(player.log().labels(), vec!["mpeg-bytes".to_string()]);
}
