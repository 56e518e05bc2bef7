//! Brainstorm speech crate - spoken output with a fallback chain, and one-shot voice input.
//!
//! `SpeechOutputService` narrates text through a primary remote synthesizer
//! (ElevenLabs-style HTTP API) and falls back to a local voice, keeping at most
//! one playback active. `SpeechInputService` wraps a single-shot recognizer in a
//! last-call-wins listening session. Host capabilities sit behind traits so the
//! services can be driven by real processes or by the mocks in [`mock`].

pub mod capability;
pub mod elevenlabs;
pub mod error;
pub mod input;
pub mod mock;
pub mod output;
pub mod process;

pub use capability::{
    AudioPlayer, LocalSynthesizer, LocalVoiceParams, PlaybackControl, PlaybackHandle,
    PlaybackResult, Recognizer, RemoteSynthesizer, SynthesisRequest,
};
pub use elevenlabs::ElevenLabsSynthesizer;
pub use error::SpeechError;
pub use input::{ListenOutcome, ListeningState, SpeechInputService};
pub use output::{
    welcome_text, PlaybackPath, SpeakOptions, SpeechOutcome, SpeechOutputService, VoiceDefaults,
};
pub use process::{CommandPlayer, CommandRecognizer, CommandSynthesizer};
