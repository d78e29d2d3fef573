//! voicenote - voice message recording, playback and media caching
//!
//! This crate records voice messages from the microphone with live level
//! metering, plays local or remote audio with status updates, keeps a TTL
//! index of locally cached media, and renders waveform bars for display.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, state machines, waveform math and errors
//! - **Application**: Recorder and player controllers, the audio session
//!   arbiter, the media cache store and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, rodio, flacenc, reqwest,
//!   JSON file storage, XDG config)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
