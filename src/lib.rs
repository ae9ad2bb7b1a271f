//! Synthesized MIDI output device and legacy OSS `/dev/sequencer` multiplexer,
//! implemented as a pair of CUSE-style character-device servers.
//!
//! The crate is organized the way the reference implementation is: a shared
//! MIDI wire codec (`midi`), an adapter seam to an actual synthesizer
//! (`synth`), the per-device engines that drive the codec from byte streams
//! (`midi_device`, `sequencer`), and the character-device contract
//! (`cuse`)/worker pool (`worker`) those engines run behind.

pub mod config;
pub mod cuse;
pub mod error;
pub mod ffi;
pub mod midi;
pub mod midi_device;
pub mod sequencer;
pub mod synth;
pub mod worker;

pub use config::VirtualMidiConfig;
pub use error::Error;
