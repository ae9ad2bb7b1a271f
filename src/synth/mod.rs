//! Synth backend adapter: the seam between the decoded MIDI event stream and
//! whatever actually makes sound. Grounded in `midi_backend.h`'s opaque
//! `vmb_synth_p` / `vm_backend_event_handle` contract.

pub mod null;

#[cfg(feature = "fluidsynth")]
pub mod audio_driver;
#[cfg(feature = "fluidsynth")]
pub mod fluid;

use crate::error::Error;
use crate::midi::MidiEvent;

/// Construction options for a backend, mirroring `vmb_options_t`.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub driver: Option<String>,
    pub device: Option<String>,
    pub soundfont: Option<String>,
}

/// A synthesizer capable of reacting to decoded MIDI events.
///
/// Implementations return:
/// - `Error::Unsupported` for real-time messages the backend has no use for
///   (the caller treats this as success, per `EOPNOTSUPP` in the reference),
/// - `Error::Domain` for a well-formed but out-of-range event it has no
///   dispatch for at all,
/// - `Error::Io` if the underlying synth call itself failed.
pub trait SynthBackend: Send {
    fn handle(&mut self, evt: &MidiEvent) -> Result<(), Error>;
}

/// Dispatches `evt` through `backend`, applying the same "real-time bytes are
/// tolerated failures" rule the reference's `vm_backend_event_handle` callers
/// use: `Unsupported` on a real-time event is swallowed, everything else
/// propagates.
pub fn dispatch(backend: &mut dyn SynthBackend, evt: &MidiEvent) -> Result<(), Error> {
    match backend.handle(evt) {
        Err(Error::Unsupported) if evt.is_real_time() => Ok(()),
        other => other,
    }
}
