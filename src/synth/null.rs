//! Default no-op backend: logs what it receives and accepts every channel
//! message, same shape the reference falls back to when no real audio
//! backend is configured.

use log::debug;

use super::{BackendOptions, SynthBackend};
use crate::error::Error;
use crate::midi::MidiEvent;

pub struct NullSynth {
    label: String,
}

impl NullSynth {
    pub fn new(opts: &BackendOptions) -> Self {
        Self {
            label: opts.device.clone().unwrap_or_else(|| "null".to_string()),
        }
    }
}

impl SynthBackend for NullSynth {
    fn handle(&mut self, evt: &MidiEvent) -> Result<(), Error> {
        if evt.is_real_time() {
            return Err(Error::Unsupported);
        }
        debug!(
            "{}: kind=0x{:02X} chan={} p1={} p2={} ex_data={:?}",
            self.label,
            evt.kind,
            evt.channel,
            evt.p1,
            evt.p2,
            evt.ex_data.map(|d| d.len())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::event::{MIDI_NOTEON, MIDI_SYNC};

    #[test]
    fn accepts_channel_messages() {
        let mut synth = NullSynth::new(&BackendOptions::default());
        let evt = MidiEvent::channel_message(MIDI_NOTEON, 0, 60, 100);
        assert!(synth.handle(&evt).is_ok());
    }

    #[test]
    fn reports_unsupported_for_real_time() {
        let mut synth = NullSynth::new(&BackendOptions::default());
        assert_eq!(
            synth.handle(&MidiEvent::real_time(MIDI_SYNC)),
            Err(Error::Unsupported)
        );
    }
}
