//! FluidSynth-backed synth, behind the `fluidsynth` feature. Grounded in
//! `midi_backend_fluidsynth.c`'s dispatch table: every `fluid_synth_*` call
//! there maps to one match arm here.

use std::sync::{Arc, Mutex};

use fluidlite::{Settings, Synth};
use log::warn;

use super::audio_driver::AudioDriver;
use super::{BackendOptions, SynthBackend};
use crate::error::Error;
use crate::midi::event::{
    MIDI_CHN_PRESSURE, MIDI_CTL_CHANGE, MIDI_KEY_PRESSURE, MIDI_NOTEOFF, MIDI_NOTEON,
    MIDI_PGM_CHANGE, MIDI_PITCH_BEND, MIDI_SYSEX, MIDI_SYSTEM_RESET,
};
use crate::midi::MidiEvent;

pub struct FluidSynthBackend {
    synth: Arc<Mutex<Synth>>,
    // Held only for its drop glue: tears down the output stream when the
    // backend is dropped, mirroring `vm_backend_audio_driver_free`.
    _audio: AudioDriver,
}

impl FluidSynthBackend {
    pub fn new(opts: &BackendOptions) -> Result<Self, Error> {
        let settings = Settings::new().map_err(|e| {
            warn!("fluidsynth settings init failed: {e}");
            Error::Io
        })?;
        if let Some(soundfont) = &opts.soundfont {
            let _ = settings.setstr("synth.default-soundfont", soundfont);
        }

        let synth = Synth::new(settings).map_err(|e| {
            warn!("fluidsynth synth init failed: {e}");
            Error::Io
        })?;

        if let Some(soundfont) = &opts.soundfont {
            synth.sfload(soundfont, true).map_err(|e| {
                warn!("failed to load soundfont {soundfont}: {e}");
                Error::Io
            })?;
        }

        let synth = Arc::new(Mutex::new(synth));
        let audio = AudioDriver::new(Arc::clone(&synth), opts)?;

        Ok(Self {
            synth,
            _audio: audio,
        })
    }
}

impl SynthBackend for FluidSynthBackend {
    fn handle(&mut self, evt: &MidiEvent) -> Result<(), Error> {
        let synth = self.synth.lock().unwrap();
        let chan = evt.channel as i32;
        let result = match evt.kind {
            MIDI_NOTEOFF => synth.note_off(chan, evt.p1 as u32),
            MIDI_NOTEON => synth.note_on(chan, evt.p1 as u32, evt.p2 as u32),
            MIDI_KEY_PRESSURE => synth.key_pressure(chan, evt.p1 as u32, evt.p2 as u32),
            MIDI_CTL_CHANGE => synth.cc(chan, evt.p1 as u32, evt.p2 as u32),
            MIDI_PGM_CHANGE => synth.program_change(chan, evt.p1 as u32),
            MIDI_CHN_PRESSURE => synth.channel_pressure(chan, evt.p1 as u32),
            MIDI_PITCH_BEND => synth.pitch_bend(chan, evt.p1 as u32),
            MIDI_SYSEX => {
                let data = evt.ex_data.ok_or(Error::InvalidArgument)?;
                synth.sysex(data, None)
            }
            MIDI_SYSTEM_RESET => synth.system_reset(),
            k if k >= 0xF8 => return Err(Error::Unsupported),
            _ => return Err(Error::Domain),
        };
        result.map_err(|e| {
            warn!("fluidsynth event dispatch failed: {e}");
            Error::Io
        })
    }
}
