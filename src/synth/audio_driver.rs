//! Audio output for the fluidsynth backend, grounded in
//! `midi_backend_fluidsynth.c`'s `vm_backend_audio_driver_new`/`_free`
//! (`new_fluid_audio_driver`/`delete_fluid_audio_driver`). The `fluidlite`
//! crate has no audio-driver API of its own, so rendering is pulled through a
//! `cpal` output stream instead, the way `ivanfourie-midi-play` and this
//! project's own `audio::device` helpers open output devices.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fluidlite::Synth;
use log::warn;

use super::BackendOptions;
use crate::error::Error;

/// Owns the live `cpal::Stream`; dropping it tears down audio output,
/// mirroring `vm_backend_audio_driver_free`.
pub struct AudioDriver {
    stream: cpal::Stream,
}

impl AudioDriver {
    pub fn new(synth: Arc<Mutex<Synth>>, opts: &BackendOptions) -> Result<Self, Error> {
        let device = find_device(opts.device.as_deref())?;
        let config = device.default_output_config().map_err(|e| {
            warn!("fluidsynth audio driver: no output config: {e}");
            Error::Io
        })?;

        {
            let s = synth.lock().unwrap();
            s.set_sample_rate(config.sample_rate().0 as f32);
        }

        let err_fn = |e| warn!("fluidsynth audio stream error: {e}");
        let stream_cfg = config.config();
        let stream = match config.sample_format() {
            cpal::SampleFormat::I16 => {
                let synth = Arc::clone(&synth);
                device.build_output_stream(
                    &stream_cfg,
                    move |out: &mut [i16], _| {
                        if let Err(e) = synth.lock().unwrap().write(out) {
                            warn!("fluidsynth render (i16) failed: {e}");
                        }
                    },
                    err_fn,
                    None,
                )
            }
            _ => {
                let synth = Arc::clone(&synth);
                device.build_output_stream(
                    &stream_cfg,
                    move |out: &mut [f32], _| {
                        if let Err(e) = synth.lock().unwrap().write(out) {
                            warn!("fluidsynth render (f32) failed: {e}");
                        }
                    },
                    err_fn,
                    None,
                )
            }
        }
        .map_err(|e| {
            warn!("fluidsynth audio driver: failed to build output stream: {e}");
            Error::Io
        })?;

        stream.play().map_err(|e| {
            warn!("fluidsynth audio driver: failed to start output stream: {e}");
            Error::Io
        })?;

        Ok(Self { stream })
    }
}

// `cpal::Stream` is not `Send` on some backends; `FluidSynthBackend` holding
// one only ever runs from the worker thread that opened it, so the stream
// never actually crosses threads.
unsafe impl Send for AudioDriver {}

fn find_device(name: Option<&str>) -> Result<cpal::Device, Error> {
    let host = cpal::default_host();
    match name {
        Some(n) => host
            .output_devices()
            .map_err(|e| {
                warn!("fluidsynth audio driver: failed to enumerate output devices: {e}");
                Error::Io
            })?
            .find(|d| d.name().map(|dn| dn == n).unwrap_or(false))
            .ok_or_else(|| {
                warn!("fluidsynth audio driver: output device '{n}' not found");
                Error::Io
            }),
        None => host.default_output_device().ok_or_else(|| {
            warn!("fluidsynth audio driver: no default output device");
            Error::Io
        }),
    }
}
