//! `/dev/sequencer` device engine, grounded in `dev_oss_sequencer.c`'s
//! `vm_open`/`vm_write`/`vm_ioctl`/`vm_poll` and `vm_backend_event_write`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::warn;

use super::record::{self, RecordError, SequencerRecord, TimerCommand};
use super::timer::Timer;
use crate::cuse::{CharDeviceOps, CuseStatus, PollMask};
use crate::midi::event::MIDI_SYSTEM_RESET;
use crate::midi::serialize;
use crate::midi::MidiEvent;

struct Inner {
    devs: Vec<Box<dyn CharDeviceOps>>,
    names: Vec<String>,
    timer: Timer,
}

pub struct SequencerHandle {
    tx_busy: AtomicBool,
    inner: Mutex<Inner>,
}

impl SequencerHandle {
    pub fn new(devs: Vec<Box<dyn CharDeviceOps>>, names: Vec<String>) -> Self {
        Self {
            tx_busy: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                devs,
                names,
                timer: Timer::new(),
            }),
        }
    }

    fn write_to_dev(inner: &mut Inner, dev: u8, bytes: &[u8]) -> Result<(), CuseStatus> {
        let port = inner
            .devs
            .get_mut(dev as usize)
            .ok_or(CuseStatus::Invalid)?;
        let mut written = 0;
        while written < bytes.len() {
            let n = port.write(&bytes[written..])?;
            if n == 0 {
                return Err(CuseStatus::Invalid);
            }
            written += n;
        }
        Ok(())
    }

    /// Applies one decoded record. Each branch acquires `self.inner` only for
    /// the duration of the state it actually touches — in particular, timer
    /// waits release the lock before sleeping (see `apply_timer`), so a
    /// `TMR_WAIT_REL`/`TMR_WAIT_ABS` on one handle's write never blocks an
    /// `ioctl` on the same handle from another thread for the wait's
    /// duration.
    fn apply_record(&self, rec: SequencerRecord) {
        match rec {
            SequencerRecord::MidiPutc { dev, byte } => {
                let mut inner = self.inner.lock().unwrap();
                if let Err(e) = Self::write_to_dev(&mut inner, dev, &[byte]) {
                    warn!("sequencer: midiputc to unit {dev} failed: {e:?}");
                }
            }
            SequencerRecord::Voice { dev, event } => {
                let mut buf = [0u8; crate::midi::event::SYSEX_MAX_MSG_SIZE + 8];
                match serialize(&event, &mut buf) {
                    Ok((n, _)) => {
                        let mut inner = self.inner.lock().unwrap();
                        if let Err(e) = Self::write_to_dev(&mut inner, dev, &buf[..n]) {
                            warn!("sequencer: event write to unit {dev} failed: {e:?}");
                        }
                    }
                    Err(e) => warn!("sequencer: failed to serialize downstream event: {e}"),
                }
            }
            SequencerRecord::Timer(cmd) => self.apply_timer(cmd),
            SequencerRecord::Unhandled => {}
        }
    }

    /// Mutates/reads timer state under the lock but never sleeps while
    /// holding it: `WaitRel`/`WaitAbs` compute the sleep duration, drop the
    /// guard, then sleep.
    fn apply_timer(&self, cmd: TimerCommand) {
        match cmd {
            TimerCommand::WaitRel(ticks) => {
                let duration = self.inner.lock().unwrap().timer.ticks_to_duration(ticks);
                std::thread::sleep(duration);
            }
            TimerCommand::WaitAbs(ticks) => {
                let remaining = self.inner.lock().unwrap().timer.wait_abs_remaining(ticks);
                if let Some(d) = remaining {
                    std::thread::sleep(d);
                }
            }
            TimerCommand::Stop => self.inner.lock().unwrap().timer.stop(),
            TimerCommand::Start => self.inner.lock().unwrap().timer.start(),
            TimerCommand::Continue => self.inner.lock().unwrap().timer.resume(),
            TimerCommand::Tempo(t) => self.inner.lock().unwrap().timer.set_tempo(t),
            TimerCommand::TimerBase(b) => self.inner.lock().unwrap().timer.set_base(b),
            TimerCommand::Unhandled => {}
        }
    }

    fn reset_all(inner: &mut Inner) {
        let evt = MidiEvent::real_time(MIDI_SYSTEM_RESET);
        let mut buf = [0u8; 4];
        if let Ok((n, _)) = serialize(&evt, &mut buf) {
            for idx in 0..inner.devs.len() {
                if let Err(e) = Self::write_to_dev(inner, idx as u8, &buf[..n]) {
                    warn!("sequencer: reset of unit {idx} failed: {e:?}");
                }
            }
        }
    }
}

impl CharDeviceOps for SequencerHandle {
    fn write(&mut self, data: &[u8]) -> Result<usize, CuseStatus> {
        if self.tx_busy.swap(true, Ordering::AcqRel) {
            return Err(CuseStatus::Busy);
        }
        let result = (|| {
            let mut offset = 0usize;
            while offset < data.len() {
                // Re-read the device count per record rather than holding
                // `inner` locked across `apply_record`, which may itself
                // lock `inner` again (timer waits release it before
                // sleeping) — a held outer guard here would deadlock.
                let devs_count = self.inner.lock().unwrap().devs.len();
                let (consumed, record) = record::parse_record(&data[offset..], devs_count);
                if consumed == 0 {
                    // Truncated record: stop and report what was consumed so
                    // far, the remainder arrives on the next write.
                    break;
                }
                match record {
                    Ok(rec) => self.apply_record(rec),
                    Err(RecordError::UnknownDevice) | Err(RecordError::BadEventType) => {
                        // Reference still consumes the record on error.
                    }
                }
                offset += consumed;
            }
            Ok(offset)
        })();
        self.tx_busy.store(false, Ordering::Release);
        result
    }

    fn ioctl(&mut self, cmd: u32, data_in: &[u8], data_out: &mut [u8]) -> Result<usize, CuseStatus> {
        use ioctl::*;
        match cmd {
            FIOASYNC | FIONBIO => Ok(0),
            FIONREAD => {
                if !data_out.is_empty() {
                    data_out[0] = 0;
                }
                Ok(data_out.len().min(4))
            }
            FIONWRITE => {
                let cap = 4096u32.to_ne_bytes();
                let n = cap.len().min(data_out.len());
                data_out[..n].copy_from_slice(&cap[..n]);
                Ok(n)
            }
            SNDCTL_TMR_TIMEBASE | SNDCTL_TMR_START | SNDCTL_TMR_STOP | SNDCTL_TMR_CONTINUE
            | SNDCTL_TMR_TEMPO => {
                let mut raw = [0u8; 4];
                let n = data_in.len().min(4);
                raw[..n].copy_from_slice(&data_in[..n]);
                let param = u32::from_le_bytes(raw);
                let timer_cmd = match cmd {
                    SNDCTL_TMR_TIMEBASE => TimerCommand::TimerBase(param.clamp(1, 1000)),
                    SNDCTL_TMR_START => TimerCommand::Start,
                    SNDCTL_TMR_STOP => TimerCommand::Stop,
                    SNDCTL_TMR_CONTINUE => TimerCommand::Continue,
                    SNDCTL_TMR_TEMPO => TimerCommand::Tempo(param.clamp(8, 360)),
                    _ => unreachable!(),
                };
                self.apply_timer(timer_cmd);
                Ok(0)
            }
            SNDCTL_TMR_SOURCE | SNDCTL_TMR_METRONOME | SNDCTL_TMR_SELECT => Ok(0),
            SNDCTL_SEQ_RESET | SNDCTL_SEQ_PANIC => {
                let mut inner = self.inner.lock().unwrap();
                Self::reset_all(&mut inner);
                Ok(0)
            }
            SNDCTL_SEQ_SYNC => Ok(0),
            SNDCTL_SYNTH_INFO | SNDCTL_MIDI_INFO => {
                let inner = self.inner.lock().unwrap();
                let unit = *data_in.first().unwrap_or(&0) as usize;
                let name = inner
                    .names
                    .get(unit)
                    .map(String::as_str)
                    .unwrap_or("");
                let bytes = name.as_bytes();
                let n = bytes.len().min(data_out.len());
                data_out[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            SNDCTL_SEQ_CTRLRATE => {
                // Read-only: reject any attempt to write a nonzero value.
                if data_in.iter().any(|&b| b != 0) {
                    return Err(CuseStatus::Invalid);
                }
                Ok(0)
            }
            SNDCTL_SEQ_NRSYNTHS | SNDCTL_SEQ_NRMIDIS => {
                let inner = self.inner.lock().unwrap();
                let count = (inner.devs.len() as u32).to_ne_bytes();
                let n = count.len().min(data_out.len());
                data_out[..n].copy_from_slice(&count[..n]);
                Ok(n)
            }
            SNDCTL_SEQ_OUTOFBAND => {
                let devs_count = self.inner.lock().unwrap().devs.len();
                let (_, record) = record::parse_record(data_in, devs_count);
                if let Ok(rec) = record {
                    self.apply_record(rec);
                }
                Ok(0)
            }
            SNDCTL_SEQ_GETTIME => {
                let inner = self.inner.lock().unwrap();
                let ticks = inner.timer.elapsed_ticks() as u32;
                let bytes = ticks.to_ne_bytes();
                let n = bytes.len().min(data_out.len());
                data_out[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            SNDCTL_FM_4OP_ENABLE | SNDCTL_PMGR_ACCESS | SNDCTL_PMGR_IFACE => {
                Err(CuseStatus::Invalid)
            }
            _ => Err(CuseStatus::Invalid),
        }
    }

    fn poll(&self) -> PollMask {
        PollMask {
            readable: false,
            writable: !self.tx_busy.load(Ordering::Acquire),
        }
    }
}

/// ioctl request numbers, named after the `SNDCTL_*`/`FIO*` constants the
/// reference switches on.
pub mod ioctl {
    pub const FIOASYNC: u32 = 1;
    pub const FIONBIO: u32 = 2;
    pub const FIONREAD: u32 = 3;
    pub const FIONWRITE: u32 = 4;
    pub const SNDCTL_TMR_TIMEBASE: u32 = 10;
    pub const SNDCTL_TMR_START: u32 = 11;
    pub const SNDCTL_TMR_STOP: u32 = 12;
    pub const SNDCTL_TMR_CONTINUE: u32 = 13;
    pub const SNDCTL_TMR_TEMPO: u32 = 14;
    pub const SNDCTL_TMR_SOURCE: u32 = 15;
    pub const SNDCTL_TMR_METRONOME: u32 = 16;
    pub const SNDCTL_TMR_SELECT: u32 = 17;
    pub const SNDCTL_SEQ_RESET: u32 = 18;
    pub const SNDCTL_SEQ_PANIC: u32 = 19;
    pub const SNDCTL_SEQ_SYNC: u32 = 20;
    pub const SNDCTL_SYNTH_INFO: u32 = 21;
    pub const SNDCTL_SEQ_CTRLRATE: u32 = 22;
    pub const SNDCTL_SEQ_NRSYNTHS: u32 = 23;
    pub const SNDCTL_SEQ_NRMIDIS: u32 = 24;
    pub const SNDCTL_MIDI_INFO: u32 = 25;
    pub const SNDCTL_SEQ_OUTOFBAND: u32 = 26;
    pub const SNDCTL_SEQ_GETTIME: u32 = 27;
    pub const SNDCTL_FM_4OP_ENABLE: u32 = 28;
    pub const SNDCTL_PMGR_ACCESS: u32 = 29;
    pub const SNDCTL_PMGR_IFACE: u32 = 30;
}
