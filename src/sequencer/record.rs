//! `/dev/sequencer` record parsing and opcode dispatch, grounded in
//! `dev_oss_sequencer.c`'s `vm_sequencer_event_handle`.

use crate::midi::event::{
    MIDI_CHN_PRESSURE, MIDI_CTL_CHANGE, MIDI_KEY_PRESSURE, MIDI_NOTEOFF, MIDI_NOTEON,
    MIDI_PGM_CHANGE, MIDI_PITCH_BEND,
};
use crate::midi::MidiEvent;

pub const SEQ_MIDIPUTC: u8 = 5;
pub const EV_TIMING: u8 = 0x81;
pub const EV_CHN_COMMON: u8 = 0x92;
pub const EV_CHN_VOICE: u8 = 0x93;
pub const EV_SYSEX: u8 = 0x94;
pub const SEQ_FULLSIZE: u8 = 0xfd;

pub const TMR_WAIT_REL: u8 = 1;
pub const TMR_WAIT_ABS: u8 = 2;
pub const TMR_STOP: u8 = 3;
pub const TMR_START: u8 = 4;
pub const TMR_CONTINUE: u8 = 5;
pub const TMR_TEMPO: u8 = 6;
pub const TMR_TIMERBASE: u8 = 15;

/// A decoded `/dev/sequencer` record, or the reason it could not be turned
/// into one. `Unhandled` mirrors the reference's silent-default arm: the
/// record is well-formed and fully consumed, it simply carries no action.
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerRecord<'a> {
    /// `SEQ_MIDIPUTC`: one raw byte destined for MIDI device `dev`.
    MidiPutc { dev: u8, byte: u8 },
    /// `EV_TIMING`.
    Timer(TimerCommand),
    /// `EV_CHN_COMMON` / `EV_CHN_VOICE` / `EV_SYSEX`, already decoded into the
    /// shared MIDI event model.
    Voice { dev: u8, event: MidiEvent<'a> },
    Unhandled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    WaitRel(u32),
    WaitAbs(u32),
    Stop,
    Start,
    Continue,
    Tempo(u32),
    TimerBase(u32),
    Unhandled,
}

/// Errors that abort the *current record* but do not change how many bytes
/// are consumed — `dev_oss_sequencer.c`'s `err_out:` label still returns
/// `ev_size`, so a rejected record is still fully consumed, not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    UnknownDevice,
    BadEventType,
}

/// Parses one record from the front of `buf`. Returns the number of bytes
/// consumed and the decoded record (or the reason parsing the body failed).
/// A `buf.len()` that is shorter than the record's required size consumes
/// nothing — `0` is returned — so the caller re-invokes once more data has
/// arrived, matching the reference's truncated-record short-circuit.
pub fn parse_record(buf: &[u8], devs_count: usize) -> (usize, Result<SequencerRecord<'_>, RecordError>) {
    if buf.is_empty() {
        return (0, Ok(SequencerRecord::Unhandled));
    }
    let ev_size = if buf[0] >= 128 { 8 } else { 4 };
    if buf.len() < ev_size {
        return (0, Ok(SequencerRecord::Unhandled));
    }

    if buf[0] == SEQ_FULLSIZE {
        // No long-event reconstruction: the whole remaining buffer is
        // drained and discarded. See SPEC_FULL.md §9 Open Question 2.
        return (buf.len(), Ok(SequencerRecord::Unhandled));
    }

    let record = decode(buf, devs_count);
    (ev_size, record)
}

fn decode(pbuf: &[u8], devs_count: usize) -> Result<SequencerRecord<'_>, RecordError> {
    match pbuf[0] {
        SEQ_MIDIPUTC => {
            let dev = pbuf[2];
            if devs_count <= dev as usize {
                return Err(RecordError::UnknownDevice);
            }
            Ok(SequencerRecord::MidiPutc {
                dev,
                byte: pbuf[1],
            })
        }
        EV_TIMING => Ok(SequencerRecord::Timer(decode_timer(pbuf))),
        EV_CHN_COMMON => {
            let dev = pbuf[1];
            if devs_count <= dev as usize {
                return Err(RecordError::UnknownDevice);
            }
            let kind = pbuf[2];
            let chan = pbuf[3];
            let p1 = pbuf[4] as u32;
            let event = match kind {
                MIDI_CTL_CHANGE => {
                    let w14 = u16::from_le_bytes([pbuf[6], pbuf[7]]) as u32;
                    MidiEvent::channel_message(kind, chan, p1, w14)
                }
                MIDI_PGM_CHANGE | MIDI_CHN_PRESSURE => {
                    MidiEvent::channel_message(kind, chan, p1, 0)
                }
                MIDI_PITCH_BEND => {
                    let w14 = u16::from_le_bytes([pbuf[6], pbuf[7]]) as u32;
                    MidiEvent::channel_message(kind, chan, w14, 0)
                }
                _ => return Err(RecordError::BadEventType),
            };
            Ok(SequencerRecord::Voice { dev, event })
        }
        EV_CHN_VOICE => {
            let dev = pbuf[1];
            if devs_count <= dev as usize {
                return Err(RecordError::UnknownDevice);
            }
            let kind = pbuf[2];
            let chan = pbuf[3];
            let p1 = pbuf[4] as u32;
            let p2 = pbuf[5] as u32;
            match kind {
                MIDI_NOTEOFF | MIDI_NOTEON | MIDI_KEY_PRESSURE => Ok(SequencerRecord::Voice {
                    dev,
                    event: MidiEvent::channel_message(kind, chan, p1, p2),
                }),
                _ => Err(RecordError::BadEventType),
            }
        }
        EV_SYSEX => {
            let dev = pbuf[1];
            if devs_count <= dev as usize {
                return Err(RecordError::UnknownDevice);
            }
            let mut len = 0usize;
            while len < 6 && pbuf[2 + len] != 0xff {
                len += 1;
            }
            Ok(SequencerRecord::Voice {
                dev,
                event: MidiEvent::sysex(&pbuf[2..2 + len]),
            })
        }
        _ => Ok(SequencerRecord::Unhandled),
    }
}

fn decode_timer(pbuf: &[u8]) -> TimerCommand {
    let param = || u32::from_le_bytes([pbuf[4], pbuf[5], pbuf[6], pbuf[7]]);
    match pbuf[1] {
        TMR_WAIT_REL => TimerCommand::WaitRel(param()),
        TMR_WAIT_ABS => TimerCommand::WaitAbs(param()),
        TMR_STOP => TimerCommand::Stop,
        TMR_START => TimerCommand::Start,
        TMR_CONTINUE => TimerCommand::Continue,
        TMR_TEMPO => TimerCommand::Tempo(param().clamp(8, 360)),
        TMR_TIMERBASE => TimerCommand::TimerBase(param().clamp(1, 1000)),
        _ => TimerCommand::Unhandled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_record_consumes_nothing() {
        let (n, _) = parse_record(&[0x90], 1);
        assert_eq!(n, 0);
    }

    #[test]
    fn midiputc_decodes_device_and_byte() {
        let (n, rec) = parse_record(&[SEQ_MIDIPUTC, 0x90, 0], 1);
        assert_eq!(n, 4);
        assert_eq!(rec, Ok(SequencerRecord::MidiPutc { dev: 0, byte: 0x90 }));
    }

    #[test]
    fn unknown_device_is_rejected_but_still_consumed() {
        let (n, rec) = parse_record(&[SEQ_MIDIPUTC, 0x90, 5], 1);
        assert_eq!(n, 4);
        assert_eq!(rec, Err(RecordError::UnknownDevice));
    }

    #[test]
    fn chn_voice_note_on_decodes() {
        let buf = [EV_CHN_VOICE, 0, MIDI_NOTEON, 2, 60, 100, 0, 0];
        let (n, rec) = parse_record(&buf, 1);
        assert_eq!(n, 8);
        assert_eq!(
            rec,
            Ok(SequencerRecord::Voice {
                dev: 0,
                event: MidiEvent::channel_message(MIDI_NOTEON, 2, 60, 100)
            })
        );
    }

    #[test]
    fn chn_voice_rejects_non_voice_type() {
        let buf = [EV_CHN_VOICE, 0, MIDI_CTL_CHANGE, 0, 0, 0, 0, 0];
        let (_, rec) = parse_record(&buf, 1);
        assert_eq!(rec, Err(RecordError::BadEventType));
    }

    #[test]
    fn chn_common_pitch_bend_reads_14_bit_at_offset6() {
        let buf = [EV_CHN_COMMON, 0, MIDI_PITCH_BEND, 1, 0, 0, 0x40, 0x20];
        let (_, rec) = parse_record(&buf, 1);
        assert_eq!(
            rec,
            Ok(SequencerRecord::Voice {
                dev: 0,
                event: MidiEvent::channel_message(MIDI_PITCH_BEND, 1, 0x40 | (0x20 << 8), 0)
            })
        );
    }

    #[test]
    fn sysex_scans_up_to_six_bytes_for_sentinel() {
        let buf = [EV_SYSEX, 0, 0x01, 0x02, 0xff, 0, 0, 0];
        let (n, rec) = parse_record(&buf, 1);
        assert_eq!(n, 8);
        assert_eq!(
            rec,
            Ok(SequencerRecord::Voice {
                dev: 0,
                event: MidiEvent::sysex(&[0x01, 0x02])
            })
        );
    }

    #[test]
    fn timer_tempo_clamps_to_valid_range() {
        let buf = [EV_TIMING, TMR_TEMPO, 0, 0, 4, 0, 0, 0];
        let (_, rec) = parse_record(&buf, 0);
        assert_eq!(rec, Ok(SequencerRecord::Timer(TimerCommand::Tempo(8))));
    }

    #[test]
    fn fullsize_drains_remainder_with_no_event() {
        let buf = [SEQ_FULLSIZE, 0, 0, 0, 1, 2, 3, 4];
        let (n, rec) = parse_record(&buf, 0);
        assert_eq!(n, 8);
        assert_eq!(rec, Ok(SequencerRecord::Unhandled));
    }
}
