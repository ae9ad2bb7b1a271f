//! MIDI wire codec: event model, streaming parser and serializer.

pub mod event;
pub mod parser;
pub mod serialize;

pub use event::MidiEvent;
pub use parser::ParserState;
pub use serialize::serialize;
