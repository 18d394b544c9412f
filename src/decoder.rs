//! SysEx debug-text decoding state machine
//!
//! Some devices wrap printable ASCII debug text in a vendor-tagged SysEx
//! envelope instead of using a dedicated serial channel. One decoder instance
//! consumes the raw byte stream of one MIDI source and recovers that text,
//! one byte at a time.

/// SysEx start status byte
pub const SYSEX_START: u8 = 0xF0;
/// SysEx end (EOX) status byte
pub const SYSEX_END: u8 = 0xF7;
/// First MIDI realtime status byte; realtime bytes are transparent to SysEx
pub const REALTIME_MIN: u8 = 0xF8;

/// Text buffer capacity per message segment
pub const CAPACITY: usize = 256;

/// Decoder options
#[derive(Debug, Clone, Copy)]
pub struct DecoderConfig {
    /// Vendor id byte expected right after 0xF0; only matching messages
    /// are captured
    pub vendor_id: u8,
    /// Treat any non-realtime status byte inside a message as an abort, as
    /// the MIDI specification requires. Off by default: many devices
    /// interleave status bytes without meaning to kill the SysEx.
    pub respect_interrupt: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x70,
            respect_interrupt: false,
        }
    }
}

/// A piece of text recovered from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// Cleanly terminated message
    Line(String),
    /// Buffer filled up before the message ended; more data follows
    LineTruncated(String),
    /// Message was interrupted before its end byte
    LineAborted(String),
}

impl Emission {
    pub fn text(&self) -> &str {
        match self {
            Emission::Line(t) | Emission::LineTruncated(t) | Emission::LineAborted(t) => t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    WaitingId,
    Reading,
}

/// Per-source decoder. Holds at most [`CAPACITY`] bytes of pending text;
/// longer messages are flushed in [`Emission::LineTruncated`] chunks.
pub struct Decoder {
    config: DecoderConfig,
    state: State,
    buffer: [u8; CAPACITY],
    len: usize,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            buffer: [0; CAPACITY],
            len: 0,
        }
    }

    /// Consume one raw MIDI byte, returning at most one completed emission.
    pub fn process(&mut self, byte: u8) -> Option<Emission> {
        // SysEx start restarts the parse from any state. An in-progress
        // message is surfaced as aborted rather than silently dropped.
        if byte == SYSEX_START {
            let emission = if self.state == State::Reading && self.len > 0 {
                Some(Emission::LineAborted(self.take_text()))
            } else {
                None
            };
            self.state = State::WaitingId;
            return emission;
        }

        match self.state {
            State::Idle => None,
            State::WaitingId => {
                if byte == self.config.vendor_id {
                    self.state = State::Reading;
                    self.len = 0;
                } else {
                    // SysEx from some other vendor: skip its body entirely
                    self.state = State::Idle;
                }
                None
            }
            State::Reading => {
                if byte == SYSEX_END {
                    self.state = State::Idle;
                    if self.len == 0 {
                        return None;
                    }
                    return Some(Emission::Line(self.take_text()));
                }
                if byte < 0x80 {
                    // Flush a full buffer and keep reading into a fresh
                    // segment so long messages are chunked, not dropped
                    let emission = if self.len == CAPACITY {
                        Some(Emission::LineTruncated(self.take_text()))
                    } else {
                        None
                    };
                    self.buffer[self.len] = byte;
                    self.len += 1;
                    return emission;
                }
                if self.config.respect_interrupt && byte < REALTIME_MIN {
                    let emission = if self.len > 0 {
                        Some(Emission::LineAborted(self.take_text()))
                    } else {
                        None
                    };
                    self.state = State::Idle;
                    return emission;
                }
                // Realtime bytes are transparent to an ongoing message
                None
            }
        }
    }

    fn take_text(&mut self) -> String {
        // Only 7-bit data bytes ever reach the buffer, so this is plain ASCII
        let text = String::from_utf8_lossy(&self.buffer[..self.len]).into_owned();
        self.len = 0;
        text
    }
}
