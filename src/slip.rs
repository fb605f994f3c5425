//! SLIP framing
//!
//! Byte stream framing for feeding encoded messages in and out of the VM
//! over serial-style transports. Complete frames must be a multiple of 4
//! bytes, since they carry OSC-encoded data. As a convenience for serial
//! consoles, a bare newline-terminated line that contains no NUL byte is
//! accepted as one address-only message: the text is NUL-terminated,
//! padded, and an empty typetag string is appended.

pub const END: u8 = 0xC0;
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

/// SLIP-encode `src`, including the trailing END delimiter.
pub fn encode(src: &[u8]) -> Vec<u8> {
    let mut dest = Vec::with_capacity(src.len() + 1);
    for &c in src {
        match c {
            END => dest.extend_from_slice(&[ESC, ESC_END]),
            ESC => dest.extend_from_slice(&[ESC, ESC_ESC]),
            _ => dest.push(c),
        }
    }
    dest.push(END);
    dest
}

/// What a fed byte produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipEvent {
    /// More bytes are needed.
    Pending,
    /// A complete frame is available from [`SlipDecoder::frame`].
    Frame,
    /// A delimiter arrived but the accumulated frame was not a multiple
    /// of 4 bytes, or the frame overflowed; the partial data was dropped.
    BadFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the first byte of a frame.
    Idle,
    Frame,
    Escape,
    /// Discarding until the next END.
    Error,
}

/// Incremental SLIP decoder with a bounded frame buffer.
#[derive(Debug)]
pub struct SlipDecoder {
    buf: Vec<u8>,
    limit: usize,
    state: State,
    have_nul: bool,
}

impl SlipDecoder {
    pub fn new(limit: usize) -> Self {
        SlipDecoder {
            buf: Vec::new(),
            limit,
            state: State::Idle,
            have_nul: false,
        }
    }

    /// The last complete frame.
    pub fn frame(&self) -> &[u8] {
        &self.buf
    }

    /// Drop any accumulated state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = State::Idle;
        self.have_nul = false;
    }

    /// Feed one byte.
    pub fn feed(&mut self, c: u8) -> SlipEvent {
        match self.state {
            State::Idle => {
                self.state = State::Frame;
                if c == END {
                    return SlipEvent::Pending;
                }
                self.accept(c)
            }
            State::Frame => self.accept(c),
            State::Escape => {
                let unescaped = match c {
                    ESC_END => END,
                    ESC_ESC => ESC,
                    _ => {
                        self.state = State::Error;
                        return SlipEvent::Pending;
                    }
                };
                self.state = State::Frame;
                self.store(unescaped)
            }
            State::Error => {
                if c == END {
                    self.reset();
                }
                SlipEvent::Pending
            }
        }
    }

    fn accept(&mut self, c: u8) -> SlipEvent {
        match c {
            END => {
                self.state = State::Idle;
                if self.buf.is_empty() {
                    return SlipEvent::Pending;
                }
                if self.buf.len() % 4 == 0 {
                    SlipEvent::Frame
                } else {
                    self.buf.clear();
                    SlipEvent::BadFrame
                }
            }
            ESC => {
                self.state = State::Escape;
                SlipEvent::Pending
            }
            b'\n' | b'\r' if !self.have_nul => {
                if self.buf.is_empty() {
                    return SlipEvent::Pending;
                }
                // console line: terminate, pad, append an empty typetag
                self.buf.push(0);
                while self.buf.len() % 4 != 0 {
                    self.buf.push(0);
                }
                self.buf.extend_from_slice(&[b',', 0, 0, 0]);
                self.state = State::Idle;
                SlipEvent::Frame
            }
            _ => {
                if c == 0 {
                    self.have_nul = true;
                }
                self.store(c)
            }
        }
    }

    fn store(&mut self, c: u8) -> SlipEvent {
        if self.buf.len() >= self.limit {
            self.state = State::Error;
            self.buf.clear();
            return SlipEvent::Pending;
        }
        self.buf.push(c);
        SlipEvent::Pending
    }
}
