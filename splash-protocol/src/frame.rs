//! Line framing over the pipe byte stream
//!
//! Framing rules:
//! - A line ends at `'\n'`. A NUL byte ends a line as well.
//! - A zero-length line (terminator at the start of the window) is skipped
//!   by consuming one byte.
//! - Bytes after the last terminator stay buffered until a later read
//!   completes them. No partial line is ever parsed.
//!
//! [`LineBuffer`] holds the unparsed bytes between reads. Its capacity is a
//! hard bound: a line that cannot fit is dropped together with the rest of
//! that line, so the stream resynchronizes at the next terminator.

use core::ops::ControlFlow;

use heapless::Vec;

use crate::command::Command;

/// Line buffer capacity in bytes
pub const LINE_BUFFER_SIZE: usize = 2048;

/// Returns true for bytes that end a line
#[inline]
fn is_terminator(byte: u8) -> bool {
    byte == b'\n' || byte == 0
}

/// One framing step over a byte window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framed<'a> {
    /// Bytes consumed from the front of the window, terminator included
    pub consumed: usize,
    /// Line content, or `None` for a skipped empty line
    pub line: Option<&'a [u8]>,
}

/// Frame the next line at the front of `window`
///
/// Returns `None` when the window holds no terminator, i.e. it is empty or
/// only contains a partial line.
pub fn next_line(window: &[u8]) -> Option<Framed<'_>> {
    let end = window.iter().position(|&b| is_terminator(b))?;

    if end == 0 {
        return Some(Framed {
            consumed: 1,
            line: None,
        });
    }

    Some(Framed {
        consumed: end + 1,
        line: Some(&window[..end]),
    })
}

/// Result of reading into a [`LineBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fill {
    /// Bytes returned by the reader (0 means end of stream)
    pub read: usize,
    /// Bytes thrown away because they belonged to an overlong line
    pub dropped: usize,
}

/// Result of draining a [`LineBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// All complete lines were applied
    Exhausted {
        /// Commands handed to the callback
        commands: usize,
        /// Bytes of an overlong partial line dropped at the end
        dropped: usize,
    },
    /// The callback asked to stop; the rest of the buffer was left unparsed
    Stopped,
}

/// Bounded buffer of bytes read from the pipe but not yet parsed
///
/// Invariant: `len() <= N` at all times. Reads are offered at most
/// `N - len()` bytes.
#[derive(Debug, Clone)]
pub struct LineBuffer<const N: usize = LINE_BUFFER_SIZE> {
    data: Vec<u8, N>,
    /// Dropping bytes until the end of an overlong line
    discarding: bool,
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineBuffer<N> {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            discarding: false,
        }
    }

    /// Number of buffered, unparsed bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes a single read may still append
    pub fn spare_capacity(&self) -> usize {
        N - self.data.len()
    }

    /// Returns true while the tail of an overlong line is being dropped
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Buffered, unparsed bytes
    pub fn window(&self) -> &[u8] {
        &self.data
    }

    /// Read more bytes into the buffer
    ///
    /// `read` is handed a slice no longer than [`spare_capacity`] and must
    /// return how many bytes it wrote. Its error is passed through untouched.
    ///
    /// [`spare_capacity`]: LineBuffer::spare_capacity
    pub fn fill<E>(
        &mut self,
        read: impl FnOnce(&mut [u8]) -> Result<usize, E>,
    ) -> Result<Fill, E> {
        // A full buffer without a terminator can never complete a line
        let mut dropped = 0;
        if self.spare_capacity() == 0 {
            dropped += self.overflow();
        }

        // Read straight into the tail, then cut back to what arrived
        let start = self.data.len();
        let _ = self.data.resize(N, 0);
        let read_len = match read(&mut self.data[start..]) {
            Ok(n) => n.min(N - start),
            Err(e) => {
                self.data.truncate(start);
                return Err(e);
            }
        };
        self.data.truncate(start + read_len);
        dropped += self.skip_discarded(start);

        Ok(Fill {
            read: read_len,
            dropped,
        })
    }

    /// Append raw bytes, applying the overflow policy
    ///
    /// Returns the number of bytes dropped.
    pub fn push_bytes(&mut self, mut bytes: &[u8]) -> usize {
        let mut dropped = 0;
        while !bytes.is_empty() {
            if self.spare_capacity() == 0 {
                dropped += self.overflow();
            }
            let take = bytes.len().min(self.spare_capacity());
            dropped += self.accept(&bytes[..take]);
            bytes = &bytes[take..];
        }
        dropped
    }

    /// Remove `count` bytes from the front, sliding the rest down
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.data.len());
        if count == 0 {
            return;
        }
        let remaining = self.data.len() - count;
        self.data.copy_within(count.., 0);
        self.data.truncate(remaining);
    }

    /// Frame, parse and apply every complete line in order
    ///
    /// `apply` is called once per command. Returning
    /// `ControlFlow::Break(())` stops immediately: the stopping line is
    /// consumed, everything after it stays unparsed. Otherwise the leftover
    /// partial line is kept at the front of the buffer.
    pub fn drain<F>(&mut self, mut apply: F) -> Drain
    where
        F: FnMut(Command<'_>) -> ControlFlow<()>,
    {
        let mut offset = 0;
        let mut commands = 0;

        while let Some(framed) = next_line(&self.data[offset..]) {
            offset += framed.consumed;

            let Some(command) = framed.line.and_then(Command::parse) else {
                continue;
            };

            commands += 1;
            if apply(command).is_break() {
                self.consume(offset);
                return Drain::Stopped;
            }
        }

        self.consume(offset);

        let dropped = if self.spare_capacity() == 0 {
            self.overflow()
        } else {
            0
        };

        Drain::Exhausted { commands, dropped }
    }

    /// Drop everything buffered and all input up to the next terminator
    fn overflow(&mut self) -> usize {
        let dropped = self.data.len();
        self.data.clear();
        self.discarding = true;
        dropped
    }

    /// Append bytes that are known to fit in the spare capacity
    fn accept(&mut self, bytes: &[u8]) -> usize {
        let start = self.data.len();
        // Callers never offer more than the spare capacity
        if self.data.extend_from_slice(bytes).is_err() {
            return bytes.len();
        }
        self.skip_discarded(start)
    }

    /// Drop the rest of an overlong line from the bytes added at `from`
    fn skip_discarded(&mut self, from: usize) -> usize {
        if !self.discarding {
            return 0;
        }

        let len = self.data.len();
        match self.data[from..].iter().position(|&b| is_terminator(b)) {
            Some(end) => {
                let count = end + 1;
                self.data.copy_within(from + count.., from);
                self.data.truncate(len - count);
                self.discarding = false;
                count
            }
            None => {
                self.data.truncate(from);
                len - from
            }
        }
    }
}
