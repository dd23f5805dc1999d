//! Per-session utterance buffering.

use bytes::{Bytes, BytesMut};

/// Accumulates the binary fragments of the current utterance in arrival order.
///
/// Fragments are not inspected; a streamed container is only decodable once
/// all of them are joined.
#[derive(Debug, Default)]
pub struct AudioFrameBuffer {
    data: BytesMut,
    fragments: usize,
    /// Byte cap for one utterance; `None` means unbounded.
    limit: Option<usize>,
    overflowed: bool,
}

/// The joined fragments of one utterance, taken at trigger time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utterance {
    pub data: Bytes,
    pub fragments: usize,
    /// Set to the cap when fragments were dropped for exceeding it.
    pub overflow_limit: Option<usize>,
}

impl Utterance {
    /// Wraps a complete recording (e.g. an uploaded file).
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            fragments: 1,
            overflow_limit: None,
        }
    }

    /// An utterance whose data was discarded for exceeding `limit`.
    pub fn overflowed(limit: usize) -> Self {
        Self {
            overflow_limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl AudioFrameBuffer {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// Appends a fragment. Returns false if it was dropped because the
    /// utterance would exceed the byte cap.
    pub fn append(&mut self, fragment: &[u8]) -> bool {
        if let Some(limit) = self.limit {
            if self.overflowed || self.data.len() + fragment.len() > limit {
                self.overflowed = true;
                return false;
            }
        }
        self.data.extend_from_slice(fragment);
        self.fragments += 1;
        true
    }

    /// Takes the joined fragments and resets the buffer.
    pub fn drain(&mut self) -> Utterance {
        let utterance = Utterance {
            data: self.data.split().freeze(),
            fragments: self.fragments,
            overflow_limit: if self.overflowed { self.limit } else { None },
        };
        self.fragments = 0;
        self.overflowed = false;
        utterance
    }

    /// Buffered bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && !self.overflowed
    }

    /// Number of fragments accepted since the last drain.
    pub fn fragments(&self) -> usize {
        self.fragments
    }
}

#[cfg(test)]
mod buffer_tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut buf = AudioFrameBuffer::new(None);
        assert!(buf.append(b"AB"));
        assert!(buf.append(b""));
        assert!(buf.append(b"CDE"));
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.fragments(), 3);

        let utt = buf.drain();
        assert_eq!(&utt.data[..], b"ABCDE");
        assert_eq!(utt.fragments, 3);
        assert_eq!(utt.overflow_limit, None);
    }

    #[test]
    fn test_drain_resets() {
        let mut buf = AudioFrameBuffer::new(None);
        buf.append(b"first");
        let _ = buf.drain();
        assert!(buf.is_empty());
        assert_eq!(buf.fragments(), 0);

        let utt = buf.drain();
        assert!(utt.is_empty());

        buf.append(b"second");
        assert_eq!(&buf.drain().data[..], b"second");
    }

    #[test]
    fn test_overflow_marks_utterance() {
        let mut buf = AudioFrameBuffer::new(Some(4));
        assert!(buf.append(b"abc"));
        assert!(!buf.append(b"de"));
        // Once over the cap, the rest of the utterance is dropped too.
        assert!(!buf.append(b"f"));
        assert!(!buf.is_empty());

        let utt = buf.drain();
        assert_eq!(utt.overflow_limit, Some(4));
        assert_eq!(&utt.data[..], b"abc");

        // The next utterance starts clean.
        assert!(buf.append(b"gh"));
        assert_eq!(buf.drain().overflow_limit, None);
    }
}
