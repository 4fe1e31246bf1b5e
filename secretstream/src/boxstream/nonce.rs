use std::fmt;

pub const NONCE_LENGTH: usize = 24;

/// A 24-byte big-endian counter supplying box-stream nonces.
///
/// Each direction owns one counter. A frame consumes two values: the header
/// is sealed under `base + 2i` and the body under `base + 2i + 1`.
#[derive(Clone, PartialEq, Eq)]
pub struct NonceCounter([u8; NONCE_LENGTH]);

impl NonceCounter {
    pub fn new(start: [u8; NONCE_LENGTH]) -> Self {
        Self(start)
    }

    pub fn current(&self) -> [u8; NONCE_LENGTH] {
        self.0
    }

    /// Add one, carrying from the last byte towards the first. Wraps at 2^192.
    pub fn increment(&mut self) {
        for byte in self.0.iter_mut().rev() {
            let (next, overflow) = byte.overflowing_add(1);
            *byte = next;
            if !overflow {
                break;
            }
        }
    }

    /// Return the current value and advance.
    pub fn next_nonce(&mut self) -> [u8; NONCE_LENGTH] {
        let nonce = self.0;
        self.increment();
        nonce
    }
}

impl fmt::Debug for NonceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonceCounter({})", hex::encode(self.0))
    }
}
