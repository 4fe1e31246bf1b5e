use crate::boxstream::MAX_SEGMENT_SIZE;
use crate::error::{Result, SecretStreamError};

/// Configuration for the box-stream layer of a secure connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Largest plaintext chunk sealed into a single frame (1..=4096).
    pub max_segment_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_segment_size: MAX_SEGMENT_SIZE,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_size == 0 || self.max_segment_size > MAX_SEGMENT_SIZE {
            return Err(SecretStreamError::InvalidConfig(format!(
                "max_segment_size must be in 1..={MAX_SEGMENT_SIZE}, got {}",
                self.max_segment_size
            )));
        }
        Ok(())
    }
}
