//! Chunk Accumulator
//!
//! Holds provider text that has arrived but has not been emitted yet.

/// Buffer of not-yet-segmented provider text
///
/// Deltas are appended verbatim. A segmenter decides what part of the
/// buffer is complete; [`ChunkAccumulator::replace`] then keeps only the
/// remainder, so the buffer never holds text that was already yielded.
#[derive(Clone, Debug, Default)]
pub struct ChunkAccumulator {
    buffer: String,
}

impl ChunkAccumulator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta
    pub fn append(&mut self, delta: &str) {
        self.buffer.push_str(delta);
    }

    /// Current buffered text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Buffered length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Swap in the remainder left over by a segmenter
    pub fn replace(&mut self, remainder: String) {
        self.buffer = remainder;
    }

    /// Drain the buffer
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_replace() {
        let mut acc = ChunkAccumulator::new();
        assert!(acc.is_empty());

        acc.append("The cat ");
        acc.append("sat. The");
        assert_eq!(acc.as_str(), "The cat sat. The");

        acc.replace("The".to_string());
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.take(), "The");
        assert!(acc.is_empty());
    }
}
