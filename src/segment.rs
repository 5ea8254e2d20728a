use std::time::Duration;

use crate::audio::chunk::{normalize, AudioChunk};

/// Default gap after which drained audio starts a new line.
pub const DEFAULT_LINE_TIMEOUT: Duration = Duration::from_secs(3);

/// Decision taken for a drained batch of audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBoundary {
    /// The batch extends the currently open line.
    SameLine,
    /// The batch begins a new line; the previous buffer is discarded.
    NewLine,
}

/// Accumulates drained chunks into the working sample buffer for the open
/// line and applies the line-boundary heuristic.
///
/// The boundary compares how long the current polling iteration ran before
/// its drain succeeded against `line_timeout`. The reference point is the
/// iteration start, not the last chunk arrival, so the decision tracks loop
/// scheduling rather than measured silence; this matches the behavior the
/// rest of the system was built against and is kept as-is.
#[derive(Debug)]
pub struct SegmentBuffer {
    samples: Vec<i16>,
    line_timeout: Duration,
}

impl SegmentBuffer {
    pub fn new(line_timeout: Duration) -> Self {
        Self {
            samples: Vec::new(),
            line_timeout,
        }
    }

    /// Fold a drained batch into the working buffer. `waited` is the
    /// elapsed time of the polling iteration that produced the batch.
    pub fn absorb(&mut self, batch: &[AudioChunk], waited: Duration) -> LineBoundary {
        let boundary = if waited > self.line_timeout {
            LineBoundary::NewLine
        } else {
            LineBoundary::SameLine
        };
        if boundary == LineBoundary::NewLine {
            self.samples.clear();
        }
        for chunk in batch {
            self.samples.extend_from_slice(chunk.samples());
        }
        boundary
    }

    /// The accumulated line, normalized for the transcription engine.
    pub fn samples_f32(&self) -> Vec<f32> {
        normalize(&self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

impl Default for SegmentBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(value: i16, len: usize) -> AudioChunk {
        AudioChunk::new(vec![value; len])
    }

    #[test]
    fn quick_drain_extends_the_open_line() {
        let mut buffer = SegmentBuffer::new(Duration::from_millis(500));
        let first = buffer.absorb(&[chunk(1, 10)], Duration::from_millis(100));
        let second = buffer.absorb(&[chunk(2, 10)], Duration::from_millis(100));

        assert_eq!(first, LineBoundary::SameLine);
        assert_eq!(second, LineBoundary::SameLine);
        assert_eq!(buffer.len(), 20, "both batches belong to the same line");
    }

    #[test]
    fn slow_drain_discards_the_previous_buffer() {
        let mut buffer = SegmentBuffer::new(Duration::from_millis(500));
        buffer.absorb(&[chunk(1, 10)], Duration::from_millis(100));
        let boundary = buffer.absorb(&[chunk(2, 5)], Duration::from_millis(800));

        assert_eq!(boundary, LineBoundary::NewLine);
        assert_eq!(buffer.len(), 5, "new line starts from the fresh batch");
        assert!(buffer.samples_f32().iter().all(|&s| s > 0.0));
    }

    #[test]
    fn batch_order_is_preserved_within_a_drain() {
        let mut buffer = SegmentBuffer::default();
        buffer.absorb(&[chunk(1, 2), chunk(2, 2)], Duration::ZERO);
        let normalized = buffer.samples_f32();
        assert!(normalized[0] < normalized[2]);
    }
}
