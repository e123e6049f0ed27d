//! # Delay Line (Ring Buffer)
//!
//! A delay line stores audio samples and lets you read them back later.
//! This is the fundamental building block of all delay, reverb, chorus,
//! and flanger effects.
//!
//! Imagine a circular tape loop. A "write head" records incoming audio
//! onto the tape, and a "read head" plays it back from a position further
//! behind on the tape. In code the "tape" is a `Vec<f32>` and the heads
//! are indices that wrap back to 0 when they run off the end.
//!
//! ## Block transfers and the wrap split
//!
//! Unlike a per-sample ring buffer, this delay line moves whole blocks.
//! When a block doesn't fit between the write position and the end of
//! the buffer, the transfer is split: the first part lands in
//! `[write_pos, len)`, the remainder wraps to `[0, ..)`. Both parts use
//! one continuous gain envelope — the ramp is a function of the *block*
//! index, not the buffer index, so the seam is inaudible:
//!
//! ```text
//! block:   [s0 s1 s2 s3 s4 s5]        gain ramps s0 → s5
//! buffer:  [s4 s5 . . . . s0 s1 s2 s3]
//!           ^wrapped          ^write_pos
//! ```
//!
//! ## Ramped copies
//!
//! Every transfer applies a linear gain ramp across the block. The
//! per-sample increment is `(end - start) / block_len` and the first
//! sample uses `start` exactly, so a block that ends at gain `g`
//! followed by a block that starts at gain `g` produces a uniform
//! per-sample step across the boundary — no click.
//!
//! ## Ownership
//!
//! There is one `DelayLine` per output channel, but the *write cursor*
//! is shared engine-wide (all channels advance in lockstep), so the
//! cursor lives in the engine and is passed into every call here.

/// Per-channel circular sample buffer.
///
/// The length is tempo-derived and recomputed every block by the
/// engine; see [`resize`](Self::resize) for what happens when it
/// changes.
pub struct DelayLine {
    buffer: Vec<f32>,
}

impl DelayLine {
    /// Create a delay line holding `length` samples of silence.
    /// `length` must be at least 1; the engine clamps degenerate
    /// tempo-derived lengths before calling this.
    pub fn new(length: usize) -> Self {
        debug_assert!(length > 0, "delay line length must be positive");
        Self {
            buffer: vec![0.0; length.max(1)],
        }
    }

    /// Buffer length in samples. Never zero.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Resize the buffer to `new_length` samples.
    ///
    /// **Contents are not preserved**: every sample is reset to silence,
    /// so previously written audio will not reappear after a tempo or
    /// timing change. This is the documented resize transient. It is
    /// also the one heap allocation on the processing path.
    pub fn resize(&mut self, new_length: usize) {
        debug_assert!(new_length > 0, "delay line length must be positive");
        let new_length = new_length.max(1);
        self.buffer.clear();
        self.buffer.resize(new_length, 0.0);
    }

    /// Reset all stored samples to silence without changing the length.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
    }

    /// Copy `source` into the ring starting at `write_pos`, applying a
    /// linear gain ramp from `start_gain` to `end_gain` across the
    /// block. Wraps past the end of the buffer as many times as needed
    /// (a block longer than the buffer simply overwrites its own tail,
    /// as a tape loop shorter than the block would).
    pub fn write_from(&mut self, write_pos: usize, source: &[f32], start_gain: f32, end_gain: f32) {
        let len = self.buffer.len();
        debug_assert!(write_pos < len, "write cursor out of range");
        if source.is_empty() {
            return;
        }

        let step = (end_gain - start_gain) / source.len() as f32;
        let mut gain = start_gain;
        let mut pos = write_pos % len;
        let mut remaining = source;

        // Normally at most two segments; more only when the block is
        // longer than the (clamped) buffer.
        while !remaining.is_empty() {
            let chunk_len = remaining.len().min(len - pos);
            let (chunk, rest) = remaining.split_at(chunk_len);
            for (slot, &sample) in self.buffer[pos..pos + chunk_len].iter_mut().zip(chunk) {
                *slot = sample * gain;
                gain += step;
            }
            pos = (pos + chunk_len) % len;
            remaining = rest;
        }
    }

    /// Copy `dest.len()` samples starting at `read_pos` into `dest`,
    /// wrapping past the end of the buffer with the same split strategy
    /// as [`write_from`](Self::write_from). No gain is applied here —
    /// the wet level ramp belongs to the mixer.
    pub fn read_into(&self, read_pos: usize, dest: &mut [f32]) {
        let len = self.buffer.len();
        debug_assert!(read_pos < len, "read cursor out of range");

        let mut pos = read_pos % len;
        let mut remaining = &mut dest[..];

        while !remaining.is_empty() {
            let chunk_len = remaining.len().min(len - pos);
            let (chunk, rest) = remaining.split_at_mut(chunk_len);
            chunk.copy_from_slice(&self.buffer[pos..pos + chunk_len]);
            pos = (pos + chunk_len) % len;
            remaining = rest;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// The wrap split from the engine contract: buffer of 100, write
    /// cursor at 90, block of 20 ⇒ samples 0..=9 land at indices
    /// 90..=99 and samples 10..=19 land at indices 0..=9.
    #[test]
    fn test_write_splits_at_wrap_point() {
        let mut dl = DelayLine::new(100);
        let block: Vec<f32> = (0..20).map(|i| i as f32 + 1.0).collect();

        dl.write_from(90, &block, 1.0, 1.0);

        let mut stored = vec![0.0; 20];
        dl.read_into(90, &mut stored);
        assert_eq!(
            stored, block,
            "Split write should be contiguous when read back across the seam"
        );

        // Spot-check the physical placement on both sides of the seam.
        let mut tail = vec![0.0; 10];
        dl.read_into(0, &mut tail);
        assert_eq!(tail, block[10..], "Wrapped part should start at index 0");
    }

    /// The gain ramp starts exactly at `start_gain` and advances by
    /// `(end - start) / block_len` per sample.
    #[test]
    fn test_write_ramp_envelope() {
        let mut dl = DelayLine::new(16);
        let block = [1.0; 4];

        dl.write_from(0, &block, 0.0, 1.0);

        let mut stored = vec![0.0; 4];
        dl.read_into(0, &mut stored);
        for (i, &value) in stored.iter().enumerate() {
            let expected = i as f32 * 0.25;
            assert!(
                (value - expected).abs() < 1e-6,
                "Ramp sample {i}: expected {expected}, got {value}"
            );
        }
    }

    /// The ramp is indexed by block position, not buffer position: a
    /// write that wraps must continue the envelope across the seam.
    #[test]
    fn test_ramp_continuous_across_wrap() {
        let mut dl = DelayLine::new(8);
        let block = [1.0; 8];

        // Start at position 6 so the block splits 2 + 6.
        dl.write_from(6, &block, 0.0, 1.0);

        let mut stored = vec![0.0; 8];
        dl.read_into(6, &mut stored);
        for window in stored.windows(2) {
            let step = window[1] - window[0];
            assert!(
                (step - 0.125).abs() < 1e-6,
                "Envelope step should stay 1/8 across the wrap, got {step}"
            );
        }
    }

    /// Reads wrap with the same split strategy as writes.
    #[test]
    fn test_read_wraps() {
        let mut dl = DelayLine::new(10);
        let block: Vec<f32> = (0..10).map(|i| i as f32).collect();
        dl.write_from(0, &block, 1.0, 1.0);

        let mut out = vec![0.0; 6];
        dl.read_into(7, &mut out);
        assert_eq!(out, [7.0, 8.0, 9.0, 0.0, 1.0, 2.0]);
    }

    /// Resizing resets contents: nothing written before the resize may
    /// survive it.
    #[test]
    fn test_resize_resets_contents() {
        let mut dl = DelayLine::new(4800);
        dl.write_from(0, &[1.0; 256], 1.0, 1.0);

        dl.resize(2400);
        assert_eq!(dl.len(), 2400);

        let mut out = vec![0.0; 2400];
        dl.read_into(0, &mut out);
        assert!(
            out.iter().all(|&s| s == 0.0),
            "Resize must clear previously written audio"
        );
    }

    /// A block longer than the buffer must not panic; the buffer ends
    /// up holding the block's tail.
    #[test]
    fn test_block_longer_than_buffer() {
        let mut dl = DelayLine::new(4);
        let block: Vec<f32> = (0..10).map(|i| i as f32).collect();

        dl.write_from(0, &block, 1.0, 1.0);

        let mut out = vec![0.0; 4];
        dl.read_into(0, &mut out);
        // 10 samples into 4 slots: positions wrap twice, the final
        // pass leaves [8, 9, 6, 7].
        assert_eq!(out, [8.0, 9.0, 6.0, 7.0]);
    }

    /// Clearing silences the buffer without touching its length.
    #[test]
    fn test_clear() {
        let mut dl = DelayLine::new(32);
        dl.write_from(0, &[0.5; 32], 1.0, 1.0);
        dl.clear();

        assert_eq!(dl.len(), 32);
        let mut out = vec![1.0; 32];
        dl.read_into(0, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
