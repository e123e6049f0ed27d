//! # Dry/Wet Mixer
//!
//! The output of the effect is the dry (filtered, non-delayed) signal
//! plus the delayed signal scaled by the gain knob:
//!
//! ```text
//! out[n] = dry[n] + wet[n] * gain
//! ```
//!
//! A knob move between two blocks would make `gain` jump at the block
//! boundary, and a jump multiplied into audio is an audible click. The
//! mixer therefore remembers the gain it ended the previous block on
//! and ramps linearly from that value to the current one across the
//! whole block. The per-sample increment is `(current - previous) /
//! block_len`, the same convention as the delay line's write ramp, so
//! consecutive blocks form one continuous envelope.

/// Linear gain envelope for one block: `start` at sample 0, stepping
/// toward `end` so that the *next* block may begin exactly at `end`.
#[derive(Debug, Clone, Copy)]
pub struct GainRamp {
    start: f32,
    end: f32,
}

impl GainRamp {
    /// Add `wet` onto `output` in place, scaled by this ramp.
    /// The two slices must be the same length.
    pub fn apply_add(&self, output: &mut [f32], wet: &[f32]) {
        debug_assert_eq!(output.len(), wet.len());
        if output.is_empty() {
            return;
        }

        let step = (self.end - self.start) / output.len() as f32;
        let mut gain = self.start;
        for (out, &sample) in output.iter_mut().zip(wet) {
            *out += sample * gain;
            gain += step;
        }
    }
}

/// Tracks the block-to-block gain history. One instance per engine —
/// the gain parameter is global, not per channel, so every channel of
/// a block uses the same [`GainRamp`].
pub struct Mixer {
    previous_gain: Option<f32>,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            previous_gain: None,
        }
    }

    /// Start a new block at the given gain parameter value and return
    /// the ramp every channel of this block should use.
    ///
    /// On the very first block (or after [`reset`](Self::reset)) there
    /// is no history to ramp from, so the ramp is flat at `gain`.
    pub fn begin_block(&mut self, gain: f32) -> GainRamp {
        let start = self.previous_gain.unwrap_or(gain);
        self.previous_gain = Some(gain);
        GainRamp { start, end: gain }
    }

    /// Forget the gain history, e.g. when playback stops. The next
    /// block will start with a flat ramp instead of sweeping from a
    /// stale value.
    pub fn reset(&mut self) {
        self.previous_gain = None;
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// The first block has no history: the ramp is flat and the mix is
    /// a plain `dry + wet * gain`.
    #[test]
    fn test_first_block_is_flat() {
        let mut mixer = Mixer::new();
        let ramp = mixer.begin_block(0.5);

        let mut output = [1.0, 1.0, 1.0, 1.0];
        let wet = [0.5, -0.5, 1.0, 0.0];
        ramp.apply_add(&mut output, &wet);

        let expected = [1.25, 0.75, 1.5, 1.0];
        for (got, want) in output.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-6, "expected {want}, got {got}");
        }
    }

    /// A gain change ramps across the whole block with a uniform
    /// per-sample step.
    #[test]
    fn test_gain_change_ramps_across_block() {
        let mut mixer = Mixer::new();
        mixer.begin_block(0.2);
        let ramp = mixer.begin_block(0.8);

        // All-ones wet over zero dry exposes the raw envelope.
        let mut output = [0.0; 6];
        let wet = [1.0; 6];
        ramp.apply_add(&mut output, &wet);

        let step = (0.8 - 0.2) / 6.0;
        assert!(
            (output[0] - 0.2).abs() < 1e-6,
            "Ramp must start at the previous block's gain, got {}",
            output[0]
        );
        for (i, window) in output.windows(2).enumerate() {
            let got = window[1] - window[0];
            assert!(
                (got - step).abs() < 1e-6,
                "Step {i} should be {step}, got {got}"
            );
        }
    }

    /// The block boundary itself introduces no discontinuity: the step
    /// from the last sample of one block to the first sample of the
    /// next equals the in-block step.
    #[test]
    fn test_no_spike_at_block_boundary() {
        let mut mixer = Mixer::new();
        mixer.begin_block(0.2);

        let wet = [1.0; 8];
        let mut first = [0.0; 8];
        mixer.begin_block(0.8).apply_add(&mut first, &wet);

        let mut second = [0.0; 8];
        mixer.begin_block(0.8).apply_add(&mut second, &wet);

        let in_block_step = (first[1] - first[0]).abs();
        let boundary_step = (second[0] - first[7]).abs();
        assert!(
            boundary_step <= in_block_step + 1e-6,
            "Boundary step {boundary_step} exceeds in-block step {in_block_step}"
        );
    }

    /// After a reset the mixer no longer sweeps from stale history.
    #[test]
    fn test_reset_forgets_history() {
        let mut mixer = Mixer::new();
        mixer.begin_block(0.1);
        mixer.reset();

        let mut output = [0.0; 4];
        mixer.begin_block(1.0).apply_add(&mut output, &[1.0; 4]);
        assert!(
            output.iter().all(|&s| (s - 1.0).abs() < 1e-6),
            "Flat ramp expected after reset, got {output:?}"
        );
    }
}
