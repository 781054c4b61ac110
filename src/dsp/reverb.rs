//! Master reverb — a four-tap feedback delay network.
//!
//! All four taps share one circular line. Each sample, the taps are mixed
//! through a 4×4 Hadamard matrix, scaled by the reverb amount, low-pass
//! damped and written back at the positions they were read from.

/// Length of the shared delay line; a power of two so positions can be masked.
pub const REVERB_DELAY_LENGTH: usize = 16384;
const MASK: usize = REVERB_DELAY_LENGTH - 1;

/// Offsets of the three trailing taps from the write head.
const TAP_OFFSETS: [usize; 3] = [3041, 6426, 10907];

/// Feedback smoothing per sample; higher keeps more of the previous value.
const DAMPING: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct FdnReverb {
    line: Vec<f64>,
    pos: usize,
    feedback: [f64; 4],
}

impl Default for FdnReverb {
    fn default() -> Self {
        Self::new()
    }
}

impl FdnReverb {
    pub fn new() -> Self {
        Self {
            line: vec![0.0; REVERB_DELAY_LENGTH],
            pos: 0,
            feedback: [0.0; 4],
        }
    }

    /// Feed one mono sample in and return the wet (left, right) pair.
    ///
    /// `amount` must stay below 0.5 for the network to remain stable.
    #[inline]
    pub fn process(&mut self, input: f64, amount: f64) -> (f64, f64) {
        let p0 = self.pos;
        let p1 = (p0 + TAP_OFFSETS[0]) & MASK;
        let p2 = (p0 + TAP_OFFSETS[1]) & MASK;
        let p3 = (p0 + TAP_OFFSETS[2]) & MASK;

        let s0 = self.line[p0] + input * amount;
        let s1 = self.line[p1];
        let s2 = self.line[p2];
        let s3 = self.line[p3];

        let t0 = -s0 + s1;
        let t1 = -s0 - s1;
        let t2 = -s2 + s3;
        let t3 = -s2 - s3;
        let mixed = [t0 + t2, t1 + t3, t0 - t2, t1 - t3];

        for (state, m) in self.feedback.iter_mut().zip(mixed) {
            *state += (m * amount - *state) * (1.0 - DAMPING);
        }
        self.line[p1] = self.feedback[0];
        self.line[p2] = self.feedback[1];
        self.line[p3] = self.feedback[2];
        self.line[p0] = self.feedback[3];
        self.pos = (p0 + 1) & MASK;

        (s1 + s2 + s3, s0 + s2 - s3)
    }

    pub fn clear(&mut self) {
        self.line.fill(0.0);
        self.feedback = [0.0; 4];
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{reverb_amount, REVERB_RANGE};

    #[test]
    fn silence_stays_silent() {
        let mut r = FdnReverb::new();
        for _ in 0..1000 {
            assert_eq!(r.process(0.0, reverb_amount(REVERB_RANGE - 1)), (0.0, 0.0));
        }
    }

    #[test]
    fn impulse_produces_a_tail_that_decays() {
        let mut r = FdnReverb::new();
        let amount = reverb_amount(REVERB_RANGE - 1);
        r.process(1.0, amount);

        let mut early = 0.0f64;
        for _ in 0..REVERB_DELAY_LENGTH {
            let (l, rr) = r.process(0.0, amount);
            early = early.max(l.abs()).max(rr.abs());
        }
        assert!(early > 0.0, "Reverb should produce a tail");

        for _ in 0..REVERB_DELAY_LENGTH * 20 {
            r.process(0.0, amount);
        }
        let mut late = 0.0f64;
        for _ in 0..REVERB_DELAY_LENGTH {
            let (l, rr) = r.process(0.0, amount);
            late = late.max(l.abs()).max(rr.abs());
        }
        assert!(late < early * 0.1, "Tail should decay: early {early}, late {late}");
    }

    #[test]
    fn zero_amount_is_dry() {
        let mut r = FdnReverb::new();
        for i in 0..5000 {
            let x = (i as f64 * 0.01).sin();
            let (l, rr) = r.process(x, 0.0);
            assert_eq!((l, rr), (0.0, 0.0));
        }
    }

    #[test]
    fn clear_resets() {
        let mut r = FdnReverb::new();
        let amount = reverb_amount(2);
        for _ in 0..4000 {
            r.process(0.5, amount);
        }
        r.clear();
        assert_eq!(r.process(0.0, amount), (0.0, 0.0));
    }
}
