//! Bounded linear sweep of the positional actuator.
//!
//! A [`Sweep`] is a small state machine (current position, target, step)
//! that yields one commanded angle per advance.  The reconciler drives it to
//! completion with a delay after each step; nothing here sleeps, so the
//! same machine can be advanced one step per scheduler tick.
//!
//! Every sweep yields its start angle first and its target angle last,
//! moving strictly monotonically in between.  When the span is not a
//! multiple of the step, the final increment is shortened so the target is
//! hit exactly.

use crate::config::NodeConfig;

/// Endpoints and pacing of the two sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProfile {
    /// Start of the forward sweep.
    pub rest_deg: i16,
    /// End of the forward sweep and start of the retract sweep.
    pub active_deg: i16,
    /// End of the retract sweep.
    pub retract_end_deg: i16,
    /// Magnitude of each step (> 0).
    pub step_deg: i16,
    /// Pause after each commanded step.
    pub step_delay_ms: u32,
}

impl SweepProfile {
    pub fn from_config(cfg: &NodeConfig) -> Self {
        Self {
            rest_deg: cfg.sweep_rest_deg,
            active_deg: cfg.sweep_active_deg,
            retract_end_deg: cfg.sweep_retract_end_deg,
            step_deg: cfg.sweep_step_deg,
            step_delay_ms: cfg.sweep_step_delay_ms,
        }
    }

    /// Sweep toward the active position (rest → active).
    pub fn forward(&self) -> Sweep {
        Sweep::new(self.rest_deg, self.active_deg, self.step_deg)
    }

    /// Sweep away from the active position (active → retract end).
    ///
    /// The retract end lies past the rest angle so the arm fully clears the
    /// active position.
    pub fn retract(&self) -> Sweep {
        Sweep::new(self.active_deg, self.retract_end_deg, self.step_deg)
    }

    /// Sweep for a transition into `active`.
    pub fn toward(&self, active: bool) -> Sweep {
        if active { self.forward() } else { self.retract() }
    }
}

impl Default for SweepProfile {
    fn default() -> Self {
        Self::from_config(&NodeConfig::default())
    }
}

/// In-progress sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    position: i16,
    target: i16,
    step: i16,
    done: bool,
}

impl Sweep {
    /// `step` is a magnitude; a non-positive value is treated as 1.
    pub fn new(from: i16, to: i16, step: i16) -> Self {
        Self {
            position: from,
            target: to,
            step: step.max(1),
            done: false,
        }
    }

    pub fn start(&self) -> i16 {
        self.position
    }

    pub fn target(&self) -> i16 {
        self.target
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// Next angle to command, or `None` once the target has been yielded.
    pub fn advance(&mut self) -> Option<i16> {
        if self.done {
            return None;
        }
        let current = self.position;
        if current == self.target {
            self.done = true;
        } else if current < self.target {
            self.position = current.saturating_add(self.step).min(self.target);
        } else {
            self.position = current.saturating_sub(self.step).max(self.target);
        }
        Some(current)
    }

    /// Number of angles still to be yielded.
    pub fn step_count(&self) -> usize {
        if self.done {
            return 0;
        }
        let span = (self.target as i32 - self.position as i32).unsigned_abs() as usize;
        let step = self.step as usize;
        span.div_ceil(step) + 1
    }
}

impl Iterator for Sweep {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        self.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_visits_every_fifth_degree_to_ninety() {
        let angles: Vec<i16> = SweepProfile::default().forward().collect();
        let expected: Vec<i16> = (0..=90).step_by(5).collect();
        assert_eq!(angles, expected);
        assert_eq!(angles.len(), 19);
    }

    #[test]
    fn retract_overshoots_to_minus_ninety() {
        let angles: Vec<i16> = SweepProfile::default().retract().collect();
        assert_eq!(angles.first(), Some(&90));
        assert_eq!(angles.last(), Some(&-90));
        assert_eq!(angles.len(), 37);
        assert!(angles.windows(2).all(|w| w[0] - w[1] == 5));
    }

    #[test]
    fn uneven_span_lands_on_target() {
        let angles: Vec<i16> = Sweep::new(0, 12, 5).collect();
        assert_eq!(angles, vec![0, 5, 10, 12]);
    }

    #[test]
    fn zero_span_yields_single_angle() {
        let mut s = Sweep::new(45, 45, 5);
        assert_eq!(s.step_count(), 1);
        assert_eq!(s.advance(), Some(45));
        assert_eq!(s.advance(), None);
        assert!(s.is_finished());
    }

    #[test]
    fn len_matches_yield_count() {
        for (from, to, step) in [(0, 90, 5), (90, -90, 5), (0, 12, 5), (10, 3, 4)] {
            let s = Sweep::new(from, to, step);
            assert_eq!(s.step_count(), s.count());
        }
    }

    #[test]
    fn non_positive_step_still_terminates() {
        let angles: Vec<i16> = Sweep::new(0, 3, 0).collect();
        assert_eq!(angles, vec![0, 1, 2, 3]);
    }
}
