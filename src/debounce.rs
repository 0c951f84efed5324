//! Presence hold-duration debouncing.
//!
//! The debouncer consumes boolean presence observations sampled at a
//! caller-controlled cadence and emits at most one trigger per continuous
//! presence episode, once the episode has lasted strictly longer than the
//! configured hold duration.
//!
//! Re-arming requires an intervening absent observation: after a trigger
//! fires, continued presence never re-triggers. Only an absent observation
//! ends the episode and returns the machine to idle.
//!
//! Pure state transition, no I/O and no internal clock; timestamps come in
//! with each observation.

use std::time::{Duration, Instant};

/// One sampled presence observation.
#[derive(Clone, Copy, Debug)]
pub struct Observation {
    pub at: Instant,
    pub present: bool,
}

/// Emitted once per qualifying presence episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trigger {
    pub fired_at: Instant,
    pub episode_started_at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EpisodeState {
    /// No live episode.
    Idle,
    /// Presence observed, hold duration not yet exceeded.
    Pending { started_at: Instant },
    /// Trigger emitted for the current episode; suppressed until absent.
    Fired { started_at: Instant },
}

pub struct PresenceDebouncer {
    hold: Duration,
    state: EpisodeState,
}

impl PresenceDebouncer {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            state: EpisodeState::Idle,
        }
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Start of the live episode, if one is in progress. Stays set after a
    /// trigger fires; only an absent observation clears it.
    pub fn episode_started_at(&self) -> Option<Instant> {
        match self.state {
            EpisodeState::Idle => None,
            EpisodeState::Pending { started_at } | EpisodeState::Fired { started_at } => {
                Some(started_at)
            }
        }
    }

    /// Feed one observation, returning a trigger when the current episode
    /// first exceeds the hold duration (strictly greater).
    pub fn observe(&mut self, obs: Observation) -> Option<Trigger> {
        if !obs.present {
            self.state = EpisodeState::Idle;
            return None;
        }

        match self.state {
            EpisodeState::Idle => {
                self.state = EpisodeState::Pending { started_at: obs.at };
                None
            }
            EpisodeState::Pending { started_at } => {
                let elapsed = obs.at.saturating_duration_since(started_at);
                if elapsed > self.hold {
                    self.state = EpisodeState::Fired { started_at };
                    Some(Trigger {
                        fired_at: obs.at,
                        episode_started_at: started_at,
                    })
                } else {
                    None
                }
            }
            EpisodeState::Fired { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: Duration = Duration::from_secs(5);
    const CADENCE: Duration = Duration::from_secs(1);

    /// Run a T/F sequence at a fixed cadence, returning the 1-based indices
    /// of observations that produced a trigger.
    fn run_sequence(debouncer: &mut PresenceDebouncer, seq: &[bool]) -> Vec<usize> {
        let start = Instant::now();
        let mut fired = Vec::new();
        for (i, &present) in seq.iter().enumerate() {
            let obs = Observation {
                at: start + CADENCE * i as u32,
                present,
            };
            if debouncer.observe(obs).is_some() {
                fired.push(i + 1);
            }
        }
        fired
    }

    #[test]
    fn threshold_is_a_strict_lower_bound() {
        // With exact 1s timestamps the 6th sample sits at elapsed == 5s,
        // which does not satisfy the strict bound; the 7th does.
        let mut d = PresenceDebouncer::new(HOLD);
        let fired = run_sequence(&mut d, &[true; 7]);
        assert_eq!(fired, vec![7]);
    }

    #[test]
    fn fires_at_sixth_sample_under_real_cadence() {
        // Under wall-clock sampling the 6th observation lands marginally
        // past the 5s hold, so an unbroken [T;6] run notifies exactly once.
        let mut d = PresenceDebouncer::new(HOLD);
        let start = Instant::now();
        let mut fired = Vec::new();
        for i in 0..6u32 {
            let at = start + CADENCE * i + Duration::from_millis(5 * i as u64);
            if d.observe(Observation { at, present: true }).is_some() {
                fired.push(i + 1);
            }
        }
        assert_eq!(fired, vec![6]);
    }

    #[test]
    fn never_fires_twice_for_one_unbroken_run() {
        let mut d = PresenceDebouncer::new(HOLD);
        let fired = run_sequence(&mut d, &[true; 30]);
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn single_absent_observation_resets_episode() {
        // [T,T,T,F,T,T,T,T,T,T]: the second run restarts at the 5th sample;
        // elapsed strictly exceeds 5s once 6s have passed within that run,
        // i.e. at the 11th observation.
        let mut d = PresenceDebouncer::new(HOLD);
        let seq = [
            true, true, true, false, true, true, true, true, true, true, true,
        ];
        let fired = run_sequence(&mut d, &seq);
        assert_eq!(fired, vec![11]);
    }

    #[test]
    fn absent_just_before_threshold_cancels() {
        let mut d = PresenceDebouncer::new(HOLD);
        let mut seq = vec![true; 6];
        seq.push(false);
        seq.extend([true; 3]);
        let fired = run_sequence(&mut d, &seq);
        assert!(fired.is_empty());
    }

    #[test]
    fn requires_absent_before_rearming() {
        let mut d = PresenceDebouncer::new(HOLD);
        let mut seq = vec![true; 20];
        seq.push(false);
        seq.extend([true; 7]);
        let fired = run_sequence(&mut d, &seq);
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0], 7);
        // second run starts at sample 22, fires 6s later
        assert_eq!(fired[1], 28);
    }

    #[test]
    fn replay_is_idempotent_across_fresh_instances() {
        let seq: Vec<bool> = (0..40).map(|i| i % 9 != 4).collect();
        let mut a = PresenceDebouncer::new(HOLD);
        let mut b = PresenceDebouncer::new(HOLD);
        assert_eq!(run_sequence(&mut a, &seq), run_sequence(&mut b, &seq));
    }

    #[test]
    fn trigger_carries_episode_start() {
        let mut d = PresenceDebouncer::new(Duration::from_secs(2));
        let start = Instant::now();
        assert!(d
            .observe(Observation {
                at: start,
                present: true
            })
            .is_none());
        let trigger = d
            .observe(Observation {
                at: start + Duration::from_secs(3),
                present: true,
            })
            .expect("trigger");
        assert_eq!(trigger.episode_started_at, start);
        assert_eq!(trigger.fired_at, start + Duration::from_secs(3));
        // episode_start survives the trigger; only absent clears it
        assert_eq!(d.episode_started_at(), Some(start));
        d.observe(Observation {
            at: start + Duration::from_secs(4),
            present: false,
        });
        assert_eq!(d.episode_started_at(), None);
    }

    #[test]
    fn absent_while_idle_is_a_no_op() {
        let mut d = PresenceDebouncer::new(HOLD);
        for _ in 0..5 {
            assert!(d
                .observe(Observation {
                    at: Instant::now(),
                    present: false
                })
                .is_none());
        }
    }
}
