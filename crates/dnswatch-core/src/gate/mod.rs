//! Hysteresis gate
//!
//! The gate turns a noisy stream of boolean observations into a debounced,
//! rate-limited activate/deactivate decision.
//!
//! ## Rules
//!
//! ```text
//!            observation == true, run > threshold,
//!            cool-down elapsed, on_activate() == Ok
//!   ┌──────────┐ ─────────────────────────────────▶ ┌──────────┐
//!   │ INACTIVE │                                    │  ACTIVE  │
//!   └──────────┘ ◀───────────────────────────────── └──────────┘
//!            observation == false, run > threshold,
//!            on_deactivate() == Ok
//! ```
//!
//! - A run is the number of consecutive identical observations, the current
//!   one included.
//! - The cool-down applies to activations only and is measured from the last
//!   successful transition in either direction.
//! - State changes only after the action succeeded. A failed action leaves
//!   the gate where it was, so the next qualifying observation retries it.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of identical observations that must be exceeded
pub const DEFAULT_THRESHOLD: usize = 3;

/// Default minimum time between a transition and the next activation
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60 * 60);

/// Debounce and cool-down parameters of a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    /// Runs longer than this trigger an action
    pub threshold: usize,
    /// Minimum time since the last transition before activating again
    pub cooldown: Duration,
}

impl GatePolicy {
    /// Create a new policy
    pub fn new(threshold: usize, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
        }
    }

    /// Policy without cool-down
    pub fn without_cooldown(threshold: usize) -> Self {
        Self::new(threshold, Duration::ZERO)
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_COOLDOWN)
    }
}

/// Outcome of a single [`HysteresisGate::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing to do
    Idle,
    /// `on_activate` succeeded; the gate is now active
    Activated,
    /// `on_activate` failed; the gate stays inactive
    ActivationFailed,
    /// An activation qualified but the cool-down has not elapsed
    CoolingDown,
    /// `on_deactivate` succeeded; the gate is now inactive
    Deactivated,
    /// `on_deactivate` failed; the gate stays active
    DeactivationFailed,
}

/// Debounced activate/deactivate decision unit
///
/// One gate watches one condition. It is owned by a single controller task
/// and only mutated through [`HysteresisGate::check`].
#[derive(Debug, Clone)]
pub struct HysteresisGate {
    policy: GatePolicy,
    last_observation: Option<bool>,
    run_length: usize,
    active: bool,
    last_transition: Option<Instant>,
}

impl HysteresisGate {
    /// Create a gate
    ///
    /// `active` seeds the gate from the live state of whatever it controls
    /// (e.g. the record is currently enabled).
    pub fn new(policy: GatePolicy, active: bool) -> Self {
        Self {
            policy,
            last_observation: None,
            run_length: 0,
            active,
            last_transition: None,
        }
    }

    /// Whether the gate is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Length of the current run of identical observations
    pub fn run_length(&self) -> usize {
        self.run_length
    }

    /// Policy the gate was built with
    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Feed one observation
    ///
    /// `on_activate` runs when `observation` is `true`, the gate is inactive,
    /// the run exceeds the threshold and the cool-down has elapsed.
    /// `on_deactivate` runs when `observation` is `false`, the gate is active
    /// and the run exceeds the threshold. At most one of them runs per call.
    ///
    /// Action errors are not returned: reporting them is up to the actions.
    pub async fn check<A, FA, D, FD, E>(
        &mut self,
        observation: bool,
        on_activate: A,
        on_deactivate: D,
    ) -> GateDecision
    where
        A: FnOnce() -> FA,
        FA: Future<Output = Result<(), E>>,
        D: FnOnce() -> FD,
        FD: Future<Output = Result<(), E>>,
    {
        if self.last_observation == Some(observation) {
            self.run_length = self.run_length.saturating_add(1);
        } else {
            self.run_length = 1;
        }
        self.last_observation = Some(observation);

        if self.run_length <= self.policy.threshold {
            return GateDecision::Idle;
        }

        if observation && !self.active {
            if self.cooling_down() {
                return GateDecision::CoolingDown;
            }
            return match on_activate().await {
                Ok(()) => {
                    self.transition(true);
                    GateDecision::Activated
                }
                Err(_) => GateDecision::ActivationFailed,
            };
        }

        if !observation && self.active {
            return match on_deactivate().await {
                Ok(()) => {
                    self.transition(false);
                    GateDecision::Deactivated
                }
                Err(_) => GateDecision::DeactivationFailed,
            };
        }

        GateDecision::Idle
    }

    fn cooling_down(&self) -> bool {
        match self.last_transition {
            Some(at) => at.elapsed() < self.policy.cooldown,
            None => false,
        }
    }

    fn transition(&mut self, active: bool) {
        self.active = active;
        self.last_transition = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> Result<(), ()> {
        Ok(())
    }

    async fn fail() -> Result<(), ()> {
        Err(())
    }

    #[tokio::test]
    async fn test_run_length_counts_current_observation() {
        let mut gate = HysteresisGate::new(GatePolicy::default(), false);

        gate.check(true, ok, ok).await;
        assert_eq!(gate.run_length(), 1);
        gate.check(true, ok, ok).await;
        assert_eq!(gate.run_length(), 2);
        gate.check(false, ok, ok).await;
        assert_eq!(gate.run_length(), 1);
    }

    #[tokio::test]
    async fn test_activates_after_threshold() {
        let mut gate = HysteresisGate::new(GatePolicy::default(), false);

        for _ in 0..3 {
            assert_eq!(gate.check(true, ok, ok).await, GateDecision::Idle);
        }
        assert_eq!(gate.check(true, ok, ok).await, GateDecision::Activated);
        assert!(gate.is_active());
        assert_eq!(gate.check(true, ok, ok).await, GateDecision::Idle);
    }

    #[tokio::test]
    async fn test_failed_activation_stays_inactive() {
        let mut gate = HysteresisGate::new(GatePolicy::default(), false);

        for _ in 0..3 {
            gate.check(true, fail, ok).await;
        }
        assert_eq!(
            gate.check(true, fail, ok).await,
            GateDecision::ActivationFailed
        );
        assert!(!gate.is_active());
        assert_eq!(gate.check(true, ok, ok).await, GateDecision::Activated);
    }

    #[tokio::test]
    async fn test_seeded_active_gate_deactivates() {
        let mut gate = HysteresisGate::new(GatePolicy::default(), true);

        for _ in 0..3 {
            gate.check(false, ok, ok).await;
        }
        assert_eq!(gate.check(false, ok, ok).await, GateDecision::Deactivated);
        assert!(!gate.is_active());
    }

    #[tokio::test]
    async fn test_zero_cooldown_recovers_immediately() {
        let mut gate = HysteresisGate::new(GatePolicy::without_cooldown(3), true);

        for _ in 0..4 {
            gate.check(false, ok, ok).await;
        }
        assert!(!gate.is_active());

        for _ in 0..3 {
            gate.check(true, ok, ok).await;
        }
        assert_eq!(gate.check(true, ok, ok).await, GateDecision::Activated);
    }
}
