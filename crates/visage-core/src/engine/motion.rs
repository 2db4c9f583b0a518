//! Motion scheduling
//!
//! Discrete body-motion clips ride alongside the continuous audio-driven
//! animation. The scheduler holds at most one pending request (newer
//! requests overwrite an unstarted one) and decides at each step boundary
//! whether to start it: immediately if the request preempts, otherwise once
//! the in-flight clip completes. Random requests resolve against the
//! model's motion table at dispatch time, not at request time.

use std::time::Instant;

use rand::Rng;

/// Selector carried by a motion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionSelector {
    /// A motion name the model is expected to declare
    Named(String),
    /// Uniform draw from the model's motion table
    Random,
}

/// A caller's motion request
#[derive(Debug, Clone)]
pub struct MotionRequest {
    pub selector: MotionSelector,
    /// Preempt any in-flight motion at the next step boundary
    pub immediate: bool,
    /// Submission time, for dispatch-latency tracing
    pub requested_at: Instant,
}

impl MotionRequest {
    pub fn named(name: impl Into<String>, immediate: bool) -> Self {
        Self {
            selector: MotionSelector::Named(name.into()),
            immediate,
            requested_at: Instant::now(),
        }
    }

    pub fn random(immediate: bool) -> Self {
        Self {
            selector: MotionSelector::Random,
            immediate,
            requested_at: Instant::now(),
        }
    }
}

/// Single-slot motion scheduler owned by the render loop
pub struct MotionScheduler {
    /// At most one not-yet-started request; newest wins
    pending: Option<MotionRequest>,
    /// Name of the clip the backend is currently playing
    in_flight: Option<String>,
}

impl MotionScheduler {
    pub fn new() -> Self {
        Self {
            pending: None,
            in_flight: None,
        }
    }

    /// Accept a request, overwriting any unstarted one
    pub fn request(&mut self, request: MotionRequest) {
        if self.pending.is_some() {
            log::debug!("motion: pending request overwritten");
        }
        self.pending = Some(request);
    }

    /// Decide what to submit this step, given the model's motion table.
    ///
    /// Non-immediate requests hold while a clip is in flight. A random
    /// request against an empty table dissolves silently.
    pub fn resolve(&mut self, motions: &[String]) -> Option<String> {
        let immediate = self.pending.as_ref()?.immediate;
        if !immediate && self.in_flight.is_some() {
            return None;
        }

        let request = self.pending.take()?;
        let name = match request.selector {
            MotionSelector::Named(name) => name,
            MotionSelector::Random => {
                if motions.is_empty() {
                    log::debug!("motion: random request with no motions declared");
                    return None;
                }
                motions[rand::rng().random_range(0..motions.len())].clone()
            }
        };
        log::trace!(
            "motion: '{}' dispatched {}ms after request",
            name,
            request.requested_at.elapsed().as_millis()
        );
        Some(name)
    }

    /// The backend accepted a submission. A preempted in-flight clip is
    /// dropped here without a completion event.
    pub fn on_started(&mut self, name: String) {
        if let Some(old) = self.in_flight.replace(name) {
            log::debug!("motion: '{}' preempted", old);
        }
    }

    /// Completion signal from the backend. True if it matches the clip we
    /// believe is in flight (stale signals after preemption are dropped).
    pub fn on_completed(&mut self, name: &str) -> bool {
        if self.in_flight.as_deref() == Some(name) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Drop pending and in-flight without events. Used on teardown.
    pub fn reset(&mut self) {
        self.pending = None;
        self.in_flight = None;
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }
}

impl Default for MotionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_newest_pending_wins() {
        let mut sched = MotionScheduler::new();
        sched.request(MotionRequest::named("wave", false));
        sched.request(MotionRequest::named("nod", false));

        assert_eq!(sched.resolve(&table(&["wave", "nod"])), Some("nod".into()));
        assert_eq!(sched.resolve(&table(&["wave", "nod"])), None);
    }

    #[test]
    fn test_non_immediate_holds_until_completion() {
        let mut sched = MotionScheduler::new();
        sched.on_started("wave".into());

        sched.request(MotionRequest::named("nod", false));
        assert_eq!(sched.resolve(&[]), None);

        assert!(sched.on_completed("wave"));
        assert_eq!(sched.resolve(&[]), Some("nod".into()));
    }

    #[test]
    fn test_immediate_preempts_without_completion() {
        let mut sched = MotionScheduler::new();
        sched.on_started("wave".into());

        sched.request(MotionRequest::named("nod", true));
        let name = sched.resolve(&[]).unwrap();
        assert_eq!(name, "nod");
        sched.on_started(name);

        // The preempted clip's completion never fires
        assert!(!sched.on_completed("wave"));
        assert!(sched.on_completed("nod"));
        assert_eq!(sched.in_flight(), None);
    }

    #[test]
    fn test_random_resolves_from_table_at_dispatch() {
        let mut sched = MotionScheduler::new();
        sched.request(MotionRequest::random(false));

        let motions = table(&["wave", "nod", "bow"]);
        let name = sched.resolve(&motions).unwrap();
        assert!(motions.contains(&name));
    }

    #[test]
    fn test_random_with_empty_table_dissolves() {
        let mut sched = MotionScheduler::new();
        sched.request(MotionRequest::random(false));

        assert_eq!(sched.resolve(&[]), None);
        // The request did not survive to the next step
        assert_eq!(sched.resolve(&table(&["wave"])), None);
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut sched = MotionScheduler::new();
        sched.on_started("wave".into());
        assert!(!sched.on_completed("bow"));
        assert_eq!(sched.in_flight(), Some("wave"));
    }

    #[test]
    fn test_reset_drops_everything() {
        let mut sched = MotionScheduler::new();
        sched.on_started("wave".into());
        sched.request(MotionRequest::named("nod", false));

        sched.reset();
        assert_eq!(sched.in_flight(), None);
        assert!(!sched.on_completed("wave"));
        assert_eq!(sched.resolve(&table(&["nod"])), None);
    }
}
