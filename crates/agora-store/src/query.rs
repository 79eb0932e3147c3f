//! Filter predicates for step queries.
//!
//! The store exposes only field-equality and time-range conjunctions; the
//! orchestration core composes multiple simple queries in application code
//! instead of relying on store-side joins.

use chrono::{DateTime, Utc};

use agora_types::{ActivityStep, AgentId, LocationId, StepKind, StepStatus};

/// A conjunction of simple predicates over activity steps.
///
/// Every field is optional; an empty query matches everything. Built with
/// chained `with_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepQuery {
    /// Match steps with this status.
    pub status: Option<StepStatus>,
    /// Match steps of this kind.
    pub kind: Option<StepKind>,
    /// Match steps owned by this agent.
    pub agent: Option<AgentId>,
    /// Match steps whose `to_location` equals one of these.
    pub destinations: Option<Vec<LocationId>>,
    /// Match steps with `starts_at <= t` (due steps).
    pub starts_at_or_before: Option<DateTime<Utc>>,
    /// Match steps with `ends_at >= t` (window lower bound, inclusive).
    pub ends_at_or_after: Option<DateTime<Utc>>,
    /// Match steps with `ends_at <= t` (window upper bound, inclusive).
    pub ends_at_or_before: Option<DateTime<Utc>>,
}

impl StepQuery {
    /// An empty query matching every step.
    pub const fn new() -> Self {
        Self {
            status: None,
            kind: None,
            agent: None,
            destinations: None,
            starts_at_or_before: None,
            ends_at_or_after: None,
            ends_at_or_before: None,
        }
    }

    /// Restrict to a status.
    #[must_use]
    pub const fn with_status(mut self, status: StepStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to a step kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: StepKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to one agent's steps.
    #[must_use]
    pub const fn with_agent(mut self, agent: AgentId) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Restrict to steps arriving at any of the given destinations.
    #[must_use]
    pub fn with_destinations(mut self, destinations: Vec<LocationId>) -> Self {
        self.destinations = Some(destinations);
        self
    }

    /// Restrict to steps due at or before `t`.
    #[must_use]
    pub const fn due_by(mut self, t: DateTime<Utc>) -> Self {
        self.starts_at_or_before = Some(t);
        self
    }

    /// Restrict to steps ending within `[from, to]` inclusive.
    #[must_use]
    pub const fn ending_within(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.ends_at_or_after = Some(from);
        self.ends_at_or_before = Some(to);
        self
    }

    /// Whether a step satisfies every predicate in the conjunction.
    pub fn matches(&self, step: &ActivityStep) -> bool {
        if self.status.is_some_and(|s| step.status != s) {
            return false;
        }
        if self.kind.is_some_and(|k| step.kind != k) {
            return false;
        }
        if self.agent.is_some_and(|a| step.agent_id != a) {
            return false;
        }
        if let Some(destinations) = &self.destinations {
            let Some(to) = step.to_location else {
                return false;
            };
            if !destinations.contains(&to) {
                return false;
            }
        }
        if self
            .starts_at_or_before
            .is_some_and(|t| step.starts_at > t)
        {
            return false;
        }
        if self.ends_at_or_after.is_some_and(|t| step.ends_at < t) {
            return false;
        }
        if self.ends_at_or_before.is_some_and(|t| step.ends_at > t) {
            return false;
        }
        true
    }
}
