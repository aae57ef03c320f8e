//! Severity policy: what the detector loop does with each finding

use tracing::debug;

use super::config::LowSeverityPolicy;
use crate::domain::Severity;

/// Reaction to a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Pause the consumer, inject, hold for the grace period, resume
    Interrupt,

    /// Inject without pausing
    Inform,

    /// Log only
    Discard,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityPolicy {
    low: LowSeverityPolicy,
}

impl SeverityPolicy {
    pub fn new(low: LowSeverityPolicy) -> Self {
        Self { low }
    }

    pub fn reaction(&self, severity: Severity) -> Reaction {
        let reaction = if severity.interrupts() {
            Reaction::Interrupt
        } else if severity == Severity::Medium {
            Reaction::Inform
        } else {
            match self.low {
                LowSeverityPolicy::Discard => Reaction::Discard,
                LowSeverityPolicy::Inject => Reaction::Inform,
            }
        };
        debug!(%severity, ?reaction, "SeverityPolicy::reaction: called");
        reaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = SeverityPolicy::default();
        assert_eq!(policy.reaction(Severity::Critical), Reaction::Interrupt);
        assert_eq!(policy.reaction(Severity::High), Reaction::Interrupt);
        assert_eq!(policy.reaction(Severity::Medium), Reaction::Inform);
        assert_eq!(policy.reaction(Severity::Low), Reaction::Discard);
    }

    #[test]
    fn test_low_inject() {
        let policy = SeverityPolicy::new(LowSeverityPolicy::Inject);
        assert_eq!(policy.reaction(Severity::Low), Reaction::Inform);
        assert_eq!(policy.reaction(Severity::High), Reaction::Interrupt);
    }
}
