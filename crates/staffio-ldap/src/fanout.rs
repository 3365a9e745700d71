//! Per-source outcomes of a password fan-out.
//!
//! A fan-out visits every source in order whatever happened at the previous
//! one. The [`FanOutReport`] keeps every outcome; a [`FanOutPolicy`] decides
//! what the caller of the single-result API sees.

use serde::{Deserialize, Serialize};
use staffio_core::{DirectoryError, DirectoryResult};

/// How a [`FanOutReport`] collapses to one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutPolicy {
    /// The outcome of the last source attempted, whatever came before.
    #[default]
    LastSource,
    /// Every source must succeed; the first failure is returned.
    AllSources,
    /// At least this many sources must succeed; otherwise the last failure
    /// is returned.
    Quorum(usize),
}

/// Outcome at one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// Address of the source.
    pub source_addr: String,
    /// What happened there.
    pub result: DirectoryResult<()>,
}

/// Every source's outcome, in fan-out order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    outcomes: Vec<SourceOutcome>,
}

impl FanOutReport {
    /// Empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the outcome of the next source.
    pub fn record(&mut self, source_addr: impl Into<String>, result: DirectoryResult<()>) {
        self.outcomes.push(SourceOutcome {
            source_addr: source_addr.into(),
            result,
        });
    }

    /// Outcomes in fan-out order.
    #[must_use]
    pub fn outcomes(&self) -> &[SourceOutcome] {
        &self.outcomes
    }

    /// Number of sources that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Failed outcomes in fan-out order.
    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Returns `true` if every source succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.failures().next().is_none()
    }

    /// Collapses the report under `policy`.
    ///
    /// # Errors
    ///
    /// `NoSources` for an empty report; otherwise the error the policy
    /// selects.
    pub fn resolve(&self, policy: FanOutPolicy) -> DirectoryResult<()> {
        let Some(last) = self.outcomes.last() else {
            return Err(DirectoryError::NoSources);
        };

        match policy {
            FanOutPolicy::LastSource => last.result.clone(),
            FanOutPolicy::AllSources => match self.failures().next() {
                Some(failure) => failure.result.clone(),
                None => Ok(()),
            },
            FanOutPolicy::Quorum(needed) => {
                if self.succeeded() >= needed {
                    Ok(())
                } else {
                    match self.failures().last() {
                        Some(failure) => failure.result.clone(),
                        None => Ok(()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> FanOutReport {
        let mut report = FanOutReport::new();
        report.record("ldap://a", Err(DirectoryError::operation("ldap://a", "busy")));
        report.record("ldap://b", Ok(()));
        report.record("ldap://c", Err(DirectoryError::auth_failed("ldap://c", "uid=bob")));
        report
    }

    #[test]
    fn test_empty_report_has_no_sources() {
        let report = FanOutReport::new();
        assert_eq!(report.resolve(FanOutPolicy::LastSource), Err(DirectoryError::NoSources));
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_last_source_wins() {
        let report = mixed();
        let err = report.resolve(FanOutPolicy::LastSource).unwrap_err();
        assert_eq!(err.source_addr(), Some("ldap://c"));

        let mut report = FanOutReport::new();
        report.record("ldap://a", Err(DirectoryError::operation("ldap://a", "busy")));
        report.record("ldap://b", Ok(()));
        // An early failure is masked by a later success.
        assert!(report.resolve(FanOutPolicy::LastSource).is_ok());
    }

    #[test]
    fn test_all_sources_returns_first_failure() {
        let err = mixed().resolve(FanOutPolicy::AllSources).unwrap_err();
        assert_eq!(err.source_addr(), Some("ldap://a"));
    }

    #[test]
    fn test_quorum() {
        let report = mixed();
        assert_eq!(report.succeeded(), 1);
        assert!(report.resolve(FanOutPolicy::Quorum(1)).is_ok());
        let err = report.resolve(FanOutPolicy::Quorum(2)).unwrap_err();
        assert_eq!(err.source_addr(), Some("ldap://c"));
    }

    #[test]
    fn test_policy_serde() {
        let policy: FanOutPolicy = serde_json::from_str(r#""all_sources""#).unwrap();
        assert_eq!(policy, FanOutPolicy::AllSources);
        let policy: FanOutPolicy = serde_json::from_str(r#"{"quorum":2}"#).unwrap();
        assert_eq!(policy, FanOutPolicy::Quorum(2));
    }
}
