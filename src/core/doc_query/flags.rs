//! Per-customer feature flags

use crate::config::DiscoveryConfig;
use crate::domain::CxId;
use std::collections::BTreeSet;

/// Feature flags consulted by the document query scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    stale_check_cx_ids: BTreeSet<String>,
    stale_check_all: bool,
}

impl FeatureFlags {
    pub fn new(cx_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            stale_check_cx_ids: cx_ids.into_iter().map(Into::into).collect(),
            stale_check_all: false,
        }
    }

    /// Staleness check on for every customer
    pub fn all_customers() -> Self {
        Self {
            stale_check_cx_ids: BTreeSet::new(),
            stale_check_all: true,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            stale_check_cx_ids: config.stale_check_cx_ids.iter().cloned().collect(),
            stale_check_all: config.stale_check_all_cx,
        }
    }

    pub fn is_stale_check_enabled(&self, cx_id: &CxId) -> bool {
        self.stale_check_all || self.stale_check_cx_ids.contains(cx_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_lookup() {
        let flags = FeatureFlags::new(["cx-1"]);
        assert!(flags.is_stale_check_enabled(&CxId::new("cx-1").unwrap()));
        assert!(!flags.is_stale_check_enabled(&CxId::new("cx-2").unwrap()));
        assert!(FeatureFlags::all_customers().is_stale_check_enabled(&CxId::new("cx-2").unwrap()));
        assert!(!FeatureFlags::default().is_stale_check_enabled(&CxId::new("cx-1").unwrap()));
    }

    #[test]
    fn test_from_config() {
        let config = DiscoveryConfig {
            stale_check_cx_ids: vec!["cx-9".to_string()],
            ..DiscoveryConfig::default()
        };
        let flags = FeatureFlags::from_config(&config);
        assert!(flags.is_stale_check_enabled(&CxId::new("cx-9").unwrap()));
    }
}
