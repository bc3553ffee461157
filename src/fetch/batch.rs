use crate::fetch::error::FetchError;
use crate::regions::region::RegionTable;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one fetch cycle: a result per requested region key.
///
/// Lives only for the cycle that produced it.
#[derive(Debug)]
pub struct FetchBatchResult<T> {
    per_region: BTreeMap<String, Result<T, FetchError>>,
}

impl<T> FetchBatchResult<T> {
    pub fn from_results(per_region: BTreeMap<String, Result<T, FetchError>>) -> Self {
        Self { per_region }
    }

    pub fn get(&self, region: &str) -> Option<&Result<T, FetchError>> {
        self.per_region.get(region)
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.per_region
            .iter()
            .filter_map(|(k, r)| r.as_ref().ok().map(|v| (k.as_str(), v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.per_region.values().filter_map(|r| r.as_ref().err())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn len(&self) -> usize {
        self.per_region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_region.is_empty()
    }

    pub fn into_results(self) -> BTreeMap<String, Result<T, FetchError>> {
        self.per_region
    }

    /// User-facing description of every failed region, in key order.
    pub fn region_failures(&self, regions: &RegionTable) -> Vec<RegionFailure> {
        self.failures()
            .map(|e| RegionFailure::new(e, regions))
            .collect()
    }

    /// Shorthand for [`failure_summary`] over [`Self::region_failures`].
    pub fn failure_summary(&self, regions: &RegionTable) -> Option<String> {
        failure_summary(&self.region_failures(regions))
    }
}

/// A failed region as shown next to a partially rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionFailure {
    pub region: String,
    pub display_name: String,
    pub reason: String,
}

impl RegionFailure {
    pub fn new(error: &FetchError, regions: &RegionTable) -> Self {
        let region = error.region();
        Self {
            region: region.to_string(),
            display_name: regions.display_name(region).to_string(),
            reason: error.reason(),
        }
    }
}

/// `"some regions failed: Pohang (timed out after 30s), Gumi (unknown region)"`,
/// or `None` when nothing failed.
pub fn failure_summary(failures: &[RegionFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }
    let listed: Vec<String> = failures
        .iter()
        .map(|f| format!("{} ({})", f.display_name, f.reason))
        .collect();
    Some(format!("some regions failed: {}", listed.join(", ")))
}
