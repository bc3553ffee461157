use crate::fetch::batch::FetchBatchResult;
use crate::fetch::error::{FetchError, ProviderError};
use crate::regions::region::{Region, RegionTable};
use crate::validation::range::RegionSelection;
use futures_util::future::join_all;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

/// Runs `fetch` once per selected region, all concurrently, and waits for every
/// one of them to settle.
///
/// A region missing from `regions`, a provider error and exceeding `timeout`
/// each become that region's [`FetchError`]; the remaining regions are
/// unaffected. The returned batch always holds exactly one entry per selected
/// key.
pub async fn fetch_all<'a, T, F, Fut>(
    regions: &'a RegionTable,
    selection: &RegionSelection,
    timeout: Option<Duration>,
    fetch: F,
) -> FetchBatchResult<T>
where
    F: Fn(&'a Region) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let pending = selection.iter().map(|key| {
        let region = regions.get(key);
        let request = region.map(&fetch);
        let key = key.to_string();
        async move {
            let outcome = match request {
                Some(request) => settle(key.clone(), request, timeout).await,
                None => {
                    warn!("Region '{}' is not in the region table, skipping", key);
                    Err(FetchError::UnknownRegion(key.clone()))
                }
            };
            (key, outcome)
        }
    });

    let per_region: BTreeMap<String, Result<T, FetchError>> =
        join_all(pending).await.into_iter().collect();
    let batch = FetchBatchResult::from_results(per_region);

    info!(
        "Fetched {} regions: {} succeeded, {} failed",
        batch.len(),
        batch.success_count(),
        batch.failure_count()
    );
    batch
}

async fn settle<T, Fut>(
    region: String,
    request: Fut,
    timeout: Option<Duration>,
) -> Result<T, FetchError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    debug!("Fetching region '{}'", region);
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, request).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Region '{}' timed out after {:?}", region, limit);
                return Err(FetchError::Timeout {
                    region,
                    after: limit,
                });
            }
        },
        None => request.await,
    };
    outcome.map_err(|source| {
        warn!("Region '{}' failed: {}", region, source);
        FetchError::Provider { region, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let regions = RegionTable::builtin();
        let selection = RegionSelection::from(["andong", "gumi", "pohang"]);

        let batch = fetch_all(&regions, &selection, None, |region| async move {
            if region.key == "gumi" {
                Err(ProviderError::Failed("gumi is down".into()))
            } else {
                Ok(region.coordinates.nx)
            }
        })
        .await;

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.successes().collect::<Vec<_>>(),
            vec![("andong", &91), ("pohang", &102)]
        );
        let failed: Vec<&str> = batch.failures().map(FetchError::region).collect();
        assert_eq!(failed, vec!["gumi"]);
    }

    #[tokio::test]
    async fn test_unknown_region_is_a_region_failure() {
        let regions = RegionTable::builtin();
        let selection = RegionSelection::from(["andong", "atlantis"]);
        let calls = AtomicUsize::new(0);

        let batch = fetch_all(&regions, &selection, None, |_region| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ProviderError>(()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            batch.get("atlantis"),
            Some(Err(FetchError::UnknownRegion(k))) if k == "atlantis"
        ));
        assert!(matches!(batch.get("andong"), Some(Ok(()))));
    }

    #[tokio::test]
    async fn test_fetches_run_concurrently_and_all_settle() {
        let regions = RegionTable::builtin();
        let selection = RegionSelection::from(["andong", "gumi", "pohang", "cheongdo"]);
        let finished = Arc::new(AtomicUsize::new(0));

        let started = Instant::now();
        let batch = fetch_all(&regions, &selection, None, |_region| {
            let finished = finished.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ProviderError>(())
            }
        })
        .await;

        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert_eq!(batch.success_count(), 4);
        // Sequential execution would take at least 400ms
        assert!(started.elapsed() < Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_slow_region_times_out() {
        let regions = RegionTable::builtin();
        let selection = RegionSelection::from(["andong", "gumi"]);

        let batch = fetch_all(
            &regions,
            &selection,
            Some(Duration::from_millis(50)),
            |region| async move {
                if region.key == "gumi" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok::<_, ProviderError>(region.key.len())
            },
        )
        .await;

        assert!(matches!(batch.get("andong"), Some(Ok(6))));
        assert!(matches!(
            batch.get("gumi"),
            Some(Err(FetchError::Timeout { after, .. })) if *after == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn test_empty_selection_yields_empty_batch() {
        let regions = RegionTable::builtin();
        let batch = fetch_all(&regions, &RegionSelection::new(), None, |_region| async {
            Ok::<_, ProviderError>(())
        })
        .await;
        assert!(batch.is_empty());
    }
}
