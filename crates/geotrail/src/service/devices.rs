use std::sync::Arc;

use serde::Serialize;

use geotrail_core::device::{
    AccessScope, DeviceSnapshot, FreshnessReport, Principal, RefreshOutcome, RoutePoint,
};
use geotrail_core::store::{PositionStore, StoreError};

use crate::cache::{CacheMaterializer, RefreshStatsReport};

use super::error::DeviceAccessError;

/// Longest allowed route window, in hours (one week).
const MAX_ROUTE_WINDOW_HOURS: u32 = 168;

/// Where a device listing was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    /// Cache was fresh; served straight from the artifact.
    MaterializedView,
    /// Cache was past the operational threshold; refreshed in-line and
    /// served from the new snapshot.
    RefreshedCache,
    /// Refresh failed; served from a live store query.
    Fallback,
    /// The cached path itself errored; served from a live store query.
    ErrorFallback,
}

/// Response envelope for the device listing.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceListing {
    pub devices: Vec<DeviceSnapshot>,
    pub cache_age_seconds: Option<i64>,
    pub is_stale: bool,
    pub source: ListingSource,
}

/// The single query-facing entry point for principal-scoped device
/// reads.
///
/// Coordinates freshness evaluation, on-demand refresh, and live-query
/// fallback over the cache artifact and the position store. Every
/// fallback transition is reported through [`ListingSource`] so
/// degraded service stays observable.
#[derive(Clone)]
pub struct DeviceQueryService {
    store: Arc<dyn PositionStore>,
    materializer: Arc<CacheMaterializer>,
    staff_row_cap: usize,
    batch_row_cap: usize,
}

impl DeviceQueryService {
    pub fn new(
        store: Arc<dyn PositionStore>,
        materializer: Arc<CacheMaterializer>,
        staff_row_cap: usize,
        batch_row_cap: usize,
    ) -> Self {
        Self {
            store,
            materializer,
            staff_row_cap,
            batch_row_cap,
        }
    }

    /// Lists the devices visible to the principal, preferring the cache.
    ///
    /// Degrades instead of failing: a stale cache triggers an in-line
    /// refresh, a failed refresh falls back to a live query, and any
    /// unexpected store error on the cached path retries live. Only a
    /// live query failure surfaces as `Err`.
    pub async fn get_devices(&self, principal: Principal) -> Result<DeviceListing, StoreError> {
        match self.get_devices_cached(principal).await {
            Ok(listing) => Ok(listing),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    user_id = principal.user_id,
                    "Cached device listing failed, serving live fallback"
                );
                let devices = self.live_devices(principal).await?;
                Ok(DeviceListing {
                    devices,
                    cache_age_seconds: None,
                    is_stale: true,
                    source: ListingSource::ErrorFallback,
                })
            }
        }
    }

    /// The cache-first path: fresh read, or refresh-then-read, or live
    /// fallback when the refresh fails. Errors here mean the cached
    /// path is unusable and the caller degrades to `error_fallback`.
    async fn get_devices_cached(
        &self,
        principal: Principal,
    ) -> Result<DeviceListing, StoreError> {
        let report = self.materializer.freshness().await;

        if !self.materializer.policy().needs_refresh(&report) {
            let devices = self.scoped_cache_rows(principal).await?;
            return Ok(DeviceListing {
                devices,
                cache_age_seconds: report.age_seconds,
                is_stale: report.is_stale,
                source: ListingSource::MaterializedView,
            });
        }

        tracing::debug!(
            age_seconds = report.age_seconds,
            "Cache past operational threshold, refreshing before serving"
        );
        let outcome = self.materializer.refresh().await;

        if outcome.success {
            let devices = self.scoped_cache_rows(principal).await?;
            return Ok(DeviceListing {
                devices,
                cache_age_seconds: Some(0),
                is_stale: false,
                source: ListingSource::RefreshedCache,
            });
        }

        // Refresh failed: the error is already recorded in the stats
        // collector; serve best-effort live data with the stale age
        // passed through.
        tracing::warn!(
            error = outcome.error_message.as_deref().unwrap_or("unknown"),
            "Cache refresh failed, serving live fallback"
        );
        let devices = self.live_devices(principal).await?;
        Ok(DeviceListing {
            devices,
            cache_age_seconds: report.age_seconds,
            is_stale: true,
            source: ListingSource::Fallback,
        })
    }

    /// Live single-device lookup. Always bypasses the cache: the caller
    /// just selected this device and expects its current position.
    pub async fn get_single_device_position(
        &self,
        principal: Principal,
        device_id: &str,
    ) -> Result<DeviceSnapshot, DeviceAccessError> {
        self.ensure_access(principal, device_id).await?;

        match self.store.get_device(device_id).await? {
            Some(snapshot) => Ok(snapshot),
            None => Err(DeviceAccessError::NotFound(device_id.to_string())),
        }
    }

    /// Batch positions from the cache artifact, never triggering a
    /// refresh. Rows without a usable coordinate pair are dropped, an
    /// optional id subset and a single-id exclusion are applied, and
    /// the result is capped to bound payload size.
    pub async fn get_batch_positions(
        &self,
        principal: Principal,
        device_ids: Option<&[String]>,
        exclude_device_id: Option<&str>,
    ) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let scope = self.scope_for(principal).await?;
        let (rows, _) = self.materializer.artifact().read().await;

        let mut devices = scope.apply(&rows);
        devices.retain(|d| d.has_position());
        if let Some(ids) = device_ids {
            devices.retain(|d| ids.iter().any(|id| id == &d.device_id));
        }
        if let Some(excluded) = exclude_device_id {
            devices.retain(|d| d.device_id != excluded);
        }
        devices.truncate(self.batch_row_cap);

        Ok(devices)
    }

    /// Raw route history for one device over a trailing window, newest
    /// first. Always bypasses the cache. Consecutive duplicate reports
    /// (same coordinates and timestamp) are collapsed.
    pub async fn get_device_route(
        &self,
        principal: Principal,
        device_id: &str,
        hours: u32,
        limit: usize,
    ) -> Result<Vec<RoutePoint>, DeviceAccessError> {
        if hours == 0 || hours > MAX_ROUTE_WINDOW_HOURS {
            return Err(DeviceAccessError::InvalidWindow(format!(
                "hours must be between 1 and {MAX_ROUTE_WINDOW_HOURS}, got {hours}"
            )));
        }

        self.ensure_access(principal, device_id).await?;

        let since_epoch_ms =
            chrono::Utc::now().timestamp_millis() - i64::from(hours) * 3_600_000;
        let limit = limit.clamp(1, 1000);

        let mut points = self
            .store
            .raw_position_history(device_id, since_epoch_ms, limit)
            .await?;
        points.dedup_by(|a, b| a.dedup_key() == b.dedup_key());

        Ok(points)
    }

    /// Manual cache refresh, restricted to elevated principals.
    pub async fn refresh_now(
        &self,
        principal: Principal,
    ) -> Result<RefreshOutcome, DeviceAccessError> {
        if !principal.is_staff {
            return Err(DeviceAccessError::StaffRequired);
        }
        Ok(self.materializer.refresh().await)
    }

    pub async fn check_freshness(&self) -> FreshnessReport {
        self.materializer.freshness().await
    }

    pub fn refresh_stats(&self) -> RefreshStatsReport {
        self.materializer.stats().report()
    }

    /// Builds the principal's visibility scope; one grant lookup per
    /// request for regular users.
    async fn scope_for(&self, principal: Principal) -> Result<AccessScope, StoreError> {
        if principal.is_staff {
            Ok(AccessScope::Unrestricted {
                row_cap: self.staff_row_cap,
            })
        } else {
            let grants = self.store.list_device_grants(principal.user_id).await?;
            Ok(AccessScope::Granted(grants))
        }
    }

    async fn ensure_access(
        &self,
        principal: Principal,
        device_id: &str,
    ) -> Result<(), DeviceAccessError> {
        let scope = self.scope_for(principal).await?;
        if scope.allows(device_id) {
            Ok(())
        } else {
            Err(DeviceAccessError::Denied(device_id.to_string()))
        }
    }

    /// Scoped read of the current cache snapshot.
    async fn scoped_cache_rows(
        &self,
        principal: Principal,
    ) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let scope = self.scope_for(principal).await?;
        let (rows, _) = self.materializer.artifact().read().await;
        Ok(scope.apply(&rows))
    }

    /// Live device listing with the same semantics as the cached one;
    /// scoping happens in-store.
    async fn live_devices(
        &self,
        principal: Principal,
    ) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let visible_to = (!principal.is_staff).then_some(principal.user_id);
        self.store
            .list_devices_with_latest_position(visible_to, self.staff_row_cap)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use geotrail_core::device::FreshnessPolicy;
    use geotrail_core::store::{NewDevice, NewPosition, Result as StoreResult};

    use crate::cache::{CacheArtifact, RefreshStats};

    #[derive(Default)]
    struct MockStore {
        devices: Vec<DeviceSnapshot>,
        grants: HashMap<i64, HashSet<String>>,
        history: Vec<RoutePoint>,
        /// Fails the unscoped (refresh/staff) listing only.
        fail_unscoped_list: AtomicBool,
        /// Fails every listing, scoped or not.
        fail_all_lists: AtomicBool,
        fail_grants: AtomicBool,
    }

    #[async_trait]
    impl PositionStore for MockStore {
        async fn list_devices_with_latest_position(
            &self,
            visible_to: Option<i64>,
            limit: usize,
        ) -> StoreResult<Vec<DeviceSnapshot>> {
            if self.fail_all_lists.load(Ordering::SeqCst)
                || (visible_to.is_none() && self.fail_unscoped_list.load(Ordering::SeqCst))
            {
                return Err(StoreError::ConnectionFailed("store down".to_string()));
            }
            let rows: Vec<DeviceSnapshot> = match visible_to {
                None => self.devices.iter().take(limit).cloned().collect(),
                Some(user_id) => {
                    let granted = self.grants.get(&user_id).cloned().unwrap_or_default();
                    self.devices
                        .iter()
                        .filter(|d| granted.contains(&d.device_id))
                        .cloned()
                        .collect()
                }
            };
            Ok(rows)
        }

        async fn list_device_grants(&self, user_id: i64) -> StoreResult<HashSet<String>> {
            if self.fail_grants.load(Ordering::SeqCst) {
                return Err(StoreError::QueryFailed("grants unavailable".to_string()));
            }
            Ok(self.grants.get(&user_id).cloned().unwrap_or_default())
        }

        async fn get_device(&self, device_id: &str) -> StoreResult<Option<DeviceSnapshot>> {
            Ok(self
                .devices
                .iter()
                .find(|d| d.device_id == device_id)
                .cloned())
        }

        async fn raw_position_history(
            &self,
            device_id: &str,
            since_epoch_ms: i64,
            limit: usize,
        ) -> StoreResult<Vec<RoutePoint>> {
            let _ = device_id;
            Ok(self
                .history
                .iter()
                .filter(|p| p.timestamp > since_epoch_ms)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn upsert_device(&self, _device: &NewDevice) -> StoreResult<()> {
            Ok(())
        }

        async fn insert_position(&self, _position: &NewPosition) -> StoreResult<()> {
            Ok(())
        }
    }

    fn snapshot(device_id: &str, lat: Option<&str>, lon: Option<&str>) -> DeviceSnapshot {
        DeviceSnapshot {
            device_id: device_id.to_string(),
            device_name: device_id.to_uppercase(),
            device_icon: None,
            device_type: Some("tracker".to_string()),
            is_primary: false,
            person_id: None,
            person_name: None,
            latitude: lat.map(str::to_string),
            longitude: lon.map(str::to_string),
            readable_datetime: None,
            timestamp: None,
            battery_level: None,
            battery_status: None,
        }
    }

    struct Fixture {
        store: Arc<MockStore>,
        materializer: Arc<CacheMaterializer>,
        service: DeviceQueryService,
    }

    fn fixture(store: MockStore) -> Fixture {
        let store = Arc::new(store);
        let policy = FreshnessPolicy::new(Duration::from_secs(30), Duration::from_secs(300));
        let materializer = Arc::new(CacheMaterializer::new(
            Arc::clone(&store) as Arc<dyn PositionStore>,
            Arc::new(CacheArtifact::new()),
            Arc::new(RefreshStats::new()),
            policy,
            Duration::from_secs(5),
            1000,
        ));
        let service = DeviceQueryService::new(
            Arc::clone(&store) as Arc<dyn PositionStore>,
            Arc::clone(&materializer),
            1000,
            100,
        );
        Fixture {
            store,
            materializer,
            service,
        }
    }

    fn store_with_fleet() -> MockStore {
        MockStore {
            devices: vec![
                snapshot("a", Some("1.0"), Some("2.0")),
                snapshot("b", Some("3.0"), Some("4.0")),
                snapshot("c", None, None),
                snapshot("d", Some("5.0"), Some("6.0")),
            ],
            grants: HashMap::from([(
                7,
                HashSet::from(["a".to_string(), "c".to_string()]),
            )]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fresh_cache_serves_materialized_view_scoped() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;

        let listing = f.service.get_devices(Principal::user(7)).await.unwrap();

        assert_eq!(listing.source, ListingSource::MaterializedView);
        assert!(!listing.is_stale);
        assert!(listing.cache_age_seconds.unwrap() <= 1);
        let ids: Vec<&str> = listing.devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_staff_sees_whole_fleet() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;

        let listing = f.service.get_devices(Principal::staff(1)).await.unwrap();

        assert_eq!(listing.devices.len(), 4);
        assert_eq!(listing.source, ListingSource::MaterializedView);
    }

    #[tokio::test]
    async fn test_stale_cache_refreshes_then_serves() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;
        f.materializer
            .artifact()
            .backdate(chrono::Duration::seconds(45))
            .await;

        let listing = f.service.get_devices(Principal::user(7)).await.unwrap();

        assert_eq!(listing.source, ListingSource::RefreshedCache);
        assert_eq!(listing.cache_age_seconds, Some(0));
        assert!(!listing.is_stale);
        assert_eq!(listing.devices.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_cache_with_failing_refresh_falls_back() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;
        f.materializer
            .artifact()
            .backdate(chrono::Duration::seconds(45))
            .await;
        f.store.fail_unscoped_list.store(true, Ordering::SeqCst);

        let listing = f.service.get_devices(Principal::user(7)).await.unwrap();

        assert_eq!(listing.source, ListingSource::Fallback);
        assert!(listing.is_stale);
        // The stale age is passed through, not reset.
        assert!(listing.cache_age_seconds.unwrap() >= 45);
        let ids: Vec<&str> = listing.devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_grant_lookup_failure_degrades_to_error_fallback() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;
        f.store.fail_grants.store(true, Ordering::SeqCst);

        let listing = f.service.get_devices(Principal::user(7)).await.unwrap();

        // Live scoped query does not need the grant set, so the request
        // still succeeds.
        assert_eq!(listing.source, ListingSource::ErrorFallback);
        assert!(listing.is_stale);
        assert_eq!(listing.cache_age_seconds, None);
        assert_eq!(listing.devices.len(), 2);
    }

    #[tokio::test]
    async fn test_store_fully_down_is_a_hard_failure() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;
        f.materializer
            .artifact()
            .backdate(chrono::Duration::seconds(45))
            .await;
        f.store.fail_all_lists.store(true, Ordering::SeqCst);

        let result = f.service.get_devices(Principal::user(7)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_single_device_distinguishes_denied_from_not_found() {
        let f = fixture(store_with_fleet());

        // Granted but nonexistent: not found.
        let err = f
            .service
            .get_single_device_position(Principal::staff(1), "ghost")
            .await
            .unwrap_err();
        assert_eq!(err, DeviceAccessError::NotFound("ghost".to_string()));

        // Existing but not granted: denied, checked before existence.
        let err = f
            .service
            .get_single_device_position(Principal::user(7), "b")
            .await
            .unwrap_err();
        assert_eq!(err, DeviceAccessError::Denied("b".to_string()));

        // Granted and existing: live row.
        let row = f
            .service
            .get_single_device_position(Principal::user(7), "a")
            .await
            .unwrap();
        assert_eq!(row.device_id, "a");
    }

    #[tokio::test]
    async fn test_batch_positions_drops_rows_without_coordinates() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;

        let devices = f
            .service
            .get_batch_positions(Principal::user(7), None, None)
            .await
            .unwrap();

        // "c" is granted but has no position.
        let ids: Vec<&str> = devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_batch_positions_subset_and_exclusion() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;

        let subset = vec!["a".to_string(), "b".to_string()];
        let devices = f
            .service
            .get_batch_positions(Principal::staff(1), Some(&subset), Some("a"))
            .await
            .unwrap();

        let ids: Vec<&str> = devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_batch_positions_never_triggers_refresh() {
        let f = fixture(store_with_fleet());
        f.materializer.refresh().await;
        f.materializer
            .artifact()
            .backdate(chrono::Duration::seconds(600))
            .await;
        f.store.fail_all_lists.store(true, Ordering::SeqCst);

        // Store is down and the cache is stale, but batch reads still
        // serve the held snapshot.
        let devices = f
            .service
            .get_batch_positions(Principal::staff(1), None, None)
            .await
            .unwrap();
        assert_eq!(devices.len(), 3);
    }

    fn route_point(ts: i64, lat: &str) -> RoutePoint {
        RoutePoint {
            latitude: lat.to_string(),
            longitude: "2.0".to_string(),
            readable_datetime: None,
            timestamp: ts,
            horizontal_accuracy: None,
            battery_level: None,
        }
    }

    #[tokio::test]
    async fn test_route_collapses_duplicate_reports() {
        let now = chrono::Utc::now().timestamp_millis();
        let mut store = store_with_fleet();
        store.history = vec![
            route_point(now - 1000, "1.0"),
            route_point(now - 1000, "1.0"),
            route_point(now - 1000, "1.0"),
            route_point(now - 2000, "1.5"),
        ];
        let f = fixture(store);

        let points = f
            .service
            .get_device_route(Principal::user(7), "a", 24, 100)
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].latitude, "1.0");
        assert_eq!(points[1].latitude, "1.5");
    }

    #[tokio::test]
    async fn test_route_rejects_bad_window_before_store_access() {
        let mut store = store_with_fleet();
        store.fail_all_lists = AtomicBool::new(true);
        store.fail_grants = AtomicBool::new(true);
        let f = fixture(store);

        let err = f
            .service
            .get_device_route(Principal::user(7), "a", 0, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceAccessError::InvalidWindow(_)));

        let err = f
            .service
            .get_device_route(Principal::user(7), "a", 200, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceAccessError::InvalidWindow(_)));
    }

    #[tokio::test]
    async fn test_route_requires_grant() {
        let f = fixture(store_with_fleet());

        let err = f
            .service
            .get_device_route(Principal::user(7), "b", 24, 100)
            .await
            .unwrap_err();

        assert_eq!(err, DeviceAccessError::Denied("b".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_now_requires_staff() {
        let f = fixture(store_with_fleet());

        let err = f.service.refresh_now(Principal::user(7)).await.unwrap_err();
        assert_eq!(err, DeviceAccessError::StaffRequired);

        let outcome = f.service.refresh_now(Principal::staff(1)).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.rows_affected, 4);
    }

    #[tokio::test]
    async fn test_listing_source_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&ListingSource::MaterializedView).unwrap(),
            "\"materialized_view\""
        );
        assert_eq!(
            serde_json::to_string(&ListingSource::RefreshedCache).unwrap(),
            "\"refreshed_cache\""
        );
        assert_eq!(
            serde_json::to_string(&ListingSource::Fallback).unwrap(),
            "\"fallback\""
        );
        assert_eq!(
            serde_json::to_string(&ListingSource::ErrorFallback).unwrap(),
            "\"error_fallback\""
        );
    }
}
