use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::Snapshot;
use crate::services::backend::ProcessBackend;
use crate::services::error::FetchError;

/// Serialises snapshot reads: at most one fetch is outstanding at a time.
///
/// A fetch runs under a [`FetchPermit`]; the caller keeps the permit until it
/// has applied the snapshot, so two snapshots can never be applied
/// interleaved. A request that arrives while a permit is out is recorded and
/// can be collected with [`SnapshotFetcher::take_pending`].
pub struct SnapshotFetcher {
    backend: Arc<dyn ProcessBackend>,
    in_flight: AtomicBool,
    pending: AtomicBool,
}

pub struct FetchPermit<'a> {
    fetcher: &'a SnapshotFetcher,
}

impl SnapshotFetcher {
    pub fn new(backend: Arc<dyn ProcessBackend>) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    /// Claims the fetch slot, or records a pending request if it is taken.
    ///
    /// A fetch that starts satisfies every request recorded before it, so
    /// claiming the slot clears the pending flag. A flag left behind by a
    /// fetch that was dropped mid-flight is consumed by the next one.
    pub fn begin(&self) -> Option<FetchPermit<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.pending.store(true, Ordering::Release);
            log::debug!("Snapshot fetch already in flight, request coalesced");
            return None;
        }
        self.pending.store(false, Ordering::Release);
        Some(FetchPermit { fetcher: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// A refresh was requested while busy and has not been served yet
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns and clears the "refresh requested while busy" flag
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

impl FetchPermit<'_> {
    pub async fn fetch(&self) -> Result<Snapshot, FetchError> {
        self.fetcher
            .backend
            .get_processes()
            .await
            .map_err(FetchError::from)
    }
}

impl Drop for FetchPermit<'_> {
    fn drop(&mut self) {
        self.fetcher.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::error::BackendError;
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl ProcessBackend for Failing {
        async fn get_processes(&self) -> Result<Snapshot, BackendError> {
            Err(BackendError::Permission("no access to /proc".to_string()))
        }

        async fn kill_process(&self, _pid: u32) -> Result<bool, BackendError> {
            Ok(false)
        }
    }

    #[test]
    fn second_begin_is_refused_and_marked_pending() {
        let fetcher = SnapshotFetcher::new(Arc::new(Failing));

        let permit = fetcher.begin().expect("slot is free");
        assert!(fetcher.is_in_flight());
        assert!(fetcher.begin().is_none());

        drop(permit);
        assert!(!fetcher.is_in_flight());
        assert!(fetcher.take_pending());
        assert!(!fetcher.take_pending());
        assert!(fetcher.begin().is_some());
    }

    #[test]
    fn dropped_permit_leaves_request_for_the_next_fetch() {
        let fetcher = SnapshotFetcher::new(Arc::new(Failing));

        let permit = fetcher.begin().unwrap();
        assert!(fetcher.begin().is_none());
        drop(permit);
        assert!(fetcher.is_pending());

        let _next = fetcher.begin().unwrap();
        assert!(!fetcher.is_pending());
        assert!(!fetcher.take_pending());
    }

    #[tokio::test]
    async fn backend_errors_become_fetch_errors() {
        let fetcher = SnapshotFetcher::new(Arc::new(Failing));
        let permit = fetcher.begin().unwrap();
        let err = permit.fetch().await.unwrap_err();
        assert_eq!(
            err,
            FetchError(BackendError::Permission("no access to /proc".to_string()))
        );
        assert!(err.to_string().contains("no access to /proc"));
    }
}
