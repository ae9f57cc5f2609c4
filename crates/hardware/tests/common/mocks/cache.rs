use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use mockall::mock;
use oosim_core::common::ids::AccessId;
use oosim_core::core::units::cache::{AccessKind, CacheController, CacheStats, MemoryAccess};

mock! {
    pub Cache {}
    impl CacheController for Cache {
        fn name(&self) -> &str;
        fn line_size(&self) -> u64;
        fn tag(&self, physical_address: u64) -> u64;
        fn can_access(&self, kind: AccessKind, tag: u64) -> bool;
        fn find_access(&self, tag: u64) -> Option<AccessId>;
        fn begin_access(&mut self, access: &MemoryAccess);
        fn receive(&mut self, access: &MemoryAccess) -> u64;
        fn end_access(&mut self, tag: u64) -> Vec<AccessId>;
        fn stats(&self) -> CacheStats;
    }
}

impl fmt::Debug for MockCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockCache").finish_non_exhaustive()
    }
}

/// Every access the recording cache has received, in order.
pub type Received = Arc<Mutex<Vec<MemoryAccess>>>;

/// A mock cache that behaves like a perfect cache with a fixed latency.
///
/// `admit` decides admission per tag. Accesses to a tag already in flight are
/// reported through `find_access` so the coordinator can alias them. Every
/// `receive` is recorded in the returned log.
pub fn recording_cache(
    line_size: u64,
    latency: u64,
    admit: impl Fn(AccessKind, u64) -> bool + Send + 'static,
) -> (MockCache, Received) {
    let received: Received = Arc::default();
    let in_flight: Arc<Mutex<HashMap<u64, Vec<AccessId>>>> = Arc::default();
    let mut cache = MockCache::new();

    let _ = cache.expect_name().return_const("mock".to_owned());
    let _ = cache.expect_line_size().return_const(line_size);
    let _ = cache
        .expect_tag()
        .returning(move |address| address & !(line_size - 1));
    let _ = cache.expect_can_access().returning(admit);

    let pending = Arc::clone(&in_flight);
    let _ = cache
        .expect_find_access()
        .returning(move |tag| pending.lock().unwrap().get(&tag).and_then(|ids| ids.first().copied()));
    let pending = Arc::clone(&in_flight);
    let _ = cache.expect_begin_access().returning(move |access| {
        pending.lock().unwrap().entry(access.tag).or_default().push(access.id);
    });
    let log = Arc::clone(&received);
    let _ = cache.expect_receive().returning(move |access| {
        log.lock().unwrap().push(*access);
        latency
    });
    let pending = Arc::clone(&in_flight);
    let _ = cache
        .expect_end_access()
        .returning(move |tag| pending.lock().unwrap().remove(&tag).unwrap_or_default());
    let _ = cache.expect_stats().return_const(CacheStats::default());

    (cache, received)
}

/// Number of recorded accesses of `kind`.
pub fn count(received: &Received, kind: AccessKind) -> usize {
    received.lock().unwrap().iter().filter(|a| a.kind == kind).count()
}
