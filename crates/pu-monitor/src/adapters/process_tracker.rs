//! # Process Tracker
//!
//! Reference processor for Linux-process units. Keeps the set of live units
//! in memory, persists started units to the context store so a restarted
//! monitor can re-adopt them, and forwards every transition to the policy
//! handler.
//!
//! The store only ever holds running units: a unit is written on `start`
//! and erased on `stop` and `destroy`, so whatever a restart re-adopts is
//! re-adopted as running.

use async_trait::async_trait;
use enforcer_telemetry::log_unit_event;
use parking_lot::RwLock;
use shared_types::{EventInfo, EventKind, PuRuntime};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::HandlerError;
use crate::ports::{ContextStore, EventHandler, PolicyHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Created,
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedUnit {
    pub state: UnitState,
    pub runtime: Option<PuRuntime>,
}

pub struct ProcessTracker {
    policy: Arc<dyn PolicyHandler>,
    store: Arc<dyn ContextStore>,
    units: RwLock<HashMap<String, TrackedUnit>>,
}

impl ProcessTracker {
    pub fn new(policy: Arc<dyn PolicyHandler>, store: Arc<dyn ContextStore>) -> Self {
        Self {
            policy,
            store,
            units: RwLock::new(HashMap::new()),
        }
    }

    pub fn tracked(&self, pu_id: &str) -> Option<TrackedUnit> {
        self.units.read().get(pu_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    fn set_state(&self, pu_id: &str, state: UnitState) {
        if let Some(unit) = self.units.write().get_mut(pu_id) {
            unit.state = state;
        }
    }

    async fn persist(&self, event: &EventInfo) -> Result<(), HandlerError> {
        let data = serde_json::to_vec(event).map_err(|e| HandlerError::failed(e.to_string()))?;
        self.store
            .store_context(&event.pu_id, &data)
            .await
            .map_err(|e| HandlerError::failed(format!("persist {}: {e}", event.pu_id)))
    }

    async fn forget(&self, pu_id: &str) -> Result<(), HandlerError> {
        if pu_id.is_empty() {
            return Ok(());
        }
        self.store
            .remove_context(pu_id)
            .await
            .map_err(|e| HandlerError::failed(format!("remove {pu_id}: {e}")))
    }

    /// Insert a running unit unless it is already tracked.
    fn adopt(&self, pu_id: &str, runtime: &PuRuntime) -> Result<(), HandlerError> {
        let mut units = self.units.write();
        if units.contains_key(pu_id) {
            return Err(HandlerError::AlreadyTracked(pu_id.to_string()));
        }
        units.insert(
            pu_id.to_string(),
            TrackedUnit {
                state: UnitState::Running,
                runtime: Some(runtime.clone()),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ProcessTracker {
    async fn create(&self, event: &EventInfo) -> Result<(), HandlerError> {
        {
            let mut units = self.units.write();
            if units.contains_key(&event.pu_id) {
                return Err(HandlerError::AlreadyTracked(event.pu_id.clone()));
            }
            units.insert(
                event.pu_id.clone(),
                TrackedUnit {
                    state: UnitState::Created,
                    runtime: None,
                },
            );
        }
        log_unit_event!(info, "tracker", "Unit created", event.pu_id);
        self.policy.handle_pu_event(&event.pu_id, EventKind::Create).await
    }

    async fn start(&self, event: &EventInfo, runtime: &PuRuntime) -> Result<(), HandlerError> {
        self.persist(event).await?;
        self.units.write().insert(
            event.pu_id.clone(),
            TrackedUnit {
                state: UnitState::Running,
                runtime: Some(runtime.clone()),
            },
        );

        log_unit_event!(info, "tracker", "Unit started", event.pu_id, pid = runtime.pid);
        self.policy.set_pu_runtime(&event.pu_id, runtime).await?;
        self.policy.handle_pu_event(&event.pu_id, EventKind::Start).await
    }

    async fn stop(&self, event: &EventInfo) -> Result<(), HandlerError> {
        self.set_state(&event.pu_id, UnitState::Stopped);
        self.forget(&event.pu_id).await?;
        log_unit_event!(info, "tracker", "Unit stopped", event.pu_id);
        self.policy.handle_pu_event(&event.pu_id, EventKind::Stop).await
    }

    async fn destroy(&self, event: &EventInfo) -> Result<(), HandlerError> {
        self.units.write().remove(&event.pu_id);
        self.forget(&event.pu_id).await?;
        log_unit_event!(info, "tracker", "Unit destroyed", event.pu_id);
        self.policy.handle_pu_event(&event.pu_id, EventKind::Destroy).await
    }

    async fn pause(&self, event: &EventInfo) -> Result<(), HandlerError> {
        self.set_state(&event.pu_id, UnitState::Paused);
        self.policy.handle_pu_event(&event.pu_id, EventKind::Pause).await
    }

    async fn resync(&self, event: &EventInfo, runtime: &PuRuntime) -> Result<(), HandlerError> {
        self.adopt(&event.pu_id, runtime)?;
        log_unit_event!(info, "tracker", "Unit re-adopted", event.pu_id, pid = runtime.pid);
        self.policy.set_pu_runtime(&event.pu_id, runtime).await?;
        self.policy.handle_pu_event(&event.pu_id, EventKind::Start).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::{DirContextStore, MemoryContextStore};
    use tempfile::TempDir;
    use parking_lot::Mutex;
    use shared_types::PuType;

    /// Policy handler that records every notification.
    #[derive(Default)]
    pub(crate) struct RecordingPolicy {
        pub events: Mutex<Vec<(String, EventKind)>>,
        pub runtimes: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl PolicyHandler for RecordingPolicy {
        async fn handle_pu_event(&self, pu_id: &str, event: EventKind) -> Result<(), HandlerError> {
            self.events.lock().push((pu_id.to_string(), event));
            Ok(())
        }

        async fn set_pu_runtime(&self, pu_id: &str, runtime: &PuRuntime) -> Result<(), HandlerError> {
            self.runtimes.lock().push((pu_id.to_string(), runtime.pid));
            Ok(())
        }
    }

    fn event(kind: EventKind) -> EventInfo {
        EventInfo {
            pu_id: "/svc".to_string(),
            name: "svc".to_string(),
            pid: "42".to_string(),
            ..EventInfo::new(kind, PuType::LinuxProcess)
        }
    }

    fn runtime() -> PuRuntime {
        PuRuntime {
            pid: 42,
            name: "svc".to_string(),
            tags: HashMap::new(),
            ips: HashMap::new(),
        }
    }

    fn tracker() -> (ProcessTracker, Arc<RecordingPolicy>, Arc<MemoryContextStore>) {
        let policy = Arc::new(RecordingPolicy::default());
        let store = Arc::new(MemoryContextStore::new());
        (ProcessTracker::new(policy.clone(), store.clone()), policy, store)
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (tracker, policy, store) = tracker();

        tracker.create(&event(EventKind::Create)).await.unwrap();
        assert_eq!(tracker.tracked("/svc").unwrap().state, UnitState::Created);

        tracker.start(&event(EventKind::Start), &runtime()).await.unwrap();
        assert_eq!(tracker.tracked("/svc").unwrap().state, UnitState::Running);
        assert!(store.contains("/svc"));

        tracker.pause(&event(EventKind::Pause)).await.unwrap();
        assert_eq!(tracker.tracked("/svc").unwrap().state, UnitState::Paused);

        tracker.stop(&event(EventKind::Stop)).await.unwrap();
        assert_eq!(tracker.tracked("/svc").unwrap().state, UnitState::Stopped);
        assert!(!store.contains("/svc"));

        tracker.destroy(&event(EventKind::Destroy)).await.unwrap();
        assert!(tracker.tracked("/svc").is_none());
        assert!(!store.contains("/svc"));

        let kinds: Vec<EventKind> = policy.events.lock().iter().map(|(_, k)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Create,
                EventKind::Start,
                EventKind::Pause,
                EventKind::Stop,
                EventKind::Destroy
            ]
        );
        assert_eq!(policy.runtimes.lock().as_slice(), &[("/svc".to_string(), 42)]);
    }

    #[tokio::test]
    async fn test_duplicate_create_already_tracked() {
        let (tracker, _, _) = tracker();
        tracker.create(&event(EventKind::Create)).await.unwrap();
        assert_eq!(
            tracker.create(&event(EventKind::Create)).await,
            Err(HandlerError::AlreadyTracked("/svc".to_string()))
        );
    }

    #[tokio::test]
    async fn test_resync_adopts_once() {
        let (tracker, policy, _) = tracker();
        tracker.resync(&event(EventKind::Create), &runtime()).await.unwrap();
        assert_eq!(tracker.tracked("/svc").unwrap().state, UnitState::Running);

        assert!(matches!(
            tracker.resync(&event(EventKind::Create), &runtime()).await,
            Err(HandlerError::AlreadyTracked(_))
        ));
        assert_eq!(policy.events.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_unit_untracked() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("store");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let policy = Arc::new(RecordingPolicy::default());
        let tracker = ProcessTracker::new(policy.clone(), Arc::new(DirContextStore::new(&blocker)));

        assert!(matches!(
            tracker.start(&event(EventKind::Start), &runtime()).await,
            Err(HandlerError::Failed(_))
        ));
        assert!(tracker.tracked("/svc").is_none());

        tracker.create(&event(EventKind::Create)).await.unwrap();
        assert!(tracker.start(&event(EventKind::Start), &runtime()).await.is_err());
        assert_eq!(tracker.tracked("/svc").unwrap().state, UnitState::Created);
        assert!(policy.runtimes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cgroup_style_id_persisted() {
        let (tracker, _, store) = tracker();
        let mut start = event(EventKind::Start);
        start.pu_id = "/trireme/1234".to_string();

        tracker.start(&start, &runtime()).await.unwrap();
        assert_eq!(tracker.tracked("/trireme/1234").unwrap().state, UnitState::Running);

        let record = store.get_context_info("/trireme/1234").await.unwrap();
        let stored: EventInfo = serde_json::from_slice(&record).unwrap();
        assert_eq!(stored.pu_id, "/trireme/1234");

        let mut walk = store.walk_store().await.unwrap();
        assert_eq!(walk.recv().await.unwrap(), "trireme/1234");
        assert_eq!(walk.recv().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_stopped_unit_not_readopted() {
        let (tracker, _, store) = tracker();
        tracker.start(&event(EventKind::Start), &runtime()).await.unwrap();
        tracker.stop(&event(EventKind::Stop)).await.unwrap();
        assert!(store.is_empty());

        tracker.start(&event(EventKind::Start), &runtime()).await.unwrap();
        assert!(store.contains("/svc"));
    }
}
