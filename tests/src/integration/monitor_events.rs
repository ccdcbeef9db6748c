//! # Monitor Events
//!
//! An external agent reports lifecycle events to a running monitor through
//! `Server.HandleEvent`, the same way a container runtime hook would.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pu_monitor::{
        HandlerError, MemoryContextStore, PolicyHandler, ProcessTracker, RpcMonitor, UnitState,
    };
    use rpc_transport::{RpcClient, TransportError};
    use shared_types::{
        EventInfo, EventKind, MonitorResponse, PuRuntime, PuType, HANDLE_EVENT_METHOD,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Policy {
        seen: Mutex<Vec<(String, EventKind)>>,
    }

    #[async_trait]
    impl PolicyHandler for Policy {
        async fn handle_pu_event(&self, pu_id: &str, event: EventKind) -> Result<(), HandlerError> {
            self.seen.lock().push((pu_id.to_string(), event));
            Ok(())
        }

        async fn set_pu_runtime(&self, _: &str, _: &PuRuntime) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn unit_event(kind: EventKind) -> EventInfo {
        EventInfo {
            pu_id: "/redis".to_string(),
            name: "redis.service".to_string(),
            pid: "3131".to_string(),
            ..EventInfo::new(kind, PuType::LinuxProcess)
        }
    }

    #[tokio::test]
    async fn test_unit_lifecycle_over_socket() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("monitor.sock");
        let policy = Arc::new(Policy::default());
        let store = Arc::new(MemoryContextStore::new());

        let monitor = RpcMonitor::new(
            socket.display().to_string(),
            Some(policy.clone()),
            None,
            store.clone(),
        )
        .unwrap();
        let tracker = Arc::new(ProcessTracker::new(monitor.policy_handler(), store.clone()));
        monitor
            .register_processor(PuType::LinuxProcess, tracker.clone())
            .unwrap();
        monitor.start().await.unwrap();

        let mut agent = RpcClient::connect(&socket).await.unwrap();
        for kind in [EventKind::Create, EventKind::Start] {
            let reply: MonitorResponse = agent
                .call(HANDLE_EVENT_METHOD, &unit_event(kind))
                .await
                .unwrap();
            assert!(reply.error.is_empty());
        }
        assert_eq!(tracker.tracked("/redis").unwrap().state, UnitState::Running);
        assert!(store.contains("/redis"));

        // a second create for a live unit is the handler's error, verbatim
        let err = agent
            .call::<_, MonitorResponse>(HANDLE_EVENT_METHOD, &unit_event(EventKind::Create))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Remote(m) if m == "unit already tracked: /redis"));

        for kind in [EventKind::Stop, EventKind::Destroy] {
            let _: MonitorResponse = agent
                .call(HANDLE_EVENT_METHOD, &unit_event(kind))
                .await
                .unwrap();
        }
        assert!(tracker.tracked("/redis").is_none());
        assert!(!store.contains("/redis"));

        let seen: Vec<EventKind> = policy.seen.lock().iter().map(|(_, k)| *k).collect();
        assert_eq!(
            seen,
            vec![EventKind::Create, EventKind::Start, EventKind::Stop, EventKind::Destroy]
        );

        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_events_leave_connection_usable() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("monitor.sock");
        let store = Arc::new(MemoryContextStore::new());
        let monitor = RpcMonitor::new(
            socket.display().to_string(),
            Some(Arc::new(Policy::default())),
            None,
            store.clone(),
        )
        .unwrap();
        let tracker = Arc::new(ProcessTracker::new(monitor.policy_handler(), store));
        monitor.register_processor(PuType::LinuxProcess, tracker).unwrap();
        monitor.start().await.unwrap();

        let mut agent = RpcClient::connect(&socket).await.unwrap();

        let mut bad_pid = unit_event(EventKind::Start);
        bad_pid.pid = "abc".to_string();
        let unknown = EventInfo {
            event_type: "explode".to_string(),
            ..unit_event(EventKind::Start)
        };
        let container = EventInfo::new(EventKind::Start, PuType::Container);

        for event in [bad_pid, unknown, container, EventInfo::default()] {
            assert!(agent
                .call::<_, MonitorResponse>(HANDLE_EVENT_METHOD, &event)
                .await
                .is_err());
        }

        let reply: MonitorResponse = agent
            .call(HANDLE_EVENT_METHOD, &unit_event(EventKind::Start))
            .await
            .unwrap();
        assert!(reply.error.is_empty());

        monitor.stop().await.unwrap();
    }
}
