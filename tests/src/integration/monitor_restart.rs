//! # Monitor Restart
//!
//! Units started under one monitor instance are persisted to a directory
//! context store; a fresh instance over the same directory re-adopts them
//! during `start`, before it accepts any connection.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pu_monitor::{
        ContextStore, DirContextStore, HandlerError, PolicyHandler, ProcessTracker, RpcMonitor,
    };
    use rpc_transport::RpcClient;
    use shared_types::{EventInfo, EventKind, MonitorResponse, PuRuntime, PuType, HANDLE_EVENT_METHOD};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct NoopPolicy;

    #[async_trait]
    impl PolicyHandler for NoopPolicy {
        async fn handle_pu_event(&self, _: &str, _: EventKind) -> Result<(), HandlerError> {
            Ok(())
        }

        async fn set_pu_runtime(&self, _: &str, _: &PuRuntime) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn build(socket: &Path, store_dir: &Path) -> (RpcMonitor, Arc<ProcessTracker>) {
        let store: Arc<dyn ContextStore> = Arc::new(DirContextStore::new(store_dir));
        let monitor = RpcMonitor::new(
            socket.display().to_string(),
            Some(Arc::new(NoopPolicy)),
            None,
            Arc::clone(&store),
        )
        .unwrap();
        let tracker = Arc::new(ProcessTracker::new(monitor.policy_handler(), store));
        monitor
            .register_processor(PuType::LinuxProcess, tracker.clone())
            .unwrap();
        (monitor, tracker)
    }

    fn started(pu_id: &str, pid: u32) -> EventInfo {
        EventInfo {
            pu_id: pu_id.to_string(),
            name: format!("{}.service", pu_id.trim_start_matches('/')),
            pid: pid.to_string(),
            ..EventInfo::new(EventKind::Start, PuType::LinuxProcess)
        }
    }

    #[tokio::test]
    async fn test_restarted_monitor_readopts_units() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("monitor.sock");
        let store_dir = dir.path().join("contexts");
        std::fs::create_dir_all(&store_dir).unwrap();

        // first life
        {
            let (monitor, _) = build(&socket, &store_dir);
            monitor.start().await.unwrap();
            let mut agent = RpcClient::connect(&socket).await.unwrap();
            for (id, pid) in [("/web", 100), ("/db", 200)] {
                let _: MonitorResponse = agent
                    .call(HANDLE_EVENT_METHOD, &started(id, pid))
                    .await
                    .unwrap();
            }
            monitor.stop().await.unwrap();
        }

        // one record goes bad while the monitor is down
        std::fs::create_dir_all(store_dir.join("corrupt")).unwrap();
        std::fs::write(store_dir.join("corrupt").join("eventInfo.data"), b"asdasf").unwrap();

        // second life
        let (monitor, tracker) = build(&socket, &store_dir);
        monitor.start().await.unwrap();

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.tracked("/web").unwrap().runtime.unwrap().pid, 100);
        assert_eq!(tracker.tracked("/db").unwrap().runtime.unwrap().pid, 200);

        // a live start for an adopted unit still works
        let mut agent = RpcClient::connect(&socket).await.unwrap();
        let reply: MonitorResponse = agent
            .call(HANDLE_EVENT_METHOD, &started("/web", 101))
            .await
            .unwrap();
        assert!(reply.error.is_empty());
        assert_eq!(tracker.tracked("/web").unwrap().runtime.unwrap().pid, 101);

        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_destroyed_units_not_readopted() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("monitor.sock");
        let store_dir = dir.path().join("contexts");
        std::fs::create_dir_all(&store_dir).unwrap();

        {
            let (monitor, _) = build(&socket, &store_dir);
            monitor.start().await.unwrap();
            let mut agent = RpcClient::connect(&socket).await.unwrap();
            let _: MonitorResponse = agent
                .call(HANDLE_EVENT_METHOD, &started("/job", 5))
                .await
                .unwrap();
            let destroy = EventInfo {
                pu_id: "/job".to_string(),
                ..EventInfo::new(EventKind::Destroy, PuType::LinuxProcess)
            };
            let _: MonitorResponse = agent.call(HANDLE_EVENT_METHOD, &destroy).await.unwrap();
            monitor.stop().await.unwrap();
        }

        let (monitor, tracker) = build(&socket, &store_dir);
        assert_eq!(monitor.resync().await.replayed, 0);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_missing_store_does_not_block_start() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("monitor.sock");
        let (monitor, tracker) = build(&socket, &dir.path().join("never-created"));

        monitor.start().await.unwrap();
        assert!(tracker.is_empty());
        monitor.stop().await.unwrap();
    }
}
