//! # Controller ↔ Enforcer
//!
//! The controller holds one session per enforced context; each remote
//! enforcer serves its own socket and only trusts requests tagged with the
//! secret it shares with the controller.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use flow_collector::{flow_fingerprint, FlowCollector, FlowRecord};
    use parking_lot::Mutex;
    use rpc_transport::{
        AuthenticatedHandler, RequestHandler, RpcServer, RpcTransport, TransportConfig,
        TransportError,
    };
    use serde::{Deserialize, Serialize};
    use shared_types::{Request, Response};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::watch;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct EnforcePolicy {
        context_id: String,
        rules: Vec<String>,
    }

    /// Remote enforcer stub recording the policies it was handed.
    #[derive(Clone, Default)]
    struct Enforcer {
        applied: Arc<Mutex<Vec<EnforcePolicy>>>,
        flows: Arc<FlowCollector>,
    }

    #[async_trait]
    impl RequestHandler for Enforcer {
        async fn handle_request(&self, method: &str, request: Request) -> Response {
            if method == "RemoteEnforcer.FlowStats" {
                let flows: Vec<FlowRecord> = self.flows.take_flows().into_values().collect();
                return match serde_json::to_vec(&flows) {
                    Ok(payload) => Response::ok(payload),
                    Err(e) => Response::failed(e.to_string()),
                };
            }
            if method != "RemoteEnforcer.Enforce" {
                return Response::failed(format!("unknown method {method}"));
            }
            match request.decode::<EnforcePolicy>() {
                Ok(policy) => {
                    self.applied.lock().push(policy);
                    Response::ok(Vec::new())
                }
                Err(e) => Response::failed(e.to_string()),
            }
        }
    }

    async fn spawn_enforcer(path: &Path, secret: &[u8]) -> (Enforcer, watch::Sender<bool>) {
        let enforcer = Enforcer::default();
        let server = RpcServer::bind(path).await.unwrap();
        let (tx, rx) = watch::channel(false);
        let handler = Arc::new(AuthenticatedHandler::new(enforcer.clone(), secret.to_vec()));
        tokio::spawn(server.serve(handler, rx));
        (enforcer, tx)
    }

    fn transport() -> RpcTransport {
        RpcTransport::new(
            TransportConfig::default()
                .with_max_retries(50)
                .with_retry_interval(Duration::from_millis(1)),
        )
    }

    fn policy(context_id: &str) -> EnforcePolicy {
        EnforcePolicy {
            context_id: context_id.to_string(),
            rules: vec!["allow app=web".to_string()],
        }
    }

    // =========================================================================
    // FLOWS
    // =========================================================================

    #[tokio::test]
    async fn test_policy_push_to_many_contexts() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(transport());
        let mut enforcers = Vec::new();

        for i in 0..4 {
            let id = format!("pu-{i}");
            let path = dir.path().join(format!("{id}.sock"));
            let secret = format!("secret-{i}").into_bytes();
            let (enforcer, stop) = spawn_enforcer(&path, &secret).await;
            transport.connect(&id, &path, secret).await.unwrap();
            enforcers.push((id, enforcer, stop));
        }

        let mut pushes = Vec::new();
        for (id, _, _) in &enforcers {
            let transport = Arc::clone(&transport);
            let id = id.clone();
            pushes.push(tokio::spawn(async move {
                transport
                    .call_json(&id, "RemoteEnforcer.Enforce", &policy(&id))
                    .await
            }));
        }
        for push in pushes {
            assert!(push.await.unwrap().unwrap().is_ok());
        }

        for (id, enforcer, _) in &enforcers {
            assert_eq!(enforcer.applied.lock().as_slice(), &[policy(id)]);
        }
        assert_eq!(transport.list_contexts(), vec!["pu-0", "pu-1", "pu-2", "pu-3"]);
    }

    #[tokio::test]
    async fn test_wrong_secret_never_reaches_enforcer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pu.sock");
        let (enforcer, _stop) = spawn_enforcer(&path, b"right").await;

        let transport = transport();
        transport.connect("pu", &path, b"wrong".to_vec()).await.unwrap();

        let err = transport
            .call_json("pu", "RemoteEnforcer.Enforce", &policy("pu"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Remote(_)));
        assert!(enforcer.applied.lock().is_empty());
    }

    #[tokio::test]
    async fn test_tampered_request_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pu.sock");
        let (enforcer, _stop) = spawn_enforcer(&path, b"k").await;

        // sign, then alter the payload on the wire
        let mut request = Request::from_json(&policy("pu")).unwrap();
        request.sign(b"k");
        request.payload = serde_json::to_vec(&policy("someone-else")).unwrap();

        let mut client = rpc_transport::RpcClient::connect(&path).await.unwrap();
        let result = client
            .call::<_, Response>("RemoteEnforcer.Enforce", &request)
            .await;
        assert!(result.is_err());
        assert!(enforcer.applied.lock().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_and_reconnect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pu.sock");
        let (_enforcer, _stop) = spawn_enforcer(&path, b"k").await;

        let transport = transport();
        transport.connect("pu", &path, b"k".to_vec()).await.unwrap();
        transport.destroy("pu").await.unwrap();
        assert!(transport.list_contexts().is_empty());

        // the enforcer restarts on a fresh socket
        let (_enforcer2, _stop2) = spawn_enforcer(&path, b"k2").await;
        transport.connect("pu", &path, b"k2".to_vec()).await.unwrap();
        let response = transport
            .call_json("pu", "RemoteEnforcer.Enforce", &policy("pu"))
            .await
            .unwrap();
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_flow_reports_aggregate_at_controller() {
        let dir = TempDir::new().unwrap();
        let transport = transport();
        let flow = FlowRecord {
            context_id: "shared".to_string(),
            source_id: "A".to_string(),
            destination_id: "B".to_string(),
            source_ip: "1.1.1.1".to_string(),
            destination_ip: "2.2.2.2".to_string(),
            destination_port: 80,
            count: 0,
        };

        let mut stops = Vec::new();
        for (id, count) in [("pu-a", 1), ("pu-b", 10)] {
            let path = dir.path().join(format!("{id}.sock"));
            let (enforcer, stop) = spawn_enforcer(&path, b"k").await;
            enforcer.flows.collect_flow_event(&FlowRecord { count, ..flow.clone() });
            transport.connect(id, &path, b"k".to_vec()).await.unwrap();
            stops.push(stop);
        }

        let controller = FlowCollector::new();
        for id in transport.list_contexts() {
            let response = transport
                .call(&id, "RemoteEnforcer.FlowStats", Request::default())
                .await
                .unwrap();
            let reported: Vec<FlowRecord> = serde_json::from_slice(&response.payload).unwrap();
            reported.iter().for_each(|r| controller.collect_flow_event(r));
        }

        assert_eq!(controller.len(), 1);
        assert_eq!(controller.get(&flow_fingerprint(&flow)).unwrap().count, 11);
    }
}
