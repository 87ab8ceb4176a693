//! 파일 저장소 기반 조립 테스트.
//!
//! 프로세스 재시작을 흉내 내어 수동 URL, 마지막 유효 URL, 비상 플래그가
//! 같은 저장소 파일을 통해 유지되는지 확인한다.

use async_trait::async_trait;
use pandora_core::config::ServerConfig;
use pandora_core::config_manager::ConfigManager;
use pandora_core::models::backend::EndpointSource;
use pandora_core::ports::kv_store::KeyValueStore;
use pandora_core::ports::probe::{BackendProbe, ProbeFailure, ProbeOutcome};
use pandora_network::locator::BackendLocator;
use pandora_session::route_gate::RouteGate;
use pandora_storage::JsonFileStore;
use std::path::Path;
use std::sync::Arc;

struct OnlyAlive(&'static str);

#[async_trait]
impl BackendProbe for OnlyAlive {
    async fn probe(&self, base_url: &str) -> ProbeOutcome {
        if base_url == self.0 {
            ProbeOutcome::Alive { status: 200 }
        } else {
            ProbeOutcome::Unreachable {
                failure: ProbeFailure::Refused,
                message: "refused".to_string(),
            }
        }
    }
}

fn open(dir: &Path) -> Arc<dyn KeyValueStore> {
    Arc::new(JsonFileStore::open_in(dir).unwrap())
}

#[tokio::test]
async fn discovered_backend_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let alive = "http://localhost:8080/api";

    {
        let locator = BackendLocator::new(
            &ServerConfig::default(),
            open(dir.path()),
            Arc::new(OnlyAlive(alive)),
        );
        let endpoint = locator.resolve().await.unwrap();
        assert_eq!(endpoint.source, EndpointSource::Auto);
    }

    let locator = BackendLocator::new(
        &ServerConfig::default(),
        open(dir.path()),
        Arc::new(OnlyAlive(alive)),
    );
    let endpoint = locator.resolve().await.unwrap();
    assert_eq!(endpoint.url, alive);
    assert_eq!(endpoint.source, EndpointSource::Cached);
}

#[tokio::test]
async fn manual_url_and_emergency_flag_persist() {
    let dir = tempfile::tempdir().unwrap();
    let manual = "https://pandora.example.com/api";

    {
        let store = open(dir.path());
        let locator = BackendLocator::new(
            &ServerConfig::default(),
            store.clone(),
            Arc::new(OnlyAlive("")),
        );
        locator.set_manual_url(Some(manual)).unwrap();
        RouteGate::new(store, "/login").set_emergency_mode(true).unwrap();
    }

    let store = open(dir.path());
    let locator = BackendLocator::new(&ServerConfig::default(), store.clone(), Arc::new(OnlyAlive("")));
    assert_eq!(locator.manual_url().as_deref(), Some(manual));
    assert_eq!(locator.resolve().await.unwrap().url, manual);
    assert!(RouteGate::new(store.clone(), "/login").emergency_mode());

    locator.set_manual_url(None).unwrap();
    let reopened = BackendLocator::new(&ServerConfig::default(), open(dir.path()), Arc::new(OnlyAlive("")));
    assert!(reopened.manual_url().is_none());
}

#[test]
fn config_file_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let manager = ConfigManager::with_path(path.clone()).unwrap();
    assert!(path.exists());

    let config = manager.get();
    assert_eq!(config.server.login_route, "/login");
    assert_eq!(config.timeouts.probe().as_millis(), 2_500);
}
