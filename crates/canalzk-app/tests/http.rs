use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use canalzk_app::{router, AppState};
use canalzk_collector::{ClusterDescriptor, ExporterConfig};
use canalzk_config::ConfigManager;
use canalzk_coord::MemStore;
use tokio::net::TcpListener;

const DESTS: &str = "/otter/canal/destinations";

async fn serve(store: MemStore, config: ExporterConfig) -> (SocketAddr, Arc<ConfigManager<ExporterConfig>>) {
    let manager = Arc::new(ConfigManager::new(config));
    let state = AppState::new(Arc::new(store), manager.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    (addr, manager)
}

fn seeded() -> MemStore {
    let store = MemStore::new();
    store.create(&format!("{}/inst1/cluster/10.0.0.1:11111", DESTS), "");
    store.create(&format!("{}/inst1/cluster/10.0.0.2:11111", DESTS), "");
    store.create(&format!("{}/inst1/running", DESTS), r#"{"active":true}"#);
    store.refuse("down:2181");
    store
}

fn config(clusters: Vec<ClusterDescriptor>) -> ExporterConfig {
    ExporterConfig {
        clusters,
        ..ExporterConfig::default()
    }
}

#[tokio::test]
async fn test_landing_page_links_metrics() {
    let (addr, _) = serve(seeded(), config(vec![])).await;
    let resp = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<a href=\"/metrics\">"));
}

#[tokio::test]
async fn test_metrics_exposition() {
    let clusters = vec![
        ClusterDescriptor::new("shard1", "down:2181"),
        ClusterDescriptor::new("shard2", "up:2181"),
    ];
    let (addr, _) = serve(seeded(), config(clusters)).await;

    let resp = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain; version=0.0.4"));

    let body = resp.text().await.unwrap();
    assert!(body.contains(r#"canal_zk_up{cluster="shard1",endpoint="down:2181"} 1"#));
    assert!(body.contains(r#"canal_zk_cluster{cluster="shard2",destination="inst1"} 2"#));
    assert!(body.contains(r#"canal_zk_running{cluster="shard2",destination="inst1"} 0"#));
    assert!(!body.contains(r#"cluster="shard2",endpoint"#));
    assert!(!body.contains("canal_zk_timestamp{"));
    assert!(body.contains("canal_zk_exporter_build_info"));
}

#[tokio::test]
async fn test_custom_namespace_and_path() {
    let mut cfg = config(vec![ClusterDescriptor::new("shard1", "down:2181")]);
    cfg.namespace = "cdc".into();
    cfg.web.metrics_path = "/scrape".into();
    let (addr, _) = serve(seeded(), cfg).await;

    let resp = reqwest::get(format!("http://{}/scrape", addr)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains(r#"cdc_zk_up{cluster="shard1",endpoint="down:2181"} 1"#));

    let resp = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_scrape_bounded_by_web_timeout() {
    let store = seeded();
    store.stall("hung:2181");
    let mut cfg = config(vec![ClusterDescriptor::new("shard1", "hung:2181")]);
    cfg.web.timeout = Duration::from_millis(100);
    cfg.zk.timeout = Duration::from_secs(30);
    let (addr, _) = serve(store, cfg).await;

    let resp = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_abandoned_scrape_releases_sessions() {
    let store = seeded();
    // Connect succeeds; every read then outlives the web timeout.
    store.set_latency(Some(Duration::from_secs(10)));
    let mut cfg = config(vec![ClusterDescriptor::new("shard2", "up:2181")]);
    cfg.web.timeout = Duration::from_millis(100);
    cfg.zk.timeout = Duration::from_secs(30);
    let (addr, _) = serve(store.clone(), cfg).await;

    let resp = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(resp.status(), 503);
    assert_eq!(store.total_sessions(), 1);

    // Aborted scan tasks drop their sessions once the runtime cancels them.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while store.open_sessions() != 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn test_reload_changes_next_scrape() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut file,
        b"[clusters.shard1]\nendpoint = \"down:2181\"\n",
    )
    .unwrap();
    let manager = Arc::new(ConfigManager::<ExporterConfig>::load(file.path()).unwrap());

    let state = AppState::new(Arc::new(seeded()), manager.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    let body = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"cluster="shard1""#));

    std::fs::write(file.path(), "[clusters.shard9]\nzk = \"up:2181\"\n").unwrap();
    manager.reload().unwrap();

    let body = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!body.contains(r#"cluster="shard1""#));
    assert!(body.contains(r#"canal_zk_cluster{cluster="shard9",destination="inst1"} 2"#));
}

#[tokio::test]
async fn test_invalid_reload_keeps_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"[clusters.shard1]\nendpoint = \"down:2181\"\n").unwrap();
    let manager = ConfigManager::<ExporterConfig>::load(file.path()).unwrap();

    std::fs::write(file.path(), "[clusters.shard1]\nchroot = \"/x\"\n").unwrap();
    assert!(manager.reload().is_err());
    assert_eq!(manager.get().clusters[0].endpoint, "down:2181");
}
