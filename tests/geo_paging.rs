use photo_trails_sync::catalog::{
    CatalogClient, CatalogPreview, CatalogSource, CLEAR_FAILED_MESSAGE, CLEAR_OK_MESSAGE,
};
use photo_trails_sync::config::ClientConfig;
use photo_trails_sync::logging::DebugLog;
use photo_trails_sync::map::{GeoPageLoader, LoadOutcome, MarkerLayer, FIT_PADDING_PX};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use warp::Filter;

macro_rules! spawn_server {
    ($routes:expr) => {{
        let (addr, server) = warp::serve($routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }};
}

fn record(id: u64) -> Value {
    // Every fifth record has no coordinates
    if id % 5 == 0 {
        json!({ "id": id, "file_path": format!("uploads/{}.jpg", id), "latitude": null, "longitude": null })
    } else {
        json!({
            "id": id,
            "file_path": format!("uploads/{}.jpg", id),
            "latitude": 40.0 + id as f64 / 10_000.0,
            "longitude": -3.0 - id as f64 / 10_000.0,
            "url": format!("/uploads/{}.jpg", id),
        })
    }
}

/// `/photos` listing: bare array without `with_gps`, envelope pages with it.
fn photos_route(
    total: u64,
    seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("photos")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |query: HashMap<String, String>| {
            seen.lock().unwrap().push(query.clone());
            if !query.contains_key("with_gps") {
                let rows: Vec<Value> = (1..=5).map(record).collect();
                return warp::reply::json(&rows);
            }
            let offset: u64 = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
            let limit: u64 = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(500);
            let end = (offset + limit).min(total);
            let items: Vec<Value> = (offset..end).map(|i| record(i + 1)).collect();
            warp::reply::json(&json!({
                "items": items,
                "has_more": end < total,
                "limit": limit,
            }))
        })
}

fn config_for(addr: std::net::SocketAddr) -> ClientConfig {
    ClientConfig {
        server_url: format!("http://{}", addr),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn test_loads_every_geo_page() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_server!(photos_route(1200, seen.clone()));
    let config = config_for(addr);

    let source: Arc<dyn CatalogSource> = Arc::new(CatalogClient::from_config(&config).unwrap());
    let layer = Arc::new(MarkerLayer::new());
    let loader = GeoPageLoader::new(source, layer.clone(), config.geo_page_size, DebugLog::new());

    let outcome = loader.load_all().await;

    // 1200 records, 240 without coordinates
    match outcome {
        LoadOutcome::Installed { markers, pages, .. } => {
            assert_eq!(markers, 960);
            assert_eq!(pages, 3);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(layer.marker_count(), 960);

    let offsets: Vec<String> = seen.lock().unwrap().iter().map(|q| q["offset"].clone()).collect();
    assert_eq!(offsets, vec!["0", "500", "1000"]);
    assert!(seen.lock().unwrap().iter().all(|q| q["with_gps"] == "1" && q["limit"] == "500"));

    let (bounds, padding) = layer.fitted_bounds().unwrap();
    assert_eq!(padding, FIT_PADDING_PX);
    assert!(bounds.south > 40.0 && bounds.north < 40.2);
    assert!(bounds.west < -3.1 && bounds.east < -3.0);

    let first = &layer.markers()[0];
    assert_eq!(first.record.id, 1);
    assert_eq!(first.tooltip_url(), Some("/uploads/1.jpg"));
}

#[tokio::test]
async fn test_failed_page_keeps_markers() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let route = warp::path("photos")
        .and(warp::query::<HashMap<String, String>>())
        .map(move |query: HashMap<String, String>| {
            counter.fetch_add(1, Ordering::SeqCst);
            if query.get("offset").map(String::as_str) == Some("500") {
                return warp::reply::with_status(
                    warp::reply::json(&json!({ "error": "boom" })),
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                );
            }
            let items: Vec<Value> = (1..=4).map(record).collect();
            warp::reply::with_status(
                warp::reply::json(&json!({ "items": items, "has_more": true, "limit": 500 })),
                warp::http::StatusCode::OK,
            )
        });
    let addr = spawn_server!(route);
    let config = config_for(addr);

    let source: Arc<dyn CatalogSource> = Arc::new(CatalogClient::from_config(&config).unwrap());
    let layer = Arc::new(MarkerLayer::new());
    let loader = GeoPageLoader::new(source, layer.clone(), 500, DebugLog::new());

    assert!(matches!(loader.load_all().await, LoadOutcome::Failed(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(layer.installs(), 0);
    assert_eq!(layer.marker_count(), 0);
}

#[tokio::test]
async fn test_preview_reads_bare_listing() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_server!(photos_route(0, seen));
    let config = config_for(addr);

    let preview = CatalogPreview::new(Arc::new(CatalogClient::from_config(&config).unwrap()), DebugLog::new());
    assert!(preview.refresh().await);

    let rows = preview.rows();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].file_path, "uploads/1.jpg");
    let (lat, lng) = rows[0].coordinates().unwrap();
    assert!((lat - 40.0001).abs() < 1e-9);
    assert!((lng + 3.0001).abs() < 1e-9);
    assert_eq!(rows[4].coordinates(), None);
}

#[tokio::test]
async fn test_clear_action() {
    let cleared = Arc::new(AtomicUsize::new(0));
    let counter = cleared.clone();
    let clear = warp::path("clear").and(warp::post()).map(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        warp::reply::json(&json!({ "message": "cleared" }))
    });
    let photos = warp::path("photos").map(|| warp::reply::json(&Vec::<Value>::new()));
    let addr = spawn_server!(clear.or(photos));

    let log = DebugLog::new();
    let preview = CatalogPreview::new(
        Arc::new(CatalogClient::from_config(&config_for(addr)).unwrap()),
        log.clone(),
    );

    assert_eq!(preview.clear_and_refresh().await, CLEAR_OK_MESSAGE);
    assert_eq!(cleared.load(Ordering::SeqCst), 1);
    assert!(preview.rows().is_empty());

    // Unknown endpoint: 404
    let misconfigured = ClientConfig {
        clear_endpoint: "/wipe".to_string(),
        ..config_for(addr)
    };
    let preview = CatalogPreview::new(Arc::new(CatalogClient::from_config(&misconfigured).unwrap()), log);
    assert_eq!(preview.clear_and_refresh().await, CLEAR_FAILED_MESSAGE);
}
