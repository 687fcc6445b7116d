use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, HOST, IF_NONE_MATCH},
    },
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use vetrina::application::pipeline::{RenderConfig, RenderPipeline};
use vetrina::application::repos::{DataStore, TemplateStore};
use vetrina::application::reload::ReloadHub;
use vetrina::cache::{CacheConfig, CacheManager, Invalidator};
use vetrina::domain::entities::StoreRecord;
use vetrina::infra::http::{HttpState, build_router};
use vetrina::infra::memory::{MemoryDataStore, MemoryTemplateStore};

struct Harness {
    router: Router,
    templates: Arc<MemoryTemplateStore>,
}

fn harness(development: bool) -> Harness {
    let data = Arc::new(MemoryDataStore::new());
    data.insert_store(StoreRecord {
        id: "demo".to_string(),
        name: "Demo Store".to_string(),
        domain: "demo.example.com".to_string(),
        currency: Some("USD".to_string()),
        money_format: Some("${{amount}}".to_string()),
        locale: Some("en".to_string()),
        decimal_places: Some(2),
        contact_email: None,
        contact_phone: None,
        theme: None,
        updated_at: None,
    });

    let templates = Arc::new(MemoryTemplateStore::new());
    templates.insert(
        "demo",
        "layout/theme.liquid",
        "<html><head><title>{{ page_title }}</title></head>\
         <body>{{ content_for_layout }}</body></html>",
    );
    templates.insert("demo", "templates/index.liquid", "<h1>{{ shop.name }}</h1>");

    let cache = Arc::new(CacheManager::in_memory(CacheConfig::default()));
    let pipeline = Arc::new(RenderPipeline::new(
        Arc::clone(&data) as Arc<dyn DataStore>,
        Arc::clone(&templates) as Arc<dyn TemplateStore>,
        Arc::clone(&cache),
        RenderConfig {
            development,
            ..RenderConfig::default()
        },
    ));

    let router = build_router(HttpState {
        pipeline,
        invalidator: Arc::new(Invalidator::new(cache)),
        reload: Arc::new(ReloadHub::new()),
        development,
        page_max_age_secs: 1800,
    });
    Harness { router, templates }
}

fn storefront_get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(HOST, "demo.example.com")
        .body(Body::empty())
        .expect("request")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn healthz_responds_no_content() {
    let harness = harness(false);
    let response = harness
        .router
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn storefront_render_sets_etag_and_cache_headers() {
    let harness = harness(false);
    let response = harness
        .router
        .oneshot(storefront_get("/"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).map(|v| v.to_str().unwrap()),
        Some("text/html; charset=utf-8")
    );
    assert!(response.headers().contains_key(ETAG));
    assert_eq!(
        response.headers().get(CACHE_CONTROL).map(|v| v.to_str().unwrap()),
        Some("public, max-age=1800")
    );
    let body = body_string(response).await;
    assert!(body.contains("<h1>Demo Store</h1>"));
}

#[tokio::test]
async fn development_mode_disables_browser_caching() {
    let harness = harness(true);
    let response = harness
        .router
        .oneshot(storefront_get("/"))
        .await
        .expect("response");
    assert_eq!(
        response.headers().get(CACHE_CONTROL).map(|v| v.to_str().unwrap()),
        Some("no-store")
    );
}

#[tokio::test]
async fn conditional_request_returns_not_modified() {
    let harness = harness(false);
    let first = harness
        .router
        .clone()
        .oneshot(storefront_get("/"))
        .await
        .expect("first response");
    let etag = first
        .headers()
        .get(ETAG)
        .expect("etag")
        .to_str()
        .expect("etag string")
        .to_string();

    let second = harness
        .router
        .oneshot(
            Request::builder()
                .uri("/")
                .header(HOST, "demo.example.com")
                .header(IF_NONE_MATCH, &etag)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("second response");
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(
        second.headers().get(ETAG).map(|v| v.to_str().unwrap()),
        Some(etag.as_str())
    );
}

#[tokio::test]
async fn unknown_domain_renders_a_not_found_page() {
    let harness = harness(false);
    let response = harness
        .router
        .oneshot(
            Request::builder()
                .uri("/")
                .header(HOST, "other.example.com")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    assert!(body.contains("NOT_FOUND"));
}

#[tokio::test]
async fn webhook_invalidation_picks_up_changed_templates() {
    let harness = harness(false);
    let first = harness
        .router
        .clone()
        .oneshot(storefront_get("/"))
        .await
        .expect("first response");
    assert!(body_string(first).await.contains("Demo Store"));

    harness
        .templates
        .insert("demo", "templates/index.liquid", "<h1>Redesigned</h1>");
    let webhook = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/cache")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{ "changeType": "template_updated", "storeId": "demo" }"#,
                ))
                .expect("request"),
        )
        .await
        .expect("webhook response");
    assert_eq!(webhook.status(), StatusCode::ACCEPTED);

    let second = harness
        .router
        .oneshot(storefront_get("/"))
        .await
        .expect("second response");
    assert!(body_string(second).await.contains("Redesigned"));
}

#[tokio::test]
async fn reload_stream_exists_only_in_development() {
    let dev = harness(true);
    let response = dev
        .router
        .oneshot(
            Request::builder()
                .uri("/dev/reload")
                .header(HOST, "demo.example.com")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).map(|v| v.to_str().unwrap()),
        Some("text/event-stream")
    );

    let prod = harness(false);
    let response = prod
        .router
        .oneshot(
            Request::builder()
                .uri("/dev/reload")
                .header(HOST, "demo.example.com")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    // Falls through to the storefront renderer, which has no such route.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
