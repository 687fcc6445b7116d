use std::{process, sync::Arc};

use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{error::AppError, pipeline::RenderPipeline, reload::ReloadHub},
    cache::{CacheManager, Invalidator},
    config,
    domain::entities::{NavigationMenuRecord, ProductRecord, StoreRecord},
    infra::{
        http::{HttpState, build_router},
        memory::{MemoryDataStore, MemoryTemplateStore},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli, settings) = config::load_with_cli()
        .map_err(|err| AppError::data(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)
        .map_err(|err| AppError::data(err.to_string()))?;

    let data = Arc::new(MemoryDataStore::new());
    let templates = Arc::new(MemoryTemplateStore::new());
    if settings.render.development {
        seed_demo_store(&data, &templates);
    }

    let cache = Arc::new(CacheManager::in_memory(settings.cache.clone()));
    let pipeline = Arc::new(RenderPipeline::new(
        data,
        templates,
        Arc::clone(&cache),
        settings.render.clone(),
    ));

    let state = HttpState {
        pipeline,
        invalidator: Arc::new(Invalidator::new(Arc::clone(&cache))),
        reload: Arc::new(ReloadHub::new()),
        development: settings.render.development,
        page_max_age_secs: settings.cache.page_ttl_ms / 1000,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::data(format!("failed to bind {}: {err}", settings.server.addr)))?;
    info!(addr = %settings.server.addr, development = settings.render.development, "vetrina listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::data(format!("server error: {err}")))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}

/// A small storefront on `localhost` so a development binary renders
/// something out of the box.
fn seed_demo_store(data: &MemoryDataStore, templates: &MemoryTemplateStore) {
    data.insert_store(StoreRecord {
        id: "demo".to_string(),
        name: "Demo Store".to_string(),
        domain: "localhost".to_string(),
        currency: Some("USD".to_string()),
        money_format: Some("${{amount}}".to_string()),
        locale: Some("en".to_string()),
        decimal_places: Some(2),
        contact_email: None,
        contact_phone: None,
        theme: None,
        updated_at: None,
    });
    for (id, name, price, featured) in [
        ("p1", "Canvas Tote", 2400_i64, true),
        ("p2", "Enamel Mug", 1800, true),
        ("p3", "Linen Apron", 4200, false),
    ] {
        data.insert_product(ProductRecord {
            id: id.to_string(),
            store_id: "demo".to_string(),
            name: name.to_string(),
            slug: None,
            active: true,
            featured,
            price,
            images: Vec::new(),
            created_at: None,
            updated_at: None,
        });
    }
    data.insert_menu(NavigationMenuRecord {
        id: "m1".to_string(),
        store_id: "demo".to_string(),
        domain: "localhost".to_string(),
        name: "Main Menu".to_string(),
        handle: "main-menu".to_string(),
        is_main: true,
        is_active: true,
        menu_data: serde_json::json!([
            { "label": "Home", "url": "/", "isVisible": true },
            { "label": "Catalog", "url": "/collections", "isVisible": true, "sortOrder": 1 }
        ]),
    });

    templates.insert(
        "demo",
        "layout/theme.liquid",
        "<!doctype html>\n<html>\n<head><title>{{ page_title }}</title></head>\n\
         <body>\n<nav>{% for link in linklists.main-menu.links %}\
         <a href=\"{{ link.url }}\">{{ link.title }}</a> {% endfor %}</nav>\n\
         {{ content_for_layout }}\n</body>\n</html>\n",
    );
    templates.insert(
        "demo",
        "templates/index.json",
        r#"{ "sections": { "hero": { "type": "hero" }, "grid": { "type": "product-grid" } }, "order": ["hero", "grid"] }"#,
    );
    templates.insert(
        "demo",
        "sections/hero.liquid",
        "<section class=\"hero\"><h1>{{ shop.name }}</h1></section>\n\
         {% schema %}{ \"name\": \"Hero\" }{% endschema %}",
    );
    templates.insert(
        "demo",
        "sections/product-grid.liquid",
        "<section class=\"grid\">{% for product in products %}\
         <article><a href=\"{{ product.url }}\">{{ product.title }}</a> \
         {{ product.price | money }}</article>{% endfor %}</section>\n\
         {% schema %}{ \"name\": \"Product grid\" }{% endschema %}",
    );
    templates.insert(
        "demo",
        "templates/product.liquid",
        "<article><h1>{{ product.title }}</h1><p>{{ product.price | money }}</p></article>",
    );
    templates.insert(
        "demo",
        "templates/collection.liquid",
        "<h1>{{ page_title }}</h1>",
    );
    templates.insert("demo", "templates/cart.liquid", "<h1>Cart ({{ cart.item_count }})</h1>");
    templates.insert("demo", "templates/search.liquid", "<h1>Search</h1>");
    templates.insert("demo", "templates/page.liquid", "<h1>{{ page_title }}</h1>");
}
