//! The render pipeline.
//!
//! Six stages per request: resolve the tenant, check the page cache, load
//! (or compile) the templates, build the context under the fetch deadline,
//! execute page-into-layout, assemble and cache the final document.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::application::context::{ContextBuilder, ContextParams, PageInfo, collection_view, product_view};
use crate::application::error::AppError;
use crate::application::fetchers::{ContentFetcher, NavigationFetcher, ProductFetcher, StoreFetcher};
use crate::application::repos::{DataStore, TemplateStore};
use crate::cache::{CacheKind, CacheManager, CachedPage, CachedValue, keys};
use crate::domain::entities::{ProductPage, StoreRecord};
use crate::domain::navigation::ProcessedMenu;
use crate::template::{CompiledTemplate, JsonMap, TemplateCompiler};

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_PRODUCTS_PER_PAGE: u32 = 20;
pub const DEFAULT_FEATURED_LIMIT: u32 = 8;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Hard deadline over the whole data-fetch phase of one request.
    pub fetch_timeout: Duration,
    pub development: bool,
    pub products_per_page: u32,
    pub featured_limit: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            development: false,
            products_per_page: DEFAULT_PRODUCTS_PER_PAGE,
            featured_limit: DEFAULT_FEATURED_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub domain: String,
    pub path: String,
    pub query: HashMap<String, String>,
}

impl RenderRequest {
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
            query: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub etag: String,
    pub from_cache: bool,
}

/// Typed routing of a storefront path. Paths outside the storefront URL
/// scheme have no route at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRoute {
    Index,
    Product(String),
    CollectionIndex,
    Collection(String),
    Page(String),
    Cart,
    Search,
}

impl PageRoute {
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Some(PageRoute::Index);
        }
        let mut segments = trimmed.split('/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some("products"), Some(handle), None) => Some(PageRoute::Product(handle.to_string())),
            (Some("collections"), None, None) => Some(PageRoute::CollectionIndex),
            (Some("collections"), Some(handle), None) => {
                Some(PageRoute::Collection(handle.to_string()))
            }
            (Some("pages"), Some(handle), None) => Some(PageRoute::Page(handle.to_string())),
            (Some("cart"), None, None) => Some(PageRoute::Cart),
            (Some("search"), None, None) => Some(PageRoute::Search),
            _ => None,
        }
    }

    /// Bare template name for the route.
    pub fn template_name(&self) -> &'static str {
        match self {
            PageRoute::Index => "index",
            PageRoute::Product(_) => "product",
            PageRoute::CollectionIndex | PageRoute::Collection(_) => "collection",
            PageRoute::Page(_) => "page",
            PageRoute::Cart => "cart",
            PageRoute::Search => "search",
        }
    }
}

const LAYOUT_PATH: &str = "layout/theme.liquid";

pub struct RenderPipeline {
    stores: StoreFetcher,
    products: ProductFetcher,
    navigation: NavigationFetcher,
    content: ContentFetcher,
    templates: Arc<dyn TemplateStore>,
    compiler: Arc<TemplateCompiler>,
    cache: Arc<CacheManager>,
    config: RenderConfig,
}

impl RenderPipeline {
    pub fn new(
        data: Arc<dyn DataStore>,
        templates: Arc<dyn TemplateStore>,
        cache: Arc<CacheManager>,
        config: RenderConfig,
    ) -> Self {
        Self {
            stores: StoreFetcher::new(Arc::clone(&data), Arc::clone(&cache)),
            products: ProductFetcher::new(Arc::clone(&data), Arc::clone(&cache)),
            navigation: NavigationFetcher::new(Arc::clone(&data), Arc::clone(&cache)),
            content: ContentFetcher::new(data, Arc::clone(&cache)),
            templates,
            compiler: Arc::new(TemplateCompiler::storefront()),
            cache,
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, AppError> {
        let store = self.stores.by_domain(&request.domain).await?;

        let page_key = keys::page_key(&store.id, &request.path, query_hash(&request.query));
        if let Some(cached) = self.cache.get(&page_key).and_then(|value| value.as_page()) {
            debug!(store_id = %store.id, path = %request.path, "page cache hit");
            return Ok(RenderedPage {
                html: cached.html.clone(),
                etag: cached.etag.clone(),
                from_cache: true,
            });
        }

        let Some(route) = PageRoute::from_path(&request.path) else {
            return Err(AppError::not_found(format!(
                "no route for path `{}`",
                request.path
            )));
        };

        // Static pages may name their own template, e.g. `page.contact`.
        let template_override = match &route {
            PageRoute::Page(handle) => self
                .content
                .page_by_handle(&store.id, handle)
                .await?
                .and_then(|page| page.template),
            _ => None,
        };
        let page_template = self
            .load_page_template(&store.id, &route, template_override.as_deref())
            .await?;
        let layout = self.load_template(&store.id, LAYOUT_PATH).await?.ok_or_else(|| {
            AppError::data(format!("store `{}` has no layout template", store.id))
        })?;

        let context = tokio::time::timeout(
            self.config.fetch_timeout,
            self.build_context(&store, &route, request, page_template.config()),
        )
        .await
        .map_err(|_| AppError::Deadline(self.config.fetch_timeout))??;

        let page = self.execute(&page_template, &layout, context)?;

        self.cache.set(
            page_key,
            CachedValue::Page(Arc::new(CachedPage {
                html: page.html.clone(),
                etag: page.etag.clone(),
            })),
            self.cache.ttl_for(CacheKind::Page),
        );
        info!(store_id = %store.id, path = %request.path, "page rendered");
        Ok(page)
    }

    /// Cache-first compiled template load for a literal source path.
    async fn load_template(
        &self,
        store_id: &str,
        path: &str,
    ) -> Result<Option<Arc<CompiledTemplate>>, AppError> {
        let key = keys::template_key(store_id, path);
        if let Some(template) = self.cache.get(&key).and_then(|value| value.as_template()) {
            return Ok(Some(template));
        }
        let Some(source) = self.templates.load(store_id, path).await? else {
            return Ok(None);
        };
        let partials = self.templates.partials(store_id).await?;
        let template = Arc::new(self.compiler.compile(&source, &partials)?);
        self.cache.set(
            key,
            CachedValue::Template(Arc::clone(&template)),
            self.cache.ttl_for(CacheKind::Template),
        );
        Ok(Some(template))
    }

    /// Loads the page template for a route. A record-level override name is
    /// tried first; a missing override falls back to the route default.
    async fn load_page_template(
        &self,
        store_id: &str,
        route: &PageRoute,
        name_override: Option<&str>,
    ) -> Result<Arc<CompiledTemplate>, AppError> {
        if let Some(name) = name_override
            && let Some(template) = self.load_named_template(store_id, name).await?
        {
            return Ok(template);
        }
        let name = route.template_name();
        match self.load_named_template(store_id, name).await? {
            Some(template) => Ok(template),
            None => Err(AppError::not_found(format!(
                "store `{store_id}` has no `{name}` template"
            ))),
        }
    }

    /// Resolves a bare template name: a JSON page definition
    /// (`templates/{name}.json`) synthesized into section includes, or a
    /// plain liquid file as fallback.
    async fn load_named_template(
        &self,
        store_id: &str,
        name: &str,
    ) -> Result<Option<Arc<CompiledTemplate>>, AppError> {
        let json_path = format!("templates/{name}.json");
        let key = keys::template_key(store_id, &json_path);
        if let Some(template) = self.cache.get(&key).and_then(|value| value.as_template()) {
            return Ok(Some(template));
        }

        if let Some(raw) = self.templates.load(store_id, &json_path).await? {
            let config: Value = serde_json::from_str(&raw).map_err(|err| {
                AppError::validation(format!("page template `{json_path}` is not valid JSON: {err}"))
            })?;
            let source = synthesize_sections(&config)?;
            let partials = self.templates.partials(store_id).await?;
            let template = Arc::new(
                self.compiler
                    .compile(&source, &partials)?
                    .with_config(config),
            );
            self.cache.set(
                key,
                CachedValue::Template(Arc::clone(&template)),
                self.cache.ttl_for(CacheKind::Template),
            );
            return Ok(Some(template));
        }

        self.load_template(store_id, &format!("templates/{name}.liquid"))
            .await
    }

    async fn build_context(
        &self,
        store: &StoreRecord,
        route: &PageRoute,
        request: &RenderRequest,
        template_config: Option<&Value>,
    ) -> Result<JsonMap, AppError> {
        let limit = self.config.products_per_page;
        let (listing, featured, collections, menus) = tokio::join!(
            self.products.list(&store.id, limit, None),
            self.products.featured(&store.id, self.config.featured_limit),
            self.content.collections(&store.id),
            self.navigation.menus(&store.id),
        );
        // The product listing is required content; the rest degrades to
        // empty defaults when its fetch fails.
        let listing = listing?;
        let featured = featured.unwrap_or_else(|error| {
            warn!(store_id = %store.id, %error, "featured products unavailable");
            Arc::new(ProductPage::default())
        });
        let collections = collections.unwrap_or_else(|error| {
            warn!(store_id = %store.id, %error, "collections unavailable");
            Arc::new(Vec::new())
        });
        let menus = menus.unwrap_or_else(|error| {
            warn!(store_id = %store.id, %error, "navigation unavailable");
            Arc::new(Vec::new())
        });

        let (title, resource) = self.resolve_resource(store, route).await?;
        let page = PageInfo {
            title,
            handle: route_handle(route),
            template: route.template_name().to_string(),
            path: request.path.clone(),
        };
        let current_page = request
            .query
            .get("page")
            .and_then(|page| page.parse().ok())
            .unwrap_or(1);

        let menus: &[ProcessedMenu] = &menus;
        Ok(ContextBuilder::build(
            store,
            &page,
            ContextParams {
                products: &listing.products,
                featured: &featured.products,
                collections: &collections,
                menus,
                template_config: template_config.cloned(),
                cart: None,
                resource,
                current_page,
            },
        ))
    }

    /// The record a detail route is about, plus the page title.
    async fn resolve_resource(
        &self,
        store: &StoreRecord,
        route: &PageRoute,
    ) -> Result<(String, Option<(&'static str, Value)>), AppError> {
        match route {
            PageRoute::Product(handle) => {
                let product = self
                    .products
                    .by_handle(&store.id, handle)
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found(format!("product `{handle}` does not exist"))
                    })?;
                Ok((product.name.clone(), Some(("product", product_view(&product)))))
            }
            PageRoute::Collection(handle) => {
                let collection = self
                    .content
                    .collection_by_handle(&store.id, handle)
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found(format!("collection `{handle}` does not exist"))
                    })?;
                Ok((
                    collection.title.clone(),
                    Some(("collection", collection_view(&collection))),
                ))
            }
            PageRoute::Page(handle) => {
                let page = self
                    .content
                    .page_by_handle(&store.id, handle)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("page `{handle}` does not exist")))?;
                Ok((
                    page.title.clone(),
                    Some(("page_record", serde_json::to_value(&page).unwrap_or(Value::Null))),
                ))
            }
            PageRoute::Cart => Ok(("Cart".to_string(), None)),
            PageRoute::Search => Ok(("Search".to_string(), None)),
            PageRoute::CollectionIndex => Ok(("Collections".to_string(), None)),
            PageRoute::Index => Ok((store.name.clone(), None)),
        }
    }

    /// Page into layout, with captured assets from both injected once.
    fn execute(
        &self,
        page_template: &CompiledTemplate,
        layout: &CompiledTemplate,
        context: JsonMap,
    ) -> Result<RenderedPage, AppError> {
        let inner = self.compiler.render(page_template, context.clone())?;

        let mut layout_context = context;
        layout_context.insert(
            "content_for_layout".to_string(),
            Value::from(inner.html),
        );
        let outer = self.compiler.render(layout, layout_context)?;

        let mut assets = inner.assets;
        assets.extend(outer.assets);
        let html = assets.inject_into(&outer.html);
        let etag = etag_for(&html);
        Ok(RenderedPage {
            html,
            etag,
            from_cache: false,
        })
    }
}

fn route_handle(route: &PageRoute) -> String {
    match route {
        PageRoute::Product(handle) | PageRoute::Collection(handle) | PageRoute::Page(handle) => {
            handle.clone()
        }
        other => other.template_name().to_string(),
    }
}

/// Turns a JSON page definition into section includes, honoring `order` when
/// present.
fn synthesize_sections(config: &Value) -> Result<String, AppError> {
    let sections = config
        .get("sections")
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::validation("page template declares no `sections` object"))?;

    let order: Vec<String> = match config.get("order").and_then(Value::as_array) {
        Some(order) => order
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => sections.keys().cloned().collect(),
    };

    let mut source = String::new();
    for id in order {
        let kind = sections
            .get(&id)
            .and_then(|section| section.get("type"))
            .and_then(Value::as_str)
            .unwrap_or(&id);
        source.push_str(&format!("{{% section '{kind}' %}}\n"));
    }
    Ok(source)
}

fn query_hash(query: &HashMap<String, String>) -> u64 {
    let mut pairs: Vec<_> = query.iter().collect();
    pairs.sort();
    let mut hasher = DefaultHasher::new();
    pairs.hash(&mut hasher);
    hasher.finish()
}

fn etag_for(html: &str) -> String {
    let digest = Sha256::digest(html.as_bytes());
    let hex: String = digest.iter().take(16).map(|byte| format!("{byte:02x}")).collect();
    format!("\"{hex}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_map_to_typed_targets() {
        assert_eq!(PageRoute::from_path("/"), Some(PageRoute::Index));
        assert_eq!(
            PageRoute::from_path("/products/red-shoe"),
            Some(PageRoute::Product("red-shoe".to_string()))
        );
        assert_eq!(
            PageRoute::from_path("/collections"),
            Some(PageRoute::CollectionIndex)
        );
        assert_eq!(
            PageRoute::from_path("/collections/summer"),
            Some(PageRoute::Collection("summer".to_string()))
        );
        assert_eq!(
            PageRoute::from_path("/pages/about"),
            Some(PageRoute::Page("about".to_string()))
        );
        assert_eq!(PageRoute::from_path("/cart"), Some(PageRoute::Cart));
        assert_eq!(PageRoute::from_path("/nope/deep/path"), None);
    }

    #[test]
    fn query_hash_is_order_independent() {
        let mut a = HashMap::new();
        a.insert("page".to_string(), "2".to_string());
        a.insert("sort".to_string(), "price".to_string());
        let mut b = HashMap::new();
        b.insert("sort".to_string(), "price".to_string());
        b.insert("page".to_string(), "2".to_string());
        assert_eq!(query_hash(&a), query_hash(&b));
    }

    #[test]
    fn section_synthesis_honors_order() {
        let config = serde_json::json!({
            "sections": {
                "hero-1": { "type": "hero" },
                "grid-1": { "type": "product-grid" }
            },
            "order": ["grid-1", "hero-1"]
        });
        let source = synthesize_sections(&config).expect("synthesize");
        assert_eq!(
            source,
            "{% section 'product-grid' %}\n{% section 'hero' %}\n"
        );
    }
}
