//! Page-level response cache.
//!
//! Rendered pages and JSON documents are kept in memory for a fixed TTL and served with a
//! strong `ETag`, so browsers that already hold the current version get a `304`.
use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub body: Bytes,
    pub content_type: &'static str,
    pub etag: String,
    stored_at: Instant,
}

impl CachedPage {
    pub fn new(body: impl Into<Bytes>, content_type: &'static str, now: Instant) -> Self {
        let body = body.into();
        let etag = format!("\"{:x}\"", Sha256::digest(&body));

        Self {
            body,
            content_type,
            etag,
            stored_at: now,
        }
    }

    /// Answers `304 Not Modified` when the request already carries this page's `ETag`.
    pub fn respond(&self, request: &HttpRequest, max_age: Duration) -> HttpResponse {
        let cache_control = format!("public, max-age={}", max_age.as_secs());

        if self.matches(request) {
            return HttpResponse::NotModified()
                .insert_header((header::ETAG, self.etag.clone()))
                .insert_header((header::CACHE_CONTROL, cache_control))
                .finish();
        }

        HttpResponse::Ok()
            .content_type(self.content_type)
            .insert_header((header::ETAG, self.etag.clone()))
            .insert_header((header::CACHE_CONTROL, cache_control))
            .body(self.body.clone())
    }

    fn matches(&self, request: &HttpRequest) -> bool {
        request
            .headers()
            .get(header::IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    // weak comparison: proxies may hand back our tag as W/"..."
                    .map(|candidate| candidate.strip_prefix("W/").unwrap_or(candidate))
                    .any(|candidate| candidate == "*" || candidate == self.etag)
            })
            .unwrap_or(false)
    }
}

pub const HTML: &str = "text/html; charset=utf-8";
pub const JSON: &str = "application/json";
pub const XML: &str = "application/xml; charset=utf-8";
pub const RSS: &str = "application/rss+xml; charset=utf-8";

pub struct ResponseCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    pages: HashMap<String, CachedPage>,
    // bumped by every invalidation, renders that overlap one are not stored
    generation: u64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str, now: Instant) -> Option<CachedPage> {
        let mut state = self.lock();
        let is_fresh = state
            .pages
            .get(key)
            .map(|page| now.saturating_duration_since(page.stored_at) < self.ttl)?;

        if is_fresh {
            state.pages.get(key).cloned()
        } else {
            state.pages.remove(key);
            None
        }
    }

    pub fn insert(&self, key: &str, page: CachedPage) -> CachedPage {
        self.lock().pages.insert(key.to_string(), page.clone());

        page
    }

    /// Returns the cached page for `key`, rendering and storing it on a miss.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        key: &str,
        content_type: &'static str,
        render: F,
    ) -> Result<CachedPage, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String, E>>,
    {
        let now = Instant::now();

        if let Some(page) = self.get(key, now) {
            tracing::debug!(key, "Response cache hit");
            return Ok(page);
        }

        let generation = self.lock().generation;
        let page = CachedPage::new(render().await?, content_type, now);
        let mut state = self.lock();

        // An invalidation landed while rendering, the page may already be stale
        if state.generation == generation {
            state.pages.insert(key.to_string(), page.clone());
        }

        Ok(page)
    }

    pub fn invalidate(&self, key: &str) {
        let mut state = self.lock();

        state.pages.remove(key);
        state.generation += 1;
    }

    pub fn clear(&self) {
        let mut state = self.lock();

        state.pages.clear();
        state.generation += 1;
    }
}
