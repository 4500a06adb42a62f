use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use std::convert::Infallible;

use crate::{
    cache::{ResponseCache, HTML, RSS, XML},
    content::{
        countdown::Countdown,
        feed::render_feed,
        pages::{render_page, Page, PageContext},
        sitemap::render_sitemap,
    },
    startup::{ApplicationBaseUrl, SiteContent},
};

#[tracing::instrument(name = "Countdown handler", skip(content))]
pub async fn countdown(content: web::Data<SiteContent>) -> impl Responder {
    HttpResponse::Ok().json(Countdown::until(content.site.launch_date, Utc::now()))
}

#[tracing::instrument(name = "Timeline handler", skip(content))]
pub async fn timeline(content: web::Data<SiteContent>) -> impl Responder {
    HttpResponse::Ok().json(content.timeline.announcements())
}

#[tracing::instrument(name = "RSS feed handler", skip(request, content, base_url, cache))]
pub async fn rss_feed(
    request: HttpRequest,
    content: web::Data<SiteContent>,
    base_url: web::Data<ApplicationBaseUrl>,
    cache: web::Data<ResponseCache>,
) -> HttpResponse {
    cached(&request, &cache, "/rss.xml", RSS, || {
        render_feed(&content.site, &base_url.0, &content.timeline, Utc::now())
    })
    .await
}

#[tracing::instrument(name = "Sitemap handler", skip(request, content, base_url, cache))]
pub async fn sitemap(
    request: HttpRequest,
    content: web::Data<SiteContent>,
    base_url: web::Data<ApplicationBaseUrl>,
    cache: web::Data<ResponseCache>,
) -> HttpResponse {
    cached(&request, &cache, "/sitemap.xml", XML, || {
        render_sitemap(&base_url.0, &content.timeline)
    })
    .await
}

pub async fn home_page(
    request: HttpRequest,
    content: web::Data<SiteContent>,
    base_url: web::Data<ApplicationBaseUrl>,
    cache: web::Data<ResponseCache>,
) -> HttpResponse {
    site_page(Page::Home, request, content, base_url, cache).await
}

pub async fn timeline_page(
    request: HttpRequest,
    content: web::Data<SiteContent>,
    base_url: web::Data<ApplicationBaseUrl>,
    cache: web::Data<ResponseCache>,
) -> HttpResponse {
    site_page(Page::Timeline, request, content, base_url, cache).await
}

pub async fn newsletter_page(
    request: HttpRequest,
    content: web::Data<SiteContent>,
    base_url: web::Data<ApplicationBaseUrl>,
    cache: web::Data<ResponseCache>,
) -> HttpResponse {
    site_page(Page::Newsletter, request, content, base_url, cache).await
}

pub async fn about_page(
    request: HttpRequest,
    content: web::Data<SiteContent>,
    base_url: web::Data<ApplicationBaseUrl>,
    cache: web::Data<ResponseCache>,
) -> HttpResponse {
    site_page(Page::About, request, content, base_url, cache).await
}

#[tracing::instrument(name = "Marketing page handler", skip(request, content, base_url, cache))]
async fn site_page(
    page: Page,
    request: HttpRequest,
    content: web::Data<SiteContent>,
    base_url: web::Data<ApplicationBaseUrl>,
    cache: web::Data<ResponseCache>,
) -> HttpResponse {
    cached(&request, &cache, page.path(), HTML, || {
        render_page(
            page,
            &PageContext {
                site: &content.site,
                base_url: &base_url.0,
                timeline: &content.timeline,
                now: Utc::now(),
            },
        )
    })
    .await
}

async fn cached<F>(
    request: &HttpRequest,
    cache: &ResponseCache,
    key: &str,
    content_type: &'static str,
    render: F,
) -> HttpResponse
where
    F: FnOnce() -> String,
{
    let page = cache
        .get_or_render(key, content_type, move || async move {
            Ok::<_, Infallible>(render())
        })
        .await;

    match page {
        Ok(page) => page.respond(request, cache.ttl()),
        Err(never) => match never {},
    }
}
