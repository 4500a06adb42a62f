use chrono::{DateTime, SecondsFormat, Utc};

use super::escape_xml;
use super::pages::Page;
use super::timeline::Timeline;

/// Renders a sitemap 0.9 document listing the marketing pages.
///
/// Pages that show announcements take the date of the latest one as `lastmod`.
pub fn render_sitemap(base_url: &str, timeline: &Timeline) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for page in Page::ALL {
        let last_modified: Option<DateTime<Utc>> = if page.shows_announcements() {
            timeline.latest_update()
        } else {
            None
        };

        xml.push_str(&format!(
            "<url>\n<loc>{}{}</loc>\n",
            escape_xml(base_url),
            page.path()
        ));
        if let Some(last_modified) = last_modified {
            xml.push_str(&format!(
                "<lastmod>{}</lastmod>\n",
                last_modified.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        xml.push_str(&format!(
            "<changefreq>{}</changefreq>\n<priority>{}</priority>\n</url>\n",
            page.change_frequency(),
            page.priority()
        ));
    }

    xml.push_str("</urlset>\n");

    xml
}
