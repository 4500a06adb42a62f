use chrono::{DateTime, Utc};

use super::escape_xml;
use super::timeline::{Announcement, Timeline};
use crate::config::SiteSettings;

/// Link of an announcement: its external link when it has one, its timeline anchor otherwise.
pub fn announcement_url(base_url: &str, announcement: &Announcement) -> String {
    announcement
        .link
        .clone()
        .unwrap_or_else(|| timeline_anchor(base_url, announcement))
}

fn timeline_anchor(base_url: &str, announcement: &Announcement) -> String {
    format!("{}/timeline#{}", base_url, announcement.slug)
}

/// Renders the timeline as an RSS 2.0 document.
pub fn render_feed(
    site: &SiteSettings,
    base_url: &str,
    timeline: &Timeline,
    now: DateTime<Utc>,
) -> String {
    let last_build = timeline.latest_update().unwrap_or(now);
    let mut xml = String::new();

    xml.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
<channel>
<title>{title}</title>
<link>{base_url}/</link>
<description>{description}</description>
<language>en</language>
<lastBuildDate>{last_build}</lastBuildDate>
<atom:link href="{base_url}/rss.xml" rel="self" type="application/rss+xml"/>
"#,
        title = escape_xml(&site.title),
        base_url = escape_xml(base_url),
        description = escape_xml(&site.description),
        last_build = last_build.to_rfc2822(),
    ));

    for announcement in timeline.announcements() {
        xml.push_str(&format!(
            r#"<item>
<title>{title}</title>
<link>{link}</link>
<guid isPermaLink="true">{guid}</guid>
<pubDate>{published}</pubDate>
<description>{summary}</description>
</item>
"#,
            title = escape_xml(&announcement.title),
            link = escape_xml(&announcement_url(base_url, announcement)),
            guid = escape_xml(&timeline_anchor(base_url, announcement)),
            published = announcement.published_at.to_rfc2822(),
            summary = escape_xml(&announcement.summary),
        ));
    }

    xml.push_str("</channel>\n</rss>\n");

    xml
}
