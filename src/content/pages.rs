use chrono::{DateTime, SecondsFormat, Utc};

use super::countdown::Countdown;
use super::escape_xml;
use super::feed::announcement_url;
use super::timeline::{Announcement, Timeline};
use crate::config::SiteSettings;

const HOME_ANNOUNCEMENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Timeline,
    Newsletter,
    About,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Home, Page::Timeline, Page::Newsletter, Page::About];

    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Timeline => "/timeline",
            Page::Newsletter => "/newsletter",
            Page::About => "/about",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "Countdown",
            Page::Timeline => "Timeline",
            Page::Newsletter => "Newsletter",
            Page::About => "About",
        }
    }

    pub fn shows_announcements(&self) -> bool {
        matches!(self, Page::Home | Page::Timeline)
    }

    pub fn change_frequency(&self) -> &'static str {
        match self {
            Page::Home | Page::Timeline => "daily",
            Page::Newsletter | Page::About => "monthly",
        }
    }

    pub fn priority(&self) -> &'static str {
        match self {
            Page::Home => "1.0",
            Page::Timeline => "0.8",
            Page::Newsletter => "0.6",
            Page::About => "0.4",
        }
    }
}

/// Everything a page needs to be rendered.
pub struct PageContext<'a> {
    pub site: &'a SiteSettings,
    pub base_url: &'a str,
    pub timeline: &'a Timeline,
    pub now: DateTime<Utc>,
}

pub fn render_page(page: Page, context: &PageContext<'_>) -> String {
    let main = match page {
        Page::Home => home(context),
        Page::Timeline => timeline(context),
        Page::Newsletter => newsletter(),
        Page::About => about(context.site),
    };

    layout(page, context, &main)
}

fn layout(page: Page, context: &PageContext<'_>, main: &str) -> String {
    let mut nav = String::new();

    for link in Page::ALL {
        let current = if link == page {
            r#" aria-current="page""#
        } else {
            ""
        };
        nav.push_str(&format!(
            r#"<a href="{}"{}>{}</a>"#,
            link.path(),
            current,
            link.title()
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{page_title} | {site_title}</title>
<meta name="description" content="{description}">
<link rel="canonical" href="{base_url}{path}">
<link rel="alternate" type="application/rss+xml" title="{site_title}" href="/rss.xml">
</head>
<body>
<header><nav>{nav}</nav></header>
<main>
{main}
</main>
<footer><a href="/rss.xml">RSS</a> · <a href="/sitemap.xml">Sitemap</a> · Fan made, not affiliated with the publisher.</footer>
</body>
</html>
"#,
        page_title = page.title(),
        site_title = escape_xml(&context.site.title),
        description = escape_xml(&context.site.description),
        base_url = escape_xml(context.base_url),
        path = page.path(),
        nav = nav,
        main = main,
    )
}

fn home(context: &PageContext<'_>) -> String {
    let countdown = Countdown::until(context.site.launch_date, context.now);
    let launch = context
        .site
        .launch_date
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut html = format!(
        r#"<h1>{title}</h1>
<section id="countdown" data-launch="{launch}">
<p><span data-unit="days">{days}</span> days <span data-unit="hours">{hours}</span> hours <span data-unit="minutes">{minutes}</span> minutes <span data-unit="seconds">{seconds}</span> seconds</p>
</section>
<script>
(function () {{
  var section = document.getElementById("countdown");
  var launch = Date.parse(section.dataset.launch);
  var units = {{ days: 86400, hours: 3600, minutes: 60, seconds: 1 }};
  var limits = {{ days: Infinity, hours: 24, minutes: 60, seconds: 60 }};
  setInterval(function () {{
    var left = Math.max(0, Math.floor((launch - Date.now()) / 1000));
    Object.keys(units).forEach(function (unit) {{
      section.querySelector('[data-unit="' + unit + '"]').textContent =
        Math.floor(left / units[unit]) % limits[unit];
    }});
  }}, 1000);
}})();
</script>
"#,
        title = escape_xml(&context.site.title),
        launch = launch,
        days = countdown.remaining.days,
        hours = countdown.remaining.hours,
        minutes = countdown.remaining.minutes,
        seconds = countdown.remaining.seconds,
    );

    html.push_str("<section><h2>Latest news</h2>\n");
    for announcement in context
        .timeline
        .announcements()
        .iter()
        .take(HOME_ANNOUNCEMENTS)
    {
        html.push_str(&announcement_summary(context.base_url, announcement));
    }
    html.push_str(
        r#"<p><a href="/timeline">Full timeline</a> · <a href="/newsletter">Get the newsletter</a></p>
</section>"#,
    );

    html
}

fn announcement_summary(base_url: &str, announcement: &Announcement) -> String {
    format!(
        r#"<article><h3><a href="{link}">{title}</a></h3><time datetime="{date}">{day}</time><p>{summary}</p></article>
"#,
        link = escape_xml(&announcement_url(base_url, announcement)),
        title = escape_xml(&announcement.title),
        date = announcement
            .published_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        day = announcement.published_at.format("%B %-d, %Y"),
        summary = escape_xml(&announcement.summary),
    )
}

fn timeline(context: &PageContext<'_>) -> String {
    let mut html = String::from("<h1>Timeline</h1>\n<ol class=\"timeline\">\n");

    for announcement in context.timeline.announcements() {
        html.push_str(&format!(
            r#"<li id="{slug}"><time datetime="{date}">{day}</time><h2>{title}</h2><p>{body}</p>"#,
            slug = escape_xml(&announcement.slug),
            date = announcement
                .published_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            day = announcement.published_at.format("%B %-d, %Y"),
            title = escape_xml(&announcement.title),
            body = escape_xml(&announcement.body),
        ));
        if let Some(link) = &announcement.link {
            html.push_str(&format!(
                r#"<p><a href="{}">Source</a></p>"#,
                escape_xml(link)
            ));
        }
        html.push_str("</li>\n");
    }

    html.push_str("</ol>");

    html
}

fn newsletter() -> String {
    String::from(
        r#"<h1>Newsletter</h1>
<p>Get an email when there is news, and one more on launch day. Nothing else.</p>
<form id="newsletter">
<label for="email">Email</label>
<input id="email" name="email" type="email" required autocomplete="email">
<button type="submit">Subscribe</button>
<p id="newsletter-status" role="status"></p>
</form>
<script>
document.getElementById("newsletter").addEventListener("submit", function (event) {
  event.preventDefault();
  var status = document.getElementById("newsletter-status");
  fetch("/api/subscribe", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ email: document.getElementById("email").value, source: "newsletter-page" })
  }).then(function (response) {
    return response.json().then(function (body) {
      status.textContent = response.ok ? body.message : body.error.message;
    });
  }).catch(function () {
    status.textContent = "Something went wrong, please try again.";
  });
});
</script>"#,
    )
}

fn about(site: &SiteSettings) -> String {
    format!(
        r#"<h1>About</h1>
<p>{description}</p>
<p>This is a fan project. Announcements are collected from official channels and linked to their source.
Subscriber emails are only used to send the newsletter and every email has an unsubscribe link.</p>"#,
        description = escape_xml(&site.description),
    )
}
