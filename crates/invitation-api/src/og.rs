//! Link preview image shown when the invitation is shared in a chat app.
//!
//! Rendered as SVG: the main photo on the left half under a light dark
//! overlay, the title, date and venue on a cream panel on the right.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use invitation_types::config::WeddingConfig;

use crate::state::AppState;

pub const OG_WIDTH: u32 = 1200;
pub const OG_HEIGHT: u32 = 630;

const PANEL_BACKGROUND: &str = "#f8f6f0";
const OVERLAY: &str = "rgba(0,0,0,0.2)";
const TITLE_LINE_CHARS: usize = 18;
const TITLE_MAX_LINES: usize = 3;

/// GET /api/og
pub async fn preview(State(state): State<AppState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        render_preview(&state.site),
    )
}

pub fn render_preview(site: &WeddingConfig) -> String {
    let half = OG_WIDTH / 2;
    let text_x = half + 60;
    let image = absolute_url(&site.meta.site_url, &site.main.image);

    let mut title = String::new();
    let lines = wrap(&site.meta.title, TITLE_LINE_CHARS, TITLE_MAX_LINES);
    for (i, line) in lines.iter().enumerate() {
        title.push_str(&format!(
            r#"<tspan x="{text_x}" dy="{}">{}</tspan>"#,
            if i == 0 { 0 } else { 56 },
            escape(line)
        ));
    }
    let details_y = 230 + 56 * lines.len() as u32;

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
<rect width="{w}" height="{h}" fill="{bg}"/>
<image href="{image}" xlink:href="{image}" x="0" y="0" width="{half}" height="{h}" preserveAspectRatio="xMidYMid slice"/>
<rect x="0" y="0" width="{half}" height="{h}" fill="{overlay}"/>
<text x="{text_x}" y="220" font-family="serif" font-size="48" fill="#333333">{title}</text>
<text x="{text_x}" y="{details_y}" font-family="sans-serif" font-size="30" fill="#666666">{date}</text>
<text x="{text_x}" y="{venue_y}" font-family="sans-serif" font-size="30" fill="#666666">{venue}</text>
</svg>"##,
        w = OG_WIDTH,
        h = OG_HEIGHT,
        bg = PANEL_BACKGROUND,
        overlay = OVERLAY,
        image = escape(&image),
        date = escape(&site.date.display_date),
        venue = escape(&site.venue.name),
        venue_y = details_y + 48,
    )
}

/// Preview scrapers need absolute image URLs.
fn absolute_url(site_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || site_url.is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        site_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Greedy word wrap by character count. Overlong output is cut with an ellipsis.
fn wrap(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push('…');
        }
    }
    lines
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
