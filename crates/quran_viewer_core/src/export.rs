//! crates/quran_viewer_core/src/export.rs
//!
//! Print and share conveniences for the current page.

use crate::domain::PageContent;
use crate::index::clamp_page;

/// Renders the page as a standalone, right-to-left HTML document.
pub fn printable_document(page: &PageContent) -> String {
    let verses: String = page
        .units()
        .iter()
        .map(|unit| {
            format!(
                "      <div class=\"verse\">\n        <span class=\"verse-text\">{}</span>\n        <span class=\"verse-number\">({})</span>\n      </div>\n",
                escape_html(&unit.text),
                unit.key
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html dir="rtl">
  <head>
    <meta charset="utf-8">
    <title>مصحف - صفحة {page}</title>
    <style>
      body {{ display: flex; flex-direction: column; align-items: center; font-family: 'Traditional Arabic', 'Scheherazade', serif; direction: rtl; padding: 20px; }}
      .page-header {{ margin-bottom: 20px; text-align: center; }}
      .quran-text {{ font-size: 24px; line-height: 2; text-align: center; max-width: 800px; margin: 0 auto; }}
      .verse {{ margin-bottom: 10px; }}
      .verse-number {{ font-size: 14px; color: #666; margin-right: 5px; }}
    </style>
  </head>
  <body>
    <div class="page-header">
      <h1>صفحة {page} من المصحف الشريف</h1>
      <p>{name}</p>
    </div>
    <div class="quran-text">
{verses}    </div>
  </body>
</html>
"#,
        page = page.page_number(),
        name = escape_html(&page.structural_info().major_division_name),
        verses = verses,
    )
}

/// Deep link to a page: `{base}?page={n}`.
pub fn share_link(base_url: &str, page: u16) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", base_url, separator, page)
}

/// Reads the page back out of a deep link, clamped to the valid range.
pub fn page_from_share_link(link: &str) -> Option<u16> {
    let (_, query) = link.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == "page")
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .map(clamp_page)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
