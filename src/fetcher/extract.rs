use anyhow::{Context, Result, anyhow};
use phf::phf_set;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::core::models::{ExtractedContent, LinkInfo};
use crate::utils::text::{collapse_whitespace, truncate_chars, word_count};

/// 这些标签里的文本不算可见文本
static SKIPPED_TAGS: phf::Set<&'static str> = phf_set! {
    "script",
    "style",
    "noscript",
    "template",
};

const SKIPPED_LINK_PREFIXES: [&str; 4] = ["#", "javascript:", "mailto:", "tel:"];

#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    pub max_text_chars: usize,
    pub require_link_text: bool,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("选择器解析失败: {}", e))
}

/// 从页面 HTML 中提取标题、可见文本和链接
pub fn extract_content(html: &str, page_url: &str, limits: &ExtractLimits) -> Result<ExtractedContent> {
    let base = Url::parse(page_url).with_context(|| format!("页面地址无法解析: {}", page_url))?;
    let document = Html::parse_document(html);

    let title = extract_title(&document)?;
    let full_text = collapse_whitespace(&visible_text(&document)?);
    let links = extract_links(&document, &base, limits.require_link_text)?;

    Ok(ExtractedContent {
        url: page_url.to_string(),
        title,
        word_count: word_count(&full_text),
        text: truncate_chars(&full_text, limits.max_text_chars),
        links,
        loaded: true,
    })
}

fn extract_title(document: &Html) -> Result<String> {
    for css in ["title", "h1"] {
        let sel = selector(css)?;
        if let Some(el) = document.select(&sel).next() {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                return Ok(text);
            }
        }
    }
    Ok(String::new())
}

fn visible_text(document: &Html) -> Result<String> {
    let body = selector("body")?;
    let root: ElementRef = document
        .select(&body)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_TAGS.contains(el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    Ok(out)
}

fn extract_links(document: &Html, base: &Url, require_text: bool) -> Result<Vec<LinkInfo>> {
    let anchors = selector("a[href]")?;
    let mut links = Vec::new();

    for el in document.select(&anchors) {
        let href = el.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            continue;
        }
        let lower = href.to_ascii_lowercase();
        if SKIPPED_LINK_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            continue;
        }

        let text = collapse_whitespace(&el.text().collect::<String>());
        if require_text && text.is_empty() {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);

        links.push(LinkInfo {
            href: resolved.to_string(),
            text,
        });
    }
    Ok(links)
}
