use scraper::{Html, Selector};
use url::Url;

const DEFAULT_MAX_IMAGES: usize = 5_000;

/// Collects `<img>` sources from an HTML document as absolute URLs.
///
/// Sources appear in document order. Relative references are joined against
/// `<base href>` when the page declares one, otherwise against the page URL.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    max_images: usize,
}

impl ImageExtractor {
    pub fn new() -> Self {
        Self::with_max_images(DEFAULT_MAX_IMAGES)
    }

    pub fn with_max_images(max_images: usize) -> Self {
        Self { max_images }
    }

    pub fn extract(&self, html: &str, page_url: Option<&str>) -> Vec<String> {
        let document = Html::parse_document(html);
        let page_url = page_url.and_then(|u| Url::parse(u).ok());
        let base = document_base(&document, page_url.as_ref()).or(page_url);

        let Ok(img_sel) = Selector::parse("img") else {
            return Vec::new();
        };

        document
            .select(&img_sel)
            .filter_map(|img| img.value().attr("src"))
            .filter_map(|src| resolve_src(src, base.as_ref()))
            .take(self.max_images)
            .collect()
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn document_base(document: &Html, page_url: Option<&Url>) -> Option<Url> {
    let base_sel = Selector::parse("base[href]").ok()?;
    let href = document.select(&base_sel).next()?.value().attr("href")?.trim();
    match page_url {
        Some(page) => page.join(href).ok(),
        None => Url::parse(href).ok(),
    }
}

fn resolve_src(reference: &str, base: Option<&Url>) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") {
        return None;
    }
    if lower.starts_with("data:") {
        return Some(trimmed.to_string());
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url.into());
    }
    base.and_then(|base| base.join(trimmed).ok()).map(Into::into)
}
