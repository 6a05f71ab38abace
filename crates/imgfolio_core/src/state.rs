use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::selection::Selection;
use crate::view_model::{AppViewModel, GalleryRowView, SelectedRowView};

pub type RequestId = u64;

/// The one message a user sees for each kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserError {
    InvalidUrl,
    FetchFailed,
    NoImagesFound,
    DownloadFailed,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserError::InvalidUrl => write!(f, "Please enter a valid http(s) URL."),
            UserError::FetchFailed => write!(f, "Failed to fetch images."),
            UserError::NoImagesFound => write!(f, "No images were found on that page."),
            UserError::DownloadFailed => write!(f, "Failed to create the PDF."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResultKind {
    Images(Vec<String>),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResultKind {
    Saved(PdfSummary),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfSummary {
    pub path: String,
    pub page_count: usize,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    page_url: Option<String>,
    images: Vec<String>,
    selection: Selection,
    loading: bool,
    downloading: bool,
    error: Option<UserError>,
    last_pdf: Option<PdfSummary>,
    next_request_id: RequestId,
    pending_fetch: Option<RequestId>,
    pending_download: Option<RequestId>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let gallery = self
            .images
            .iter()
            .enumerate()
            .map(|(i, url)| GalleryRowView {
                index: i + 1,
                url: url.clone(),
                selection_number: self.selection.number_of(url),
            })
            .collect();
        let selected = self
            .selection
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, url)| SelectedRowView {
                number: i + 1,
                url: url.clone(),
            })
            .collect();

        AppViewModel {
            input: self.input.clone(),
            page_url: self.page_url.clone(),
            gallery,
            selected,
            loading: self.loading,
            downloading: self.downloading,
            error_message: self.error.map(|e| e.to_string()),
            last_pdf: self.last_pdf.clone(),
            can_download: !self.selection.is_empty() && !self.downloading,
            dirty: self.dirty,
        }
    }

    /// Returns whether the view changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn error(&self) -> Option<UserError> {
        self.error
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input(&mut self, text: String) {
        if self.input != text {
            self.input = text;
            self.mark_dirty();
        }
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn set_error(&mut self, error: UserError) {
        self.error = Some(error);
        self.mark_dirty();
    }

    /// Resets gallery, selection and error for a new page and returns the
    /// id the engine result must carry.
    pub(crate) fn begin_fetch(&mut self, url: String) -> RequestId {
        let id = self.allocate_request_id();
        self.loading = true;
        self.error = None;
        self.images.clear();
        self.selection.clear();
        self.page_url = Some(url);
        self.pending_fetch = Some(id);
        self.mark_dirty();
        id
    }

    /// Applies a fetch result. Returns `false` when the result is stale.
    pub(crate) fn finish_fetch(&mut self, request_id: RequestId, result: FetchResultKind) -> bool {
        if self.pending_fetch != Some(request_id) {
            return false;
        }
        self.pending_fetch = None;
        self.loading = false;
        match result {
            FetchResultKind::Images(urls) => {
                let unique = first_occurrences(&urls);
                if unique.is_empty() {
                    self.error = Some(UserError::NoImagesFound);
                }
                self.images = unique;
            }
            FetchResultKind::Failed => {
                self.error = Some(UserError::FetchFailed);
            }
        }
        self.mark_dirty();
        true
    }

    pub(crate) fn toggle_image(&mut self, url: &str) -> bool {
        if !self.images.iter().any(|u| u == url) {
            return false;
        }
        self.selection.toggle(url);
        self.mark_dirty();
        true
    }

    pub(crate) fn image_at(&self, index: usize) -> Option<String> {
        index
            .checked_sub(1)
            .and_then(|i| self.images.get(i))
            .cloned()
    }

    pub(crate) fn select_all(&mut self) {
        let mut changed = false;
        for url in &self.images {
            changed |= self.selection.insert(url);
        }
        if changed {
            self.mark_dirty();
        }
    }

    pub(crate) fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.mark_dirty();
        }
    }

    pub(crate) fn begin_download(&mut self) -> (RequestId, Vec<String>) {
        let id = self.allocate_request_id();
        self.downloading = true;
        self.error = None;
        self.pending_download = Some(id);
        self.mark_dirty();
        (id, self.selection.to_vec())
    }

    pub(crate) fn finish_download(
        &mut self,
        request_id: RequestId,
        result: DownloadResultKind,
    ) -> bool {
        if self.pending_download != Some(request_id) {
            return false;
        }
        self.pending_download = None;
        self.downloading = false;
        match result {
            DownloadResultKind::Saved(summary) => self.last_pdf = Some(summary),
            DownloadResultKind::Failed => self.error = Some(UserError::DownloadFailed),
        }
        self.mark_dirty();
        true
    }

    fn allocate_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        self.next_request_id
    }
}

/// Keeps each URL once, at its first position.
fn first_occurrences(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.iter()
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

/// Parses user input into an absolute http(s) URL.
pub fn parse_page_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = Url::parse(trimmed).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{first_occurrences, parse_page_url};

    #[test]
    fn repeated_urls_keep_first_position() {
        let urls: Vec<String> = ["b", "a", "b", "c", "a"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(first_occurrences(&urls), vec!["b", "a", "c"]);
    }

    #[test]
    fn large_galleries_with_many_repeats() {
        let urls: Vec<String> = (0..20_000)
            .map(|i| format!("https://x.test/{}.png", i % 5_000))
            .collect();
        let unique = first_occurrences(&urls);
        assert_eq!(unique.len(), 5_000);
        assert_eq!(unique[0], "https://x.test/0.png");
        assert_eq!(unique[4_999], "https://x.test/4999.png");
    }

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            parse_page_url("  https://example.com/gallery "),
            Some("https://example.com/gallery".to_string())
        );
        assert_eq!(
            parse_page_url("http://example.com"),
            Some("http://example.com/".to_string())
        );
    }

    #[test]
    fn rejects_other_input() {
        assert_eq!(parse_page_url(""), None);
        assert_eq!(parse_page_url("example.com"), None);
        assert_eq!(parse_page_url("ftp://example.com/a"), None);
        assert_eq!(parse_page_url("javascript:alert(1)"), None);
    }
}
