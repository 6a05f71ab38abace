use crate::PdfSummary;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub input: String,
    pub page_url: Option<String>,
    pub gallery: Vec<GalleryRowView>,
    pub selected: Vec<SelectedRowView>,
    pub loading: bool,
    pub downloading: bool,
    pub error_message: Option<String>,
    pub last_pdf: Option<PdfSummary>,
    pub can_download: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRowView {
    /// 1-based position in the gallery.
    pub index: usize,
    pub url: String,
    /// 1-based position in the selection, if selected.
    pub selection_number: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRowView {
    pub number: usize,
    pub url: String,
}
