#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the URL input.
    InputChanged(String),
    /// User submitted the current URL input.
    FetchSubmitted,
    /// Engine finished fetching a page and extracting its images.
    FetchDone {
        request_id: crate::RequestId,
        result: crate::FetchResultKind,
    },
    /// User clicked an image in the gallery.
    ImageToggled(String),
    /// User toggled an image by its 1-based gallery position.
    ImageToggledAt(usize),
    SelectAll,
    ClearSelection,
    /// User asked for the selected images as a PDF.
    DownloadClicked,
    /// Engine finished building and saving the PDF.
    DownloadDone {
        request_id: crate::RequestId,
        result: crate::DownloadResultKind,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}
