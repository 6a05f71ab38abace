//! Imgfolio core: pure state machine and view-model helpers.
mod effect;
mod msg;
mod selection;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use selection::Selection;
pub use state::{
    parse_page_url, AppState, DownloadResultKind, FetchResultKind, PdfSummary, RequestId,
    UserError,
};
pub use update::update;
pub use view_model::{AppViewModel, GalleryRowView, SelectedRowView};
