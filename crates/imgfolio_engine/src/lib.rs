//! Imgfolio engine: page fetching, image extraction and PDF assembly.
mod decode;
mod engine;
mod extract;
mod fetch;
mod format;
mod pdf;
mod persist;
mod raster;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use engine::{EngineConfig, EngineHandle, Pipeline, DEFAULT_PDF_NAME};
pub use extract::ImageExtractor;
pub use fetch::{
    proxied_url, ChannelProgressSink, FetchSettings, Fetcher, NullProgressSink, ProgressSink,
    ReqwestFetcher, DEFAULT_CORS_PROXY,
};
pub use format::ImageFormat;
pub use pdf::{
    build_pdf, PagePlacement, PdfAssembler, PdfDocument, PdfError, PdfLayout, PdfOptions,
    IMAGE_RESOURCE,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use raster::{
    rasterize, HttpImageSource, ImageLoadSettings, ImageSource, RasterData, RasterError,
    RasterImage,
};
pub use types::{
    EngineError, EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, JobProgress,
    PageImages, RequestId, SavedPdf, Stage,
};
