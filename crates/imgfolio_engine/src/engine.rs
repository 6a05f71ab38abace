use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use imgfolio_logging::{folio_error, folio_info, folio_warn};

use crate::decode::decode_html;
use crate::extract::ImageExtractor;
use crate::fetch::{ChannelProgressSink, FetchSettings, Fetcher, ProgressSink, ReqwestFetcher};
use crate::pdf::{build_pdf, PdfError, PdfOptions};
use crate::persist::AtomicFileWriter;
use crate::raster::{HttpImageSource, ImageLoadSettings, ImageSource};
use crate::{
    EngineError, EngineEvent, FailureKind, FetchError, JobProgress, PageImages, RequestId,
    SavedPdf, Stage,
};

pub const DEFAULT_PDF_NAME: &str = "images.pdf";

#[derive(Clone)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub images: ImageLoadSettings,
    pub pdf: PdfOptions,
    pub output_dir: PathBuf,
    pub file_name: String,
    pub max_images: usize,
    /// Produces the PDF creation date; injectable for deterministic output.
    pub creation_date: Arc<dyn Fn() -> String + Send + Sync>,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            fetch: FetchSettings::default(),
            images: ImageLoadSettings::default(),
            pdf: PdfOptions::default(),
            output_dir,
            file_name: DEFAULT_PDF_NAME.to_string(),
            max_images: 5_000,
            creation_date: Arc::new(|| {
                format!("D:{}Z", chrono::Utc::now().format("%Y%m%d%H%M%S"))
            }),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("fetch", &self.fetch)
            .field("images", &self.images)
            .field("pdf", &self.pdf)
            .field("output_dir", &self.output_dir)
            .field("file_name", &self.file_name)
            .field("max_images", &self.max_images)
            .finish_non_exhaustive()
    }
}

enum EngineCommand {
    FetchPage { request_id: RequestId, url: String },
    BuildPdf { request_id: RequestId, images: Vec<String> },
}

impl EngineCommand {
    /// The result event reported when the job never finishes on its own.
    fn lost(&self, reason: &str) -> EngineEvent {
        match self {
            EngineCommand::FetchPage { request_id, .. } => EngineEvent::PageFetched {
                request_id: *request_id,
                result: Err(FetchError::new(FailureKind::Internal, reason)),
            },
            EngineCommand::BuildPdf { request_id, .. } => EngineEvent::PdfSaved {
                request_id: *request_id,
                result: Err(PdfError::Internal(reason.to_string())),
            },
        }
    }
}

/// Runs page fetches and PDF builds on a worker thread with its own runtime.
///
/// Every command yields exactly one `PageFetched` or `PdfSaved` event, also
/// when the job panics or the worker is gone.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_pipeline(Pipeline::new(config)?)
    }

    pub fn with_pipeline(pipeline: Pipeline) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Runtime::new()?;
        let pipeline = Arc::new(pipeline);
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (event_tx, event_rx) = mpsc::channel();
        let worker_tx = event_tx.clone();

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let lost = command.lost("job panicked");
                let pipeline = pipeline.clone();
                let event_tx = worker_tx.clone();
                let sink = ChannelProgressSink::new(worker_tx.clone());
                let job = runtime.spawn(async move { pipeline.handle(command, &sink).await });
                runtime.spawn(async move {
                    let event = match job.await {
                        Ok(event) => event,
                        Err(err) => {
                            folio_error!("Engine job failed: {}", err);
                            lost
                        }
                    };
                    let _ = event_tx.send(event);
                });
            }
        });

        Ok(Self {
            cmd_tx,
            event_tx,
            event_rx,
        })
    }

    pub fn fetch_page(&self, request_id: RequestId, url: impl Into<String>) {
        self.submit(EngineCommand::FetchPage {
            request_id,
            url: url.into(),
        });
    }

    pub fn build_pdf(&self, request_id: RequestId, images: Vec<String>) {
        self.submit(EngineCommand::BuildPdf { request_id, images });
    }

    fn submit(&self, command: EngineCommand) {
        if let Err(mpsc::SendError(command)) = self.cmd_tx.send(command) {
            folio_error!("Engine worker is gone");
            let _ = self.event_tx.send(command.lost("engine worker stopped"));
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

/// The fetch and PDF steps with their collaborators, independent of threads.
pub struct Pipeline {
    fetcher: Box<dyn Fetcher>,
    images: Box<dyn ImageSource>,
    extractor: ImageExtractor,
    config: EngineConfig,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let fetcher = ReqwestFetcher::new(config.fetch.clone());
        let images = HttpImageSource::new(config.fetch.clone(), config.images.clone())
            .map_err(|err| EngineError::Setup(err.to_string()))?;
        Ok(Self::with_parts(config, Box::new(fetcher), Box::new(images)))
    }

    pub fn with_parts(
        config: EngineConfig,
        fetcher: Box<dyn Fetcher>,
        images: Box<dyn ImageSource>,
    ) -> Self {
        Self {
            fetcher,
            images,
            extractor: ImageExtractor::with_max_images(config.max_images),
            config,
        }
    }

    async fn handle(&self, command: EngineCommand, sink: &dyn ProgressSink) -> EngineEvent {
        match command {
            EngineCommand::FetchPage { request_id, url } => EngineEvent::PageFetched {
                request_id,
                result: self.fetch_images(request_id, &url, sink).await,
            },
            EngineCommand::BuildPdf { request_id, images } => EngineEvent::PdfSaved {
                request_id,
                result: self.save_pdf(request_id, &images, sink).await,
            },
        }
    }

    /// Fetches `url` (through the proxy when configured) and lists its images.
    pub async fn fetch_images(
        &self,
        request_id: RequestId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<PageImages, FetchError> {
        sink.emit(progress(request_id, Stage::Queued));
        let output = self.fetcher.fetch(request_id, url, sink).await.inspect_err(|err| {
            folio_warn!("Fetching {} failed: {}", url, err);
        })?;
        folio_info!(
            "Fetched {} via {} ({} bytes, {} redirects)",
            url,
            output.metadata.request_url,
            output.metadata.byte_len,
            output.metadata.redirect_count
        );

        sink.emit(progress(request_id, Stage::Extracting));
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        // Relative sources resolve against the page itself, never the proxy.
        // A direct request knows where redirects ended up; a proxied one only
        // knows the proxy's address.
        let page_url = if output.metadata.request_url == output.metadata.original_url {
            output.metadata.final_url.as_str()
        } else {
            url
        };
        let images = self.extractor.extract(&decoded.html, Some(page_url));
        folio_info!("Found {} images on {}", images.len(), page_url);

        sink.emit(progress(request_id, Stage::Done));
        Ok(PageImages {
            page_url: page_url.to_string(),
            encoding_label: decoded.encoding_label,
            images,
        })
    }

    /// Builds the PDF for `images` in order and writes it to the output dir.
    pub async fn save_pdf(
        &self,
        request_id: RequestId,
        images: &[String],
        sink: &dyn ProgressSink,
    ) -> Result<SavedPdf, PdfError> {
        let mut options = self.config.pdf.clone();
        options.creation_date = Some((self.config.creation_date)());

        let document = build_pdf(self.images.as_ref(), images, &options, request_id, sink)
            .await
            .inspect_err(|err| folio_warn!("Building pdf failed: {}", err))?;

        sink.emit(progress(request_id, Stage::Writing));
        let writer = AtomicFileWriter::new(self.config.output_dir.clone());
        let path = writer
            .write_bytes(&self.config.file_name, &document.bytes)
            .map_err(|err| {
                folio_error!("Saving pdf failed: {}", err);
                PdfError::Persist(err.to_string())
            })?;
        folio_info!("Saved {} pages to {:?}", document.page_count, path);

        sink.emit(progress(request_id, Stage::Done));
        Ok(SavedPdf {
            path,
            page_count: document.page_count,
            byte_len: document.bytes.len() as u64,
        })
    }
}

fn progress(request_id: RequestId, stage: Stage) -> EngineEvent {
    EngineEvent::Progress(JobProgress {
        request_id,
        stage,
        bytes: None,
    })
}
