use imgfolio_core::{DownloadResultKind, Effect, FetchResultKind, Msg, PdfSummary};
use imgfolio_engine::{EngineConfig, EngineError, EngineEvent, EngineHandle, JobProgress};
use imgfolio_logging::{folio_debug, folio_info, folio_warn};

/// What a poll of the engine produced.
#[derive(Debug)]
pub enum Polled {
    Msg(Msg),
    Progress(JobProgress),
}

/// Turns effects into engine commands and engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        folio_debug!("Starting engine with {:?}", config);
        Ok(Self {
            engine: EngineHandle::new(config)?,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchPage { request_id, url } => {
                    folio_info!("FetchPage request_id={} url={}", request_id, url);
                    self.engine.fetch_page(request_id, url);
                }
                Effect::BuildPdf { request_id, images } => {
                    folio_info!("BuildPdf request_id={} pages={}", request_id, images.len());
                    self.engine.build_pdf(request_id, images);
                }
            }
        }
    }

    /// Drains every event the engine has produced so far.
    pub fn poll(&self) -> Vec<Polled> {
        std::iter::from_fn(|| self.engine.try_recv())
            .map(translate)
            .collect()
    }
}

fn translate(event: EngineEvent) -> Polled {
    match event {
        EngineEvent::Progress(progress) => Polled::Progress(progress),
        EngineEvent::PageFetched { request_id, result } => Polled::Msg(Msg::FetchDone {
            request_id,
            result: match result {
                Ok(page) => FetchResultKind::Images(page.images),
                Err(err) => {
                    folio_warn!("Fetch {} failed: {}", request_id, err);
                    FetchResultKind::Failed
                }
            },
        }),
        EngineEvent::PdfSaved { request_id, result } => Polled::Msg(Msg::DownloadDone {
            request_id,
            result: match result {
                Ok(saved) => DownloadResultKind::Saved(PdfSummary {
                    path: saved.path.display().to_string(),
                    page_count: saved.page_count,
                    byte_len: saved.byte_len,
                }),
                Err(err) => {
                    folio_warn!("Pdf {} failed: {}", request_id, err);
                    DownloadResultKind::Failed
                }
            },
        }),
    }
}
