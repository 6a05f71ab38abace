use crate::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPage { request_id: RequestId, url: String },
    BuildPdf { request_id: RequestId, images: Vec<String> },
}
