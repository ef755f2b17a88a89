pub mod ocr;
pub mod storage;

pub use ocr::{prefill_document, DocumentKind, OcrClient, Prefill};
pub use storage::{StorageClient, UploadKind};
