use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::{error, info};

use crate::config::StorageConfig;
use crate::error::{LedgerError, LedgerResult};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// What an uploaded file documents; decides its folder and accepted types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    SaleInvoice,
    PaymentProof,
    ReturnNote,
    OriginalInvoice,
    PurchaseDocument,
    ExpenseDocument,
    PickupPhoto,
}

impl UploadKind {
    pub fn folder(self) -> &'static str {
        match self {
            UploadKind::SaleInvoice => "facturas",
            UploadKind::PaymentProof => "comprobantes",
            UploadKind::ReturnNote => "devoluciones",
            UploadKind::OriginalInvoice => "facturas-originales",
            UploadKind::PurchaseDocument => "compras",
            UploadKind::ExpenseDocument => "gastos",
            UploadKind::PickupPhoto => "recogidas",
        }
    }

    /// PDFs are only accepted for supplier and expense paperwork.
    pub fn accepts_pdf(self) -> bool {
        matches!(self, UploadKind::PurchaseDocument | UploadKind::ExpenseDocument)
    }
}

impl FromStr for UploadKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale-invoice" => Ok(UploadKind::SaleInvoice),
            "payment-proof" => Ok(UploadKind::PaymentProof),
            "return-note" => Ok(UploadKind::ReturnNote),
            "original-invoice" => Ok(UploadKind::OriginalInvoice),
            "purchase-document" => Ok(UploadKind::PurchaseDocument),
            "expense-document" => Ok(UploadKind::ExpenseDocument),
            "pickup-photo" => Ok(UploadKind::PickupPhoto),
            other => Err(LedgerError::validation(format!("unknown upload kind {}", other))),
        }
    }
}

/// Size and content-type checks done before anything leaves the server.
pub fn validate_upload(kind: UploadKind, content_type: &str, len: usize) -> LedgerResult<()> {
    if len == 0 {
        return Err(LedgerError::validation("empty file"));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(LedgerError::validation(format!(
            "file too large: {} bytes (max {})",
            len, MAX_UPLOAD_BYTES
        )));
    }
    let content_type = content_type.to_ascii_lowercase();
    let allowed = content_type.starts_with("image/") || (kind.accepts_pdf() && content_type == "application/pdf");
    if !allowed {
        return Err(LedgerError::validation(format!(
            "unsupported file type {} for {}",
            content_type,
            kind.folder()
        )));
    }
    Ok(())
}

/// Timestamped object key, e.g. `facturas/1760700000000_f1001.jpg`.
pub fn object_name(kind: UploadKind, original_filename: Option<&str>, now: DateTime<Utc>) -> String {
    let cleaned: String = original_filename
        .unwrap_or("archivo")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    let cleaned = if cleaned.is_empty() { "archivo" } else { cleaned };
    format!("{}/{}_{}", kind.folder(), now.timestamp_millis(), cleaned)
}

/// Client for the hosted object storage REST API.
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, name)
    }

    /// Uploads `bytes` under `name` and returns the public URL to store
    /// on the record.
    pub async fn upload(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> LedgerResult<String> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, name);
        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!("Storage upload of {} failed: {}", name, e);
            LedgerError::Remote(format!("upload failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Storage rejected {} with {}: {}", name, status, body);
            return Err(LedgerError::Remote(format!("upload rejected with status {}", status)));
        }

        info!("Uploaded {} to bucket {}", name, self.bucket);
        Ok(self.public_url(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn images_accepted_everywhere_pdf_only_for_documents() {
        assert!(validate_upload(UploadKind::SaleInvoice, "image/jpeg", 1024).is_ok());
        assert!(validate_upload(UploadKind::SaleInvoice, "application/pdf", 1024).is_err());
        assert!(validate_upload(UploadKind::PurchaseDocument, "application/pdf", 1024).is_ok());
        assert!(validate_upload(UploadKind::ExpenseDocument, "APPLICATION/PDF", 1024).is_ok());
        assert!(validate_upload(UploadKind::PickupPhoto, "text/plain", 10).is_err());
    }

    #[test]
    fn size_limit_is_five_megabytes() {
        assert!(validate_upload(UploadKind::ReturnNote, "image/png", MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_upload(UploadKind::ReturnNote, "image/png", MAX_UPLOAD_BYTES + 1).is_err());
        assert!(validate_upload(UploadKind::ReturnNote, "image/png", 0).is_err());
    }

    #[test]
    fn object_names_are_timestamped_and_sanitized() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 15, 0, 0).unwrap();
        let name = object_name(UploadKind::SaleInvoice, Some("Factura 1001.JPG"), now);
        assert_eq!(name, format!("facturas/{}_factura_1001.jpg", now.timestamp_millis()));
        let unnamed = object_name(UploadKind::PickupPhoto, None, now);
        assert!(unnamed.ends_with("_archivo"));
    }

    #[test]
    fn upload_kind_parses_route_segment() {
        assert_eq!("purchase-document".parse::<UploadKind>().unwrap(), UploadKind::PurchaseDocument);
        assert!("selfie".parse::<UploadKind>().is_err());
    }

    #[test]
    fn public_url_uses_bucket() {
        let client = StorageClient::new(&StorageConfig {
            base_url: "https://store.example/storage/v1/".to_string(),
            bucket: "comprobantes".to_string(),
            api_key: None,
        });
        assert_eq!(
            client.public_url("facturas/1_a.jpg"),
            "https://store.example/storage/v1/object/public/comprobantes/facturas/1_a.jpg"
        );
    }
}
