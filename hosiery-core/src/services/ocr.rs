use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{LedgerError, LedgerResult};

/// Which form the extracted fields will pre-fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Sale,
    Return,
    Purchase,
}

impl FromStr for DocumentKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(DocumentKind::Sale),
            "return" => Ok(DocumentKind::Return),
            "purchase" => Ok(DocumentKind::Purchase),
            other => Err(LedgerError::validation(format!("unknown document kind {}", other))),
        }
    }
}

/// Fields read off a sale or return invoice. All optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoicePrefill {
    pub numero_factura: Option<String>,
    pub referencia_producto: Option<String>,
    pub nombre_cliente: Option<String>,
    pub cedula_cliente: Option<String>,
    pub total: Option<Decimal>,
    pub cantidad_pares: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLinePrefill {
    pub referencia: Option<String>,
    pub cantidad: Option<i32>,
    pub precio_unitario: Option<Decimal>,
}

/// Fields read off a supplier invoice. All optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchasePrefill {
    pub proveedor: Option<String>,
    pub productos: Vec<PurchaseLinePrefill>,
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prefill {
    Invoice(InvoicePrefill),
    Purchase(PurchasePrefill),
}

impl Prefill {
    pub fn empty(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Sale | DocumentKind::Return => Prefill::Invoice(InvoicePrefill::default()),
            DocumentKind::Purchase => Prefill::Purchase(PurchasePrefill::default()),
        }
    }

    /// Reads whatever fields are present; wrong types become `None`.
    pub fn from_value(kind: DocumentKind, data: &Value) -> Self {
        match kind {
            DocumentKind::Sale | DocumentKind::Return => Prefill::Invoice(InvoicePrefill {
                numero_factura: text(data, "numero_factura"),
                referencia_producto: text(data, "referencia_producto"),
                nombre_cliente: text(data, "nombre_cliente"),
                cedula_cliente: text(data, "cedula_cliente"),
                total: decimal(data, "total"),
                cantidad_pares: integer(data, "cantidad_pares"),
            }),
            DocumentKind::Purchase => Prefill::Purchase(PurchasePrefill {
                proveedor: text(data, "proveedor"),
                productos: data
                    .get("productos")
                    .and_then(|v| v.as_array())
                    .map(|lines| {
                        lines
                            .iter()
                            .map(|line| PurchaseLinePrefill {
                                referencia: text(line, "referencia"),
                                cantidad: integer(line, "cantidad"),
                                precio_unitario: decimal(line, "precio_unitario"),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                total: decimal(data, "total"),
            }),
        }
    }
}

fn text(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decimal(data: &Value, key: &str) -> Option<Decimal> {
    match data.get(key)? {
        Value::String(s) => parse_amount(s),
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        _ => None,
    }
}

/// Parses a printed amount. Peso amounts use `.` for thousands and `,`
/// for decimals ("$175.000,50"); plain "18000.50" is also accepted.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        let mut groups = cleaned.split('.');
        let head = groups.next().unwrap_or_default();
        let tail: Vec<&str> = groups.collect();
        if !tail.is_empty() && !head.is_empty() && tail.iter().all(|g| g.len() == 3) {
            cleaned.replace('.', "")
        } else {
            cleaned
        }
    };
    Decimal::from_str_exact(&normalized).ok()
}

fn integer(data: &Value, key: &str) -> Option<i32> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64().and_then(|i| i32::try_from(i).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extracts the JSON object from a raw model answer, tolerating code fences
/// and surrounding prose.
pub fn parse_payload(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<Value>(&raw[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    document_type: DocumentKind,
    url: &'a str,
}

/// Client for the OCR extraction endpoint.
#[derive(Debug, Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OcrClient {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub async fn extract(&self, kind: DocumentKind, url: &str) -> LedgerResult<Value> {
        let mut request = self.http.post(&self.endpoint).json(&ExtractionRequest { document_type: kind, url });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LedgerError::Remote(format!("ocr request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(LedgerError::Remote(format!("ocr returned status {}", response.status())));
        }
        let raw = response
            .text()
            .await
            .map_err(|e| LedgerError::Remote(format!("ocr body unreadable: {}", e)))?;

        parse_payload(&raw).ok_or_else(|| LedgerError::Remote("ocr answer contained no JSON object".to_string()))
    }
}

/// Best-effort pre-fill: any OCR failure is logged and yields an empty
/// form instead of blocking the operator.
pub async fn prefill_document(ocr: Option<&OcrClient>, kind: DocumentKind, url: &str) -> Prefill {
    let Some(ocr) = ocr else {
        info!("OCR disabled; returning empty pre-fill");
        return Prefill::empty(kind);
    };

    match ocr.extract(kind, url).await {
        Ok(data) => Prefill::from_value(kind, &data),
        Err(e) => {
            warn!("OCR extraction degraded for {}: {}", url, e);
            Prefill::empty(kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn invoice_fields_tolerate_mixed_types() {
        let data = json!({
            "numero_factura": 1001,
            "referencia_producto": " 74113 ",
            "nombre_cliente": "",
            "total": "$175.000",
            "cantidad_pares": "5"
        });
        let Prefill::Invoice(prefill) = Prefill::from_value(DocumentKind::Sale, &data) else {
            panic!("expected invoice pre-fill");
        };
        assert_eq!(prefill.numero_factura.as_deref(), Some("1001"));
        assert_eq!(prefill.referencia_producto.as_deref(), Some("74113"));
        assert_eq!(prefill.nombre_cliente, None);
        assert_eq!(prefill.total, Some(dec!(175000)));
        assert_eq!(prefill.cantidad_pares, Some(5));
        assert_eq!(prefill.cedula_cliente, None);
    }

    #[test]
    fn peso_amounts_use_dot_thousands() {
        assert_eq!(parse_amount("$175.000"), Some(dec!(175000)));
        assert_eq!(parse_amount("1.234.567"), Some(dec!(1234567)));
        assert_eq!(parse_amount("175.000,50"), Some(dec!(175000.50)));
        assert_eq!(parse_amount("18000.5"), Some(dec!(18000.5)));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn purchase_lines_are_read_individually() {
        let data = json!({
            "proveedor": "Medias Andinas",
            "productos": [
                {"referencia": "74113", "cantidad": 12, "precio_unitario": 18000},
                {"referencia": "74120", "cantidad": "seis"}
            ]
        });
        let Prefill::Purchase(prefill) = Prefill::from_value(DocumentKind::Purchase, &data) else {
            panic!("expected purchase pre-fill");
        };
        assert_eq!(prefill.productos.len(), 2);
        assert_eq!(prefill.productos[0].cantidad, Some(12));
        assert_eq!(prefill.productos[0].precio_unitario, Some(dec!(18000)));
        assert_eq!(prefill.productos[1].cantidad, None);
        assert_eq!(prefill.total, None);
    }

    #[test]
    fn payload_extracted_from_fenced_answer() {
        let raw = "```json\n{\"numero_factura\": \"F-9\"}\n```";
        assert_eq!(parse_payload(raw), Some(json!({"numero_factura": "F-9"})));
        assert_eq!(parse_payload("no json here"), None);
        assert_eq!(parse_payload("} {"), None);
    }

    #[tokio::test]
    async fn disabled_ocr_yields_empty_prefill() {
        let prefill = prefill_document(None, DocumentKind::Return, "https://cdn.example/x.jpg").await;
        assert_eq!(prefill, Prefill::Invoice(InvoicePrefill::default()));
    }

    #[tokio::test]
    async fn unreachable_ocr_degrades_to_empty_prefill() {
        let client = OcrClient::new(&OcrConfig {
            endpoint: "http://127.0.0.1:9/extract".to_string(),
            api_key: None,
        });
        let prefill = prefill_document(Some(&client), DocumentKind::Purchase, "https://cdn.example/x.pdf").await;
        assert_eq!(prefill, Prefill::Purchase(PurchasePrefill::default()));
    }
}
