//! OCR abstraction for receipt ingestion (spec §6's `UploadReceipt`).
//!
//! Dyn-compatible by construction, mirroring
//! `twitchbot_service::platform::PlatformClient`, so `UploadReceiptHandler`
//! can hold `Arc<dyn OcrEngine>` and be tested against a deterministic
//! stub instead of a real OCR service.

use composable_rust_core::error::Result;
use std::future::Future;
use std::pin::Pin;

/// One line item as read off a receipt by an OCR engine, before it is
/// persisted as a [`crate::model::ReceiptItem`].
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLineItem {
    /// Free-text item name.
    pub item_name: String,
    /// Quantity purchased.
    pub quantity: i64,
    /// Unit price.
    pub unit_price: f64,
    /// Total price for this line.
    pub total_price: f64,
    /// Article number, if the receipt carries one.
    pub article_number: Option<String>,
}

/// Extracts line items from a scanned receipt image.
pub trait OcrEngine: Send + Sync {
    /// Run OCR against `image_bytes` (named `filename` for logging) and
    /// return the line items found, plus the raw text the engine read.
    ///
    /// # Errors
    ///
    /// Returns [`composable_rust_core::error::CoreError::Internal`] if the
    /// engine cannot process the image at all (a garbled or unreadable
    /// receipt, rather than a merely empty one, which instead returns an
    /// empty `Vec`).
    fn extract_items<'a>(
        &'a self,
        image_bytes: &'a [u8],
        filename: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<OcrLineItem>, Option<String>)>> + Send + 'a>>;
}

/// Deterministic OCR stand-in (spec §8 scenario 4: "the OCR stub produces
/// one item...").
///
/// Treats `image_bytes` as UTF-8 text, one line item per non-empty line.
/// Each line may be a bare item name (quantity defaults to 1, prices to
/// `0.0`) or semicolon-delimited `name;quantity;unit_price[;article_number]`.
/// A production implementation would replace this with a call to a real
/// OCR service behind the same [`OcrEngine`] port.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubOcrEngine;

impl OcrEngine for StubOcrEngine {
    fn extract_items<'a>(
        &'a self,
        image_bytes: &'a [u8],
        _filename: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<OcrLineItem>, Option<String>)>> + Send + 'a>> {
        Box::pin(async move {
            let text = String::from_utf8_lossy(image_bytes).to_string();
            let items = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(parse_stub_line)
                .collect();
            let ocr_text = if text.trim().is_empty() { None } else { Some(text) };
            Ok((items, ocr_text))
        })
    }
}

fn parse_stub_line(line: &str) -> OcrLineItem {
    let mut fields = line.split(';').map(str::trim);
    let item_name = fields.next().unwrap_or(line).to_string();
    let quantity = fields.next().and_then(|f| f.parse().ok()).unwrap_or(1);
    let unit_price = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0.0);
    let article_number = fields.next().filter(|f| !f.is_empty()).map(ToString::to_string);

    #[allow(clippy::cast_precision_loss)]
    let total_price = unit_price * quantity as f64;

    OcrLineItem {
        item_name,
        quantity,
        unit_price,
        total_price,
        article_number,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[tokio::test]
    async fn bare_line_produces_single_item_with_default_quantity() {
        let stub = StubOcrEngine;
        let (items, text) = stub.extract_items(b"Coca Cola 0.33L", "receipt.jpg").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_name, "Coca Cola 0.33L");
        assert_eq!(items[0].quantity, 1);
        assert_eq!(text.as_deref(), Some("Coca Cola 0.33L"));
    }

    #[tokio::test]
    async fn semicolon_fields_override_defaults() {
        let stub = StubOcrEngine;
        let (items, _) = stub.extract_items(b"Coca Cola 0.33L;6;1.5;ART-1", "r.jpg").await.unwrap();
        assert_eq!(items[0].quantity, 6);
        assert!((items[0].unit_price - 1.5).abs() < f64::EPSILON);
        assert!((items[0].total_price - 9.0).abs() < f64::EPSILON);
        assert_eq!(items[0].article_number.as_deref(), Some("ART-1"));
    }

    #[tokio::test]
    async fn multiple_lines_produce_multiple_items() {
        let stub = StubOcrEngine;
        let (items, _) = stub.extract_items(b"Coca Cola 0.33L\nChips 200g", "r.jpg").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn empty_image_produces_no_items() {
        let stub = StubOcrEngine;
        let (items, text) = stub.extract_items(b"", "r.jpg").await.unwrap();
        assert!(items.is_empty());
        assert!(text.is_none());
    }
}
