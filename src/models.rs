// ABOUTME: Core domain models for users, invoices, line items, and chat history
// ABOUTME: Includes the typed extraction payload schema with lenient defaulting rules

//! Domain models for the Invoice Insights API.
//!
//! The AI extraction reply is dynamically shaped JSON; [`ExtractedInvoice`]
//! gives it an explicit schema with defaulting rules for every field. The
//! only hard requirement is `total_amount`; everything else degrades to a
//! zero or an absent value instead of failing extraction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A registered user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,
    /// User email (unique)
    pub email: String,
    /// Bcrypt password hash (never serialized to clients)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Optional display name
    pub full_name: Option<String>,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh ID and current timestamps
    #[must_use]
    pub fn new(email: String, password_hash: String, full_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            full_name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One uploaded document's extracted financial record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique invoice ID
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Vendor name
    pub vendor_name: String,
    /// Invoice or reference number
    pub invoice_number: Option<String>,
    /// Date of the invoice
    pub invoice_date: Option<NaiveDate>,
    /// Payment due date
    pub due_date: Option<NaiveDate>,
    /// Total amount due
    pub total_amount: f64,
    /// Tax amount (0 when absent from the document)
    pub tax_amount: f64,
    /// Subtotal before tax
    pub subtotal: Option<f64>,
    /// ISO currency code
    pub currency: String,
    /// Spending category (AI-assigned or user-overridden)
    pub category: Option<String>,
    /// Processing status (free text, "pending" by default)
    pub status: String,
    /// Retrievable URL for the stored file
    pub file_url: Option<String>,
    /// MIME type of the uploaded file
    pub file_type: Option<String>,
    /// Object storage key of the uploaded file
    pub storage_key: Option<String>,
    /// Raw extraction payload, stored verbatim
    pub metadata: Option<serde_json::Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Itemized charges belonging to this invoice
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// One itemized charge within an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique line item ID
    pub id: Uuid,
    /// Owning invoice
    pub invoice_id: Uuid,
    /// Item description
    pub description: String,
    /// Quantity (1 when absent)
    pub quantity: f64,
    /// Price per unit
    pub unit_price: Option<f64>,
    /// Total price for the line
    pub total_price: f64,
    /// Item-level category (may differ from the invoice category)
    pub category: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One turn in a user's conversation with the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
    /// Optional structured metadata
    pub metadata: Option<serde_json::Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Extraction payload schema
// ============================================================================

/// Structured invoice data extracted by the vision model.
///
/// Every field tolerates the model's formatting quirks: amounts may arrive
/// as JSON numbers or numeric strings (with currency symbols), dates as
/// `YYYY-MM-DD` strings or garbage, and any field may be null or missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    /// Vendor or company name
    #[serde(default, deserialize_with = "lenient_string")]
    pub vendor_name: Option<String>,
    /// Invoice or reference number
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_number: Option<String>,
    /// Invoice date
    #[serde(default, deserialize_with = "lenient_date")]
    pub invoice_date: Option<NaiveDate>,
    /// Payment due date
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    /// Total amount due (the only required field; see [`Self::validate`])
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: Option<f64>,
    /// Tax amount
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax_amount: Option<f64>,
    /// Subtotal before tax
    #[serde(default, deserialize_with = "lenient_amount")]
    pub subtotal: Option<f64>,
    /// Currency code
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
    /// Itemized charges
    #[serde(default)]
    pub line_items: Option<Vec<ExtractedLineItem>>,
    /// Spending category, when the model assigned one
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    /// Payment method, when mentioned in the document
    #[serde(default, deserialize_with = "lenient_string")]
    pub payment_method: Option<String>,
    /// Any additional notes the model produced
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
}

impl ExtractedInvoice {
    /// Vendor name with the "Unknown" fallback applied
    #[must_use]
    pub fn vendor(&self) -> &str {
        self.vendor_name.as_deref().unwrap_or("Unknown")
    }

    /// Currency code, defaulting to USD
    #[must_use]
    pub fn currency_or_default(&self) -> &str {
        match self.currency.as_deref() {
            Some(code) if !code.trim().is_empty() => code,
            _ => "USD",
        }
    }

    /// Tax amount, defaulting to zero
    #[must_use]
    pub fn tax(&self) -> f64 {
        self.tax_amount.unwrap_or(0.0)
    }

    /// Line items, defaulting to an empty list
    #[must_use]
    pub fn items(&self) -> &[ExtractedLineItem] {
        self.line_items.as_deref().unwrap_or_default()
    }

    /// Check the payload invariant: `total_amount` must be present.
    ///
    /// Returns the total on success so callers can use it directly.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionFailed` when the total is absent.
    pub fn validate(&self) -> crate::errors::AppResult<f64> {
        self.total_amount.ok_or_else(|| {
            crate::errors::AppError::extraction("extraction payload is missing total_amount")
        })
    }
}

/// One extracted line item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedLineItem {
    /// Item description (required)
    pub description: String,
    /// Quantity, defaulting to 1
    #[serde(default, deserialize_with = "lenient_amount")]
    pub quantity: Option<f64>,
    /// Price per unit
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: Option<f64>,
    /// Total price for the line
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_price: Option<f64>,
    /// Item-level category
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
}

impl ExtractedLineItem {
    /// Quantity with the default of 1 applied
    #[must_use]
    pub fn quantity_or_one(&self) -> f64 {
        self.quantity.unwrap_or(1.0)
    }

    /// Total price, defaulting to zero when the model omitted it
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total_price.unwrap_or(0.0)
    }
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(amount_from_value(&value))
}

fn amount_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            // Tolerate currency symbols and thousands separators: "$1,200.50"
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::String(s) = value else {
        return Ok(None);
    };
    // Accept YYYY-MM-DD, including datetime strings with a date prefix.
    // The prefix slice must respect char boundaries; the model sometimes
    // returns localized dates.
    let candidate = s.trim();
    let candidate = candidate.get(..10).unwrap_or(candidate);
    Ok(NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracted_invoice_defaults() {
        let payload = json!({
            "vendor_name": "Acme",
            "total_amount": 120.0
        });
        let extracted: ExtractedInvoice = serde_json::from_value(payload).unwrap();
        assert_eq!(extracted.vendor(), "Acme");
        assert_eq!(extracted.validate().unwrap(), 120.0);
        assert_eq!(extracted.tax(), 0.0);
        assert_eq!(extracted.currency_or_default(), "USD");
        assert!(extracted.items().is_empty());
        assert!(extracted.category.is_none());
    }

    #[test]
    fn test_amounts_accept_numeric_strings() {
        let payload = json!({
            "vendor_name": "Acme",
            "total_amount": "$1,200.50",
            "tax_amount": "20.00"
        });
        let extracted: ExtractedInvoice = serde_json::from_value(payload).unwrap();
        assert_eq!(extracted.validate().unwrap(), 1200.50);
        assert_eq!(extracted.tax(), 20.0);
    }

    #[test]
    fn test_missing_total_fails_validation() {
        let payload = json!({ "vendor_name": "Acme" });
        let extracted: ExtractedInvoice = serde_json::from_value(payload).unwrap();
        assert!(extracted.validate().is_err());
    }

    #[test]
    fn test_dates_tolerate_garbage() {
        let payload = json!({
            "total_amount": 10,
            "invoice_date": "2024-03-15",
            "due_date": "sometime next month"
        });
        let extracted: ExtractedInvoice = serde_json::from_value(payload).unwrap();
        assert_eq!(
            extracted.invoice_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert!(extracted.due_date.is_none());
    }

    #[test]
    fn test_localized_date_string_becomes_none() {
        let payload = json!({
            "total_amount": 10,
            "invoice_date": "2024年03月15日"
        });
        let extracted: ExtractedInvoice = serde_json::from_value(payload).unwrap();
        assert!(extracted.invoice_date.is_none());
    }

    #[test]
    fn test_datetime_string_uses_date_prefix() {
        let payload = json!({
            "total_amount": 10,
            "invoice_date": "2024-03-15T00:00:00Z"
        });
        let extracted: ExtractedInvoice = serde_json::from_value(payload).unwrap();
        assert_eq!(
            extracted.invoice_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn test_line_item_defaults() {
        let payload = json!({
            "total_amount": 100,
            "line_items": [
                { "description": "Widget", "quantity": 2, "unit_price": 50, "total_price": 100 },
                { "description": "Shipping" }
            ]
        });
        let extracted: ExtractedInvoice = serde_json::from_value(payload).unwrap();
        let items = extracted.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity_or_one(), 2.0);
        assert_eq!(items[0].total(), 100.0);
        assert_eq!(items[1].quantity_or_one(), 1.0);
        assert_eq!(items[1].total(), 0.0);
        assert!(items[1].unit_price.is_none());
    }
}
