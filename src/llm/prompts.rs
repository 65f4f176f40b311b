// ABOUTME: Fixed prompt templates for extraction, categorization, and the assistant
// ABOUTME: Holds the closed category set used for spending classification

/// The closed set of spending categories
pub const CATEGORIES: [&str; 10] = [
    "Software",
    "Cloud Services",
    "Office Supplies",
    "Utilities",
    "Marketing",
    "Professional Services",
    "Hardware",
    "Travel",
    "Food & Beverages",
    "Other",
];

/// Fallback category when classification fails or returns garbage
pub const FALLBACK_CATEGORY: &str = "Other";

/// Vision extraction prompt demanding a JSON-only reply
pub const EXTRACTION_PROMPT: &str = "You are an expert invoice data extraction system. Analyze this invoice image/document and extract ALL relevant information in a structured JSON format.

Extract the following information:
- vendor_name: The company/vendor name
- invoice_number: Invoice or reference number
- invoice_date: Date of invoice (YYYY-MM-DD format)
- due_date: Payment due date (YYYY-MM-DD format)
- total_amount: Total amount due (number only)
- tax_amount: Tax amount (number only)
- subtotal: Subtotal before tax (number only)
- currency: Currency code (e.g., USD, EUR, GBP)
- line_items: Array of items with description, quantity, unit_price, total_price
- category: Best category for this invoice (Software, Utilities, Office Supplies, Cloud Services, etc.)
- payment_method: If mentioned (Credit Card, Bank Transfer, etc.)
- notes: Any additional important information

Respond ONLY with valid JSON. Do not include any markdown formatting or explanations.";

/// Build the categorization prompt for a vendor and its item descriptions
#[must_use]
pub fn categorize_prompt(vendor: &str, items: &[String]) -> String {
    let items_json = serde_json::to_string(items).unwrap_or_else(|_| "[]".into());
    let category_list = CATEGORIES
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the vendor name \"{vendor}\" and items: {items_json}, \
categorize this invoice into ONE of these categories:\n{category_list}\n\n\
Respond with only the category name, nothing else."
    )
}

/// Build the assistant system prompt around the user's invoice context
#[must_use]
pub fn assistant_system_prompt(invoice_context: &serde_json::Value) -> String {
    let context = serde_json::to_string_pretty(invoice_context)
        .unwrap_or_else(|_| invoice_context.to_string());

    format!(
        "You are an AI financial assistant helping users understand their invoice data. \n\n\
You have access to the following invoice information:\n{context}\n\n\
Provide clear, concise answers about spending patterns, tax information, vendor analysis, and financial insights.\n\
When mentioning amounts, always include the currency symbol.\n\
Be helpful and friendly, but professional."
    )
}

/// Normalize a model classification reply to a canonical category.
///
/// Matching is case-insensitive; anything outside the closed set maps to
/// the fallback.
#[must_use]
pub fn normalize_category(reply: &str) -> &'static str {
    let cleaned = reply.trim().trim_matches(['"', '.', '\'']);
    CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(cleaned))
        .copied()
        .unwrap_or(FALLBACK_CATEGORY)
}
