//! The only boundary between raw model text and the quote domain.

use quickquote_core::domain::extraction::ExtractedQuote;
use quickquote_core::domain::quote::{coerce_number, LineItem};
use quickquote_core::errors::ExtractionError;
use serde_json::Value;

const CLIENT_NAME_KEYS: &[&str] = &["clientName"];
const JOB_ADDRESS_KEYS: &[&str] = &["jobAddress", "clientAddress"];
const SCOPE_SUMMARY_KEYS: &[&str] = &["scopeSummary", "scopeOfWork"];

/// Turns one model response into a vetted extraction.
///
/// Fences are stripped, the text between the first `{` and the last `}` is
/// parsed, and every field is coerced into shape. Item ids are reassigned by
/// position. A response with no parseable object fails with
/// [`ExtractionError::MalformedResponse`] carrying the raw text.
pub fn sanitize(raw: &str) -> Result<ExtractedQuote, ExtractionError> {
    let unfenced = strip_fences(raw);
    let malformed = || ExtractionError::MalformedResponse { raw: raw.to_string() };

    let body = json_object_slice(&unfenced).ok_or_else(malformed)?;
    let value = serde_json::from_str::<Value>(body).map_err(|_| malformed())?;

    Ok(ExtractedQuote {
        client_name: first_text(&value, CLIENT_NAME_KEYS),
        job_address: first_text(&value, JOB_ADDRESS_KEYS),
        scope_summary: first_text(&value, SCOPE_SUMMARY_KEYS),
        items: normalize_items(value.get("items")),
    })
}

pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "")
}

/// First `{` through last `}`, inclusive.
pub fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn normalize_items(items: Option<&Value>) -> Vec<LineItem> {
    let Some(items) = items.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| LineItem {
            id: u32::try_from(index + 1).unwrap_or(u32::MAX),
            description: coerce_text(&item["description"]),
            qty: coerce_number(&item["qty"]),
            price: coerce_number(&item["price"]),
        })
        .collect()
}

/// First alias carrying non-empty text; empty when none does.
fn first_text(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| coerce_text(&value[*key]))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use quickquote_core::errors::ExtractionError;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::{json_object_slice, sanitize};

    fn resanitize(raw: &str) -> Result<(), String> {
        let first = sanitize(raw).map_err(|error| error.to_string())?;
        let encoded = serde_json::to_string(&first).map_err(|error| error.to_string())?;
        let second = sanitize(&encoded).map_err(|error| error.to_string())?;
        if first == second {
            Ok(())
        } else {
            Err(format!("sanitize is not idempotent for {raw}"))
        }
    }

    #[test]
    fn prose_and_fences_around_json_are_tolerated() {
        let raw = "Sure! Here is the quote:\n```json\n{\"clientName\":\"A Smith\",\"items\":[]}\n```\nLet me know.";
        let quote = sanitize(raw).expect("sanitized");

        assert_eq!(quote.client_name, "A Smith");
        assert_eq!(quote.job_address, "");
        assert_eq!(quote.scope_summary, "");
        assert!(quote.items.is_empty());
    }

    #[test]
    fn items_are_renumbered_and_coerced() {
        let raw = json!({
            "items": [
                { "id": 7, "description": "Paint wall", "qty": "2", "price": 50 },
                { "id": 7, "qty": "abc" },
                "not an item",
            ]
        })
        .to_string();
        let quote = sanitize(&raw).expect("sanitized");

        let ids = quote.items.iter().map(|item| item.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(quote.items[0].qty, Decimal::from(2));
        assert_eq!(quote.items[0].price, Decimal::from(50));
        assert_eq!(quote.items[1].description, "");
        assert_eq!(quote.items[1].qty, Decimal::ZERO);
        assert_eq!(quote.items[1].price, Decimal::ZERO);
    }

    #[test]
    fn non_array_items_become_empty() {
        let quote = sanitize(r#"{"items": {"description": "x"}}"#).expect("sanitized");
        assert!(quote.items.is_empty());
    }

    #[test]
    fn address_and_scope_aliases_are_read() {
        let quote = sanitize(r#"{"clientAddress": "12 Gum St", "scopeOfWork": "Repaint"}"#)
            .expect("sanitized");
        assert_eq!(quote.job_address, "12 Gum St");
        assert_eq!(quote.scope_summary, "Repaint");
    }

    #[test]
    fn text_without_an_object_is_malformed() {
        let error = sanitize("I could not understand the recording.").expect_err("malformed");
        assert_eq!(
            error,
            ExtractionError::MalformedResponse {
                raw: "I could not understand the recording.".to_string()
            }
        );
        assert!(matches!(sanitize("{ not json }"), Err(ExtractionError::MalformedResponse { .. })));
    }

    #[test]
    fn slice_requires_closing_brace_after_opening() {
        assert_eq!(json_object_slice("} backwards {"), None);
        assert_eq!(json_object_slice("x {\"a\":1} y"), Some("{\"a\":1}"));
    }

    #[test]
    fn fixed_cases_are_idempotent() -> Result<(), String> {
        resanitize(r#"{"clientName": 42, "jobAddress": true, "items": [{"qty": 1.5, "price": "1e2"}]}"#)?;
        resanitize(r#"```json {"scopeOfWork": "Tile bathroom", "items": null} ```"#)?;
        resanitize(r#"{"items": [{"description": ["a"], "qty": null, "price": {"x": 1}}]}"#)
    }

    fn loose_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|number| json!(number)),
            (0u32..100_000, 0u32..4).prop_map(|(units, scale)| {
                Value::String(format!("{}", Decimal::new(i64::from(units), scale)))
            }),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ]
    }

    fn loose_item() -> impl Strategy<Value = Value> {
        (loose_value(), loose_value(), loose_value(), loose_value()).prop_map(
            |(id, description, qty, price)| {
                json!({ "id": id, "description": description, "qty": qty, "price": price })
            },
        )
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(
            client in loose_value(),
            address in loose_value(),
            address_alias in loose_value(),
            scope in loose_value(),
            items in proptest::collection::vec(loose_item(), 0..6),
            prose in "[a-z ]{0,10}",
        ) {
            let payload = json!({
                "clientName": client,
                "jobAddress": address,
                "clientAddress": address_alias,
                "scopeSummary": scope,
                "items": items,
            });
            let raw = format!("{prose}```json\n{payload}\n```{prose}");
            prop_assert_eq!(resanitize(&raw), Ok(()));
        }
    }
}
