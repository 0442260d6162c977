use proptest::prelude::*;
use quickquote_core::domain::quote::{
    compute_total, compute_total_value, next_item_id, parse_number_text, LineItem, LocalQuoteId,
    Quote,
};
use rust_decimal::Decimal;
use serde_json::json;

fn item_strategy() -> impl Strategy<Value = LineItem> {
    (1u32..500, "[a-z ]{0,16}", 0i64..10_000, 0i64..1_000_000).prop_map(
        |(id, description, qty_hundredths, price_cents)| LineItem {
            id,
            description,
            qty: Decimal::new(qty_hundredths, 2),
            price: Decimal::new(price_cents, 2),
        },
    )
}

proptest! {
    #[test]
    fn total_matches_sum_of_line_totals(items in proptest::collection::vec(item_strategy(), 0..12)) {
        let expected = items.iter().map(|item| item.qty * item.price).sum::<Decimal>();
        prop_assert_eq!(compute_total(&items), expected);
    }

    #[test]
    fn total_is_order_independent(items in proptest::collection::vec(item_strategy(), 0..12)) {
        let mut reversed = items.clone();
        reversed.reverse();
        prop_assert_eq!(compute_total(&items), compute_total(&reversed));
    }

    #[test]
    fn untyped_total_agrees_with_typed_total(items in proptest::collection::vec(item_strategy(), 0..8)) {
        let payload = json!(items
            .iter()
            .map(|item| json!({ "qty": item.qty.to_string(), "price": item.price.to_string() }))
            .collect::<Vec<_>>());
        prop_assert_eq!(compute_total_value(&payload), compute_total(&items));
    }

    #[test]
    fn next_item_id_follows_highest_id(items in proptest::collection::vec(item_strategy(), 0..12)) {
        let next = next_item_id(&items);
        let highest = items.iter().map(|item| item.id).max().unwrap_or(0);
        prop_assert_eq!(next, highest + 1);
        prop_assert!(items.iter().all(|item| item.id != next));
    }

    #[test]
    fn added_items_get_distinct_ids(count in 1usize..20) {
        let mut quote = Quote::new(LocalQuoteId(1));
        let ids = (0..count).map(|_| quote.push_blank_item()).collect::<Vec<_>>();
        let mut deduped = ids.clone();
        deduped.dedup();
        prop_assert_eq!(ids.len(), deduped.len());
        prop_assert_eq!(quote.total(), Decimal::ZERO);
    }

    #[test]
    fn unparseable_text_coerces_to_zero(text in "[a-zA-Z!?]{1,12}") {
        prop_assert_eq!(parse_number_text(&text), Decimal::ZERO);
    }
}
