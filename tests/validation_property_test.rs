//! Property-based tests for the pure core: validation shape, the
//! remainder-cancellation operator, and the wire codec round trip.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use receiving_client::models::{Container, PartialReceipt, Product, ShipmentItem};
use receiving_client::state;
use receiving_client::validation;
use receiving_client::wire;

fn decimal_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000, 0u32..3).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030, 1u32..13, 1u32..29).prop_map(|(y, m, d)| {
        NaiveDate::from_ymd_opt(y, m, d).expect("day 1-28 exists in every month")
    })
}

fn item_strategy() -> impl Strategy<Value = ShipmentItem> {
    (
        "[0-9]{5}",
        "[A-Za-z ]{1,20}",
        proptest::option::of(decimal_strategy()),
        decimal_strategy(),
        any::<bool>(),
    )
        .prop_map(|(code, name, receiving, remaining, cancelled)| ShipmentItem {
            product: Product {
                product_code: code,
                name,
            },
            quantity_receiving: receiving,
            quantity_remaining: remaining,
            cancel_remaining: cancelled,
            ..Default::default()
        })
}

fn receipt_strategy() -> impl Strategy<Value = PartialReceipt> {
    (
        proptest::collection::vec(proptest::collection::vec(item_strategy(), 1..5), 1..4),
        proptest::option::of(date_strategy()),
    )
        .prop_map(|(containers, date_delivered)| PartialReceipt {
            date_delivered,
            shipment_id: Some("ship-prop".to_string()),
            containers: containers
                .into_iter()
                .map(|shipment_items| Container {
                    shipment_items,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn error_tree_always_mirrors_the_form_shape(receipt in receipt_strategy()) {
        let errors = validation::validate(&receipt);

        prop_assert_eq!(errors.containers.len(), receipt.containers.len());
        for (container_errors, container) in errors.containers.iter().zip(&receipt.containers) {
            prop_assert_eq!(
                container_errors.shipment_items.len(),
                container.shipment_items.len()
            );
        }
    }

    #[test]
    fn negative_quantities_are_flagged_at_exactly_their_position(receipt in receipt_strategy()) {
        let errors = validation::validate(&receipt);

        for (c, container) in receipt.containers.iter().enumerate() {
            for (i, item) in container.shipment_items.iter().enumerate() {
                let flagged = errors
                    .item(c, i)
                    .expect("position exists")
                    .quantity_receiving
                    .is_some();
                let negative = item
                    .quantity_receiving
                    .map_or(false, |quantity| quantity < Decimal::ZERO);
                prop_assert_eq!(flagged, negative, "mismatch at ({}, {})", c, i);
            }
        }
    }

    #[test]
    fn delivery_date_error_tracks_its_absence(receipt in receipt_strategy()) {
        let errors = validation::validate(&receipt);
        prop_assert_eq!(errors.date_delivered.is_some(), receipt.date_delivered.is_none());
    }

    #[test]
    fn validation_is_deterministic(receipt in receipt_strategy()) {
        prop_assert_eq!(validation::validate(&receipt), validation::validate(&receipt));
    }

    #[test]
    fn cancel_all_lands_every_flag_on_the_remainder(receipt in receipt_strategy()) {
        let updated = state::cancel_all_remaining(&receipt);

        prop_assert_eq!(updated.containers.len(), receipt.containers.len());
        for (updated_container, container) in updated.containers.iter().zip(&receipt.containers) {
            for (updated_item, item) in updated_container
                .shipment_items
                .iter()
                .zip(&container.shipment_items)
            {
                prop_assert_eq!(
                    updated_item.cancel_remaining,
                    item.quantity_remaining > Decimal::ZERO
                );
                // Everything else is untouched.
                prop_assert_eq!(&updated_item.product, &item.product);
                prop_assert_eq!(updated_item.quantity_receiving, item.quantity_receiving);
                prop_assert_eq!(updated_item.quantity_remaining, item.quantity_remaining);
            }
        }
    }

    #[test]
    fn cancel_all_is_idempotent(receipt in receipt_strategy()) {
        let once = state::cancel_all_remaining(&receipt);
        let twice = state::cancel_all_remaining(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn flatten_then_expand_reproduces_the_receipt(receipt in receipt_strategy()) {
        let tree = serde_json::to_value(&receipt).expect("serializes");
        let flat = serde_json::Value::Object(wire::flatten(&tree));
        let back: PartialReceipt =
            serde_json::from_value(wire::expand(&flat)).expect("deserializes");
        prop_assert_eq!(back, receipt);
    }

    #[test]
    fn flattened_keys_hold_scalars_only(receipt in receipt_strategy()) {
        let tree = serde_json::to_value(&receipt).expect("serializes");
        for (key, value) in wire::flatten(&tree) {
            prop_assert!(!key.is_empty());
            prop_assert!(!value.is_object() && !value.is_array() && !value.is_null());
        }
    }
}
