use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{PartialReceipt, ShipmentItem};

/// The client-side working copy of the check step: the form values plus the
/// terminal flag set once the receipt has been finalized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReceivingFormState {
    pub values: PartialReceipt,
    pub completed: bool,
}

impl ReceivingFormState {
    pub fn new(values: PartialReceipt, completed: bool) -> Self {
        Self { values, completed }
    }

    /// Whether every mutating control (save, receive, cancel-all, row
    /// checkboxes) is disabled: after completion, and for shipments with
    /// nothing to receive.
    pub fn controls_locked(&self) -> bool {
        self.completed || self.values.containers.is_empty()
    }
}

/// Row-level cancel: the checkbox lands on whether anything is remaining,
/// regardless of its previous value.
pub fn cancel_remaining_line(item: &ShipmentItem) -> ShipmentItem {
    ShipmentItem {
        cancel_remaining: item.quantity_remaining > Decimal::ZERO,
        ..item.clone()
    }
}

/// Applies `cancel_remaining_line` to every item of every container and
/// returns the new tree. Container and item order is preserved, the input
/// is untouched, and applying it twice changes nothing.
pub fn cancel_all_remaining(values: &PartialReceipt) -> PartialReceipt {
    PartialReceipt {
        containers: values
            .containers
            .iter()
            .map(|container| {
                let mut updated = container.clone();
                updated.shipment_items = container
                    .shipment_items
                    .iter()
                    .map(cancel_remaining_line)
                    .collect();
                updated
            })
            .collect(),
        ..values.clone()
    }
}

/// Returns a new tree with the item at the given position replaced, or
/// `None` when the position does not exist.
pub fn with_item_replaced(
    values: &PartialReceipt,
    container_index: usize,
    item_index: usize,
    item: ShipmentItem,
) -> Option<PartialReceipt> {
    values
        .containers
        .get(container_index)?
        .shipment_items
        .get(item_index)?;

    let mut updated = values.clone();
    updated.containers[container_index].shipment_items[item_index] = item;
    Some(updated)
}

/// Returns a new tree with the row's cancel flag set. Checking a row that
/// has nothing remaining is coerced back to unchecked, matching the
/// disabled checkbox for such rows.
pub fn with_cancel_remaining(
    values: &PartialReceipt,
    container_index: usize,
    item_index: usize,
    cancel: bool,
) -> Option<PartialReceipt> {
    let current = values
        .containers
        .get(container_index)?
        .shipment_items
        .get(item_index)?;

    let effective = cancel && current.quantity_remaining > Decimal::ZERO;
    let updated = ShipmentItem {
        cancel_remaining: effective,
        ..current.clone()
    };
    with_item_replaced(values, container_index, item_index, updated)
}

/// Returns a new tree with the delivery date replaced.
pub fn with_date_delivered(values: &PartialReceipt, date: Option<NaiveDate>) -> PartialReceipt {
    PartialReceipt {
        date_delivered: date,
        ..values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Container;
    use rust_decimal_macros::dec;

    fn item(remaining: Decimal, cancelled: bool) -> ShipmentItem {
        ShipmentItem {
            quantity_remaining: remaining,
            cancel_remaining: cancelled,
            ..Default::default()
        }
    }

    fn receipt(items: Vec<ShipmentItem>) -> PartialReceipt {
        PartialReceipt {
            containers: vec![Container {
                shipment_items: items,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn cancel_all_sets_the_flag_from_the_remainder() {
        let original = receipt(vec![
            item(dec!(5), false),
            item(dec!(0), false),
            item(dec!(0), true),
            item(dec!(2), true),
        ]);

        let updated = cancel_all_remaining(&original);
        let flags: Vec<bool> = updated.containers[0]
            .shipment_items
            .iter()
            .map(|i| i.cancel_remaining)
            .collect();
        assert_eq!(flags, vec![true, false, false, true]);

        // Pure: the input tree is untouched.
        assert!(!original.containers[0].shipment_items[0].cancel_remaining);
        assert!(original.containers[0].shipment_items[2].cancel_remaining);
    }

    #[test]
    fn cancel_all_is_idempotent() {
        let original = receipt(vec![item(dec!(5), false), item(dec!(0), true)]);
        let once = cancel_all_remaining(&original);
        let twice = cancel_all_remaining(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn checking_a_fully_received_row_is_coerced_off() {
        let original = receipt(vec![item(dec!(0), false)]);
        let updated = with_cancel_remaining(&original, 0, 0, true).expect("position exists");
        assert!(!updated.containers[0].shipment_items[0].cancel_remaining);

        let original = receipt(vec![item(dec!(3), false)]);
        let updated = with_cancel_remaining(&original, 0, 0, true).expect("position exists");
        assert!(updated.containers[0].shipment_items[0].cancel_remaining);
    }

    #[test]
    fn out_of_range_updates_return_none() {
        let original = receipt(vec![item(dec!(1), false)]);
        assert!(with_cancel_remaining(&original, 0, 3, true).is_none());
        assert!(with_cancel_remaining(&original, 2, 0, true).is_none());
        assert!(with_item_replaced(&original, 1, 0, item(dec!(1), false)).is_none());
    }

    #[test]
    fn controls_lock_on_completion_and_on_empty_shipments() {
        let open = ReceivingFormState::new(receipt(vec![item(dec!(1), false)]), false);
        assert!(!open.controls_locked());

        let completed = ReceivingFormState::new(receipt(vec![item(dec!(1), false)]), true);
        assert!(completed.controls_locked());

        let empty = ReceivingFormState::new(PartialReceipt::default(), false);
        assert!(empty.controls_locked());
    }
}
