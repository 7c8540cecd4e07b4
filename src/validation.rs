use rust_decimal::Decimal;
use serde::Serialize;

use crate::messages;
use crate::models::PartialReceipt;

/// Validation result for the check step.
///
/// The tree mirrors the form: one entry per container and one per item, in
/// form order, whether or not that position has an error. Positional lookup
/// therefore never shifts as errors appear and disappear. Leaves hold
/// message ids, not rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTree {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_delivered: Option<String>,
    pub containers: Vec<ContainerErrors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerErrors {
    pub shipment_items: Vec<ItemErrors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_receiving: Option<String>,
}

impl ErrorTree {
    /// An all-clear tree shaped after `values`.
    pub fn for_shape(values: &PartialReceipt) -> Self {
        Self {
            date_delivered: None,
            containers: values
                .containers
                .iter()
                .map(|container| ContainerErrors {
                    shipment_items: vec![ItemErrors::default(); container.shipment_items.len()],
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date_delivered.is_none()
            && self.containers.iter().all(|container| {
                container
                    .shipment_items
                    .iter()
                    .all(|item| item.quantity_receiving.is_none())
            })
    }

    /// Errors recorded for the item at the given position, if the position
    /// exists in the tree.
    pub fn item(&self, container_index: usize, item_index: usize) -> Option<&ItemErrors> {
        self.containers
            .get(container_index)
            .and_then(|container| container.shipment_items.get(item_index))
    }
}

/// Validates the form values for this step. Pure: same input, same tree.
///
/// Rules: `dateDelivered` is required; `quantityReceiving` may not be
/// negative (it is entered upstream, so only flagged here, at the exact
/// container/item position it occupies).
pub fn validate(values: &PartialReceipt) -> ErrorTree {
    let mut errors = ErrorTree::for_shape(values);

    if values.date_delivered.is_none() {
        errors.date_delivered = Some(messages::ERROR_REQUIRED_FIELD.to_string());
    }

    for (container_index, container) in values.containers.iter().enumerate() {
        for (item_index, item) in container.shipment_items.iter().enumerate() {
            if let Some(quantity) = item.quantity_receiving {
                if quantity < Decimal::ZERO {
                    errors.containers[container_index].shipment_items[item_index]
                        .quantity_receiving =
                        Some(messages::ERROR_QUANTITY_NEGATIVE.to_string());
                }
            }
        }
    }

    errors
}
