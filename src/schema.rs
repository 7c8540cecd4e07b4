//! Declarative field configuration for the check screen.
//!
//! The schema describes what a renderer should draw without prescribing a
//! widget toolkit: field kinds are a closed enum, static tables list the
//! header fields and the container-table columns, and per-render behavior
//! (hide, disable, emphasis) comes out of a pure function over an explicit
//! context.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::messages::{self, MessageCatalog};
use crate::models::{
    Container, LocationCapabilities, PartialReceipt, ShipmentItem, DATE_WIRE_FORMAT,
};
use crate::validation::ErrorTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Date,
    Label,
    Checkbox,
    Array,
}

/// Which line of the container table a column renders on: the container
/// header line or the per-item lines beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldPlacement {
    HeaderRow,
    ItemRow,
}

/// How a raw value is turned into display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueFormat {
    Plain,
    Date,
    Quantity,
    PackLevel1,
    PackLevel2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    pub key: &'static str,
    pub field_type: FieldType,
    pub label_id: &'static str,
    pub default_label: &'static str,
    pub placement: FieldPlacement,
    pub format: ValueFormat,
    /// Relative column width for flexible layouts, when a field asks for
    /// more room than the default.
    pub flex_width: Option<&'static str>,
    pub editable: bool,
    pub required: bool,
}

impl FieldSchema {
    const fn label(
        key: &'static str,
        label_id: &'static str,
        default_label: &'static str,
        placement: FieldPlacement,
    ) -> Self {
        Self {
            key,
            field_type: FieldType::Label,
            label_id,
            default_label,
            placement,
            format: ValueFormat::Plain,
            flex_width: None,
            editable: false,
            required: false,
        }
    }
}

/// Shipment header fields. Everything except the delivery date was settled
/// on earlier steps and renders read-only here.
pub static SHIPMENT_FIELDS: Lazy<Vec<FieldSchema>> = Lazy::new(|| {
    vec![
        FieldSchema {
            key: "origin.name",
            field_type: FieldType::Text,
            label_id: messages::LABEL_ORIGIN,
            default_label: "Origin",
            placement: FieldPlacement::HeaderRow,
            format: ValueFormat::Plain,
            flex_width: None,
            editable: false,
            required: false,
        },
        FieldSchema {
            key: "destination.name",
            field_type: FieldType::Text,
            label_id: messages::LABEL_DESTINATION,
            default_label: "Destination",
            placement: FieldPlacement::HeaderRow,
            format: ValueFormat::Plain,
            flex_width: None,
            editable: false,
            required: false,
        },
        FieldSchema {
            key: "dateShipped",
            field_type: FieldType::Date,
            label_id: messages::LABEL_SHIPPED_ON,
            default_label: "Shipped on",
            placement: FieldPlacement::HeaderRow,
            format: ValueFormat::Date,
            flex_width: None,
            editable: false,
            required: false,
        },
        FieldSchema {
            key: "dateDelivered",
            field_type: FieldType::Date,
            label_id: messages::LABEL_DELIVERED_ON,
            default_label: "Delivered on",
            placement: FieldPlacement::HeaderRow,
            format: ValueFormat::Date,
            flex_width: None,
            editable: true,
            required: true,
        },
    ]
});

/// Columns of the container table. Pack labels render on the container
/// header line; everything else renders per item.
pub static TABLE_FIELDS: Lazy<Vec<FieldSchema>> = Lazy::new(|| {
    vec![
        FieldSchema {
            format: ValueFormat::PackLevel1,
            ..FieldSchema::label(
                "parentContainer.name",
                messages::LABEL_PACK_LEVEL_1,
                "Pack level 1",
                FieldPlacement::HeaderRow,
            )
        },
        FieldSchema {
            format: ValueFormat::PackLevel2,
            ..FieldSchema::label(
                "container.name",
                messages::LABEL_PACK_LEVEL_2,
                "Pack level 2",
                FieldPlacement::HeaderRow,
            )
        },
        FieldSchema::label(
            "product.productCode",
            messages::LABEL_CODE,
            "Code",
            FieldPlacement::ItemRow,
        ),
        FieldSchema::label(
            "product.name",
            messages::LABEL_PRODUCT,
            "Product",
            FieldPlacement::ItemRow,
        ),
        FieldSchema::label(
            "lotNumber",
            messages::LABEL_LOT_SERIAL,
            "Lot/Serial No.",
            FieldPlacement::ItemRow,
        ),
        FieldSchema {
            format: ValueFormat::Date,
            ..FieldSchema::label(
                "expirationDate",
                messages::LABEL_EXPIRATION_DATE,
                "Expiration date",
                FieldPlacement::ItemRow,
            )
        },
        FieldSchema::label(
            "binLocation.name",
            messages::LABEL_BIN_LOCATION,
            "Bin Location",
            FieldPlacement::ItemRow,
        ),
        FieldSchema {
            flex_width: Some("1.5"),
            ..FieldSchema::label(
                "recipient.name",
                messages::LABEL_RECIPIENT,
                "Recipient",
                FieldPlacement::ItemRow,
            )
        },
        FieldSchema {
            format: ValueFormat::Quantity,
            ..FieldSchema::label(
                "quantityReceiving",
                messages::LABEL_RECEIVING_NOW,
                "Receiving now",
                FieldPlacement::ItemRow,
            )
        },
        FieldSchema {
            format: ValueFormat::Quantity,
            ..FieldSchema::label(
                "quantityRemaining",
                messages::LABEL_REMAINING,
                "Remaining",
                FieldPlacement::ItemRow,
            )
        },
        FieldSchema {
            field_type: FieldType::Checkbox,
            editable: true,
            ..FieldSchema::label(
                "cancelRemaining",
                messages::LABEL_CANCEL_REMAINING,
                "Cancel remaining",
                FieldPlacement::ItemRow,
            )
        },
        FieldSchema::label(
            "comment",
            messages::LABEL_COMMENT,
            "Comment",
            FieldPlacement::ItemRow,
        ),
    ]
});

/// Presentation hint for a rendered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Emphasis {
    #[default]
    None,
    /// Outstanding remainder: draw attention.
    Highlight,
    /// Settled remainder (cancelled or zero): render struck through.
    StrikeThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicAttrs {
    pub hidden: bool,
    pub disabled: bool,
    pub emphasis: Emphasis,
}

/// Everything the per-render attribute resolution may depend on. Passed
/// explicitly; the resolution itself keeps no state.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub save_disabled: bool,
    pub capabilities: LocationCapabilities,
    /// The item the field renders for; `None` on container header lines and
    /// shipment header fields.
    pub item: Option<&'a ShipmentItem>,
}

/// Computes the render-time behavior of one field. Pure: the result is a
/// function of the schema entry and the context alone.
pub fn dynamic_attrs(field: &FieldSchema, ctx: &FieldContext<'_>) -> DynamicAttrs {
    let mut attrs = DynamicAttrs {
        disabled: !field.editable || ctx.save_disabled,
        ..Default::default()
    };

    match field.key {
        "binLocation.name" => {
            attrs.hidden = !ctx.capabilities.bin_location_support;
        }
        "cancelRemaining" => {
            let remaining = ctx
                .item
                .map(|item| item.quantity_remaining)
                .unwrap_or_default();
            attrs.disabled = ctx.save_disabled
                || remaining <= Decimal::ZERO
                || !ctx.capabilities.partial_receiving_support;
        }
        "quantityRemaining" => {
            if let Some(item) = ctx.item {
                attrs.emphasis = if item.cancel_remaining || item.quantity_remaining.is_zero() {
                    Emphasis::StrikeThrough
                } else {
                    Emphasis::Highlight
                };
            }
        }
        _ => {}
    }

    attrs
}

/// Groups digits of a quantity for display, `1234567.5` -> `1,234,567.5`.
pub fn format_quantity(value: Decimal) -> String {
    let raw = value.normalize().to_string();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (offset, ch) in int_part.chars().enumerate() {
        if offset > 0 && (int_part.len() - offset) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// One field resolved for display: translated label, formatted value, and
/// render-time attributes, with any validation message attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedField {
    pub key: &'static str,
    pub field_type: FieldType,
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    pub attrs: DynamicAttrs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A rendered line of the container table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRow {
    pub container_index: usize,
    /// `None` for the container header line, the item index otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    pub cells: Vec<ResolvedField>,
}

fn format_date(date: chrono::NaiveDate) -> String {
    date.format(DATE_WIRE_FORMAT).to_string()
}

fn header_value(field: &FieldSchema, values: &PartialReceipt) -> String {
    match field.key {
        "origin.name" => values.origin.name.clone().unwrap_or_default(),
        "destination.name" => values.destination.name.clone().unwrap_or_default(),
        "dateShipped" => values.date_shipped.map(format_date).unwrap_or_default(),
        "dateDelivered" => values.date_delivered.map(format_date).unwrap_or_default(),
        _ => String::new(),
    }
}

fn item_value(field: &FieldSchema, item: &ShipmentItem) -> String {
    match field.key {
        "product.productCode" => item.product.product_code.clone(),
        "product.name" => item.product.name.clone(),
        "lotNumber" => item.lot_number.clone().unwrap_or_default(),
        "expirationDate" => item.expiration_date.map(format_date).unwrap_or_default(),
        "binLocation.name" => item
            .bin_location
            .as_ref()
            .and_then(|bin| bin.name.clone())
            .unwrap_or_default(),
        "recipient.name" => item
            .recipient
            .as_ref()
            .and_then(|recipient| recipient.name.clone())
            .unwrap_or_default(),
        "quantityReceiving" => item
            .quantity_receiving
            .map(format_quantity)
            .unwrap_or_default(),
        "quantityRemaining" => format_quantity(item.quantity_remaining),
        "comment" => item.comment.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

fn pack_value(field: &FieldSchema, container: &Container, catalog: &MessageCatalog) -> String {
    match field.format {
        ValueFormat::PackLevel1 => container.pack_level_1(catalog),
        ValueFormat::PackLevel2 => container.pack_level_2(),
        _ => String::new(),
    }
}

/// Resolves the shipment header fields for display.
pub fn resolve_header_fields(
    values: &PartialReceipt,
    errors: &ErrorTree,
    catalog: &MessageCatalog,
    save_disabled: bool,
    capabilities: LocationCapabilities,
) -> Vec<ResolvedField> {
    let ctx = FieldContext {
        save_disabled,
        capabilities,
        item: None,
    };
    SHIPMENT_FIELDS
        .iter()
        .map(|field| {
            let error = match field.key {
                "dateDelivered" => errors.date_delivered.as_deref(),
                _ => None,
            };
            ResolvedField {
                key: field.key,
                field_type: field.field_type,
                label: catalog.translate(field.label_id, field.default_label),
                value: header_value(field, values),
                checked: None,
                attrs: dynamic_attrs(field, &ctx),
                error: error.map(|id| catalog.resolve(id)),
            }
        })
        .collect()
}

/// Resolves the container table: one header line per container followed by
/// one line per item. Hidden columns are left out; validation messages land
/// on the cell they belong to.
pub fn resolve_table(
    values: &PartialReceipt,
    errors: &ErrorTree,
    catalog: &MessageCatalog,
    save_disabled: bool,
    capabilities: LocationCapabilities,
) -> Vec<ResolvedRow> {
    let mut rows = Vec::new();

    for (container_index, container) in values.containers.iter().enumerate() {
        let header_ctx = FieldContext {
            save_disabled,
            capabilities,
            item: None,
        };
        let header_cells = TABLE_FIELDS
            .iter()
            .filter(|field| field.placement == FieldPlacement::HeaderRow)
            .filter_map(|field| {
                let attrs = dynamic_attrs(field, &header_ctx);
                if attrs.hidden {
                    return None;
                }
                Some(ResolvedField {
                    key: field.key,
                    field_type: field.field_type,
                    label: catalog.translate(field.label_id, field.default_label),
                    value: pack_value(field, container, catalog),
                    checked: None,
                    attrs,
                    error: None,
                })
            })
            .collect();
        rows.push(ResolvedRow {
            container_index,
            item_index: None,
            cells: header_cells,
        });

        for (item_index, item) in container.shipment_items.iter().enumerate() {
            let ctx = FieldContext {
                save_disabled,
                capabilities,
                item: Some(item),
            };
            let item_errors = errors.item(container_index, item_index);
            let cells = TABLE_FIELDS
                .iter()
                .filter(|field| field.placement == FieldPlacement::ItemRow)
                .filter_map(|field| {
                    let attrs = dynamic_attrs(field, &ctx);
                    if attrs.hidden {
                        return None;
                    }
                    let error = match field.key {
                        "quantityReceiving" => {
                            item_errors.and_then(|entry| entry.quantity_receiving.as_deref())
                        }
                        _ => None,
                    };
                    Some(ResolvedField {
                        key: field.key,
                        field_type: field.field_type,
                        label: catalog.translate(field.label_id, field.default_label),
                        value: item_value(field, item),
                        checked: (field.field_type == FieldType::Checkbox)
                            .then_some(item.cancel_remaining),
                        attrs,
                        error: error.map(|id| catalog.resolve(id)),
                    })
                })
                .collect();
            rows.push(ResolvedRow {
                container_index,
                item_index: Some(item_index),
                cells,
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityRef, Product};
    use crate::validation::validate;
    use rust_decimal_macros::dec;

    fn item(remaining: Decimal, cancelled: bool) -> ShipmentItem {
        ShipmentItem {
            product: Product {
                product_code: "10001".into(),
                name: "Exam gloves".into(),
            },
            quantity_remaining: remaining,
            cancel_remaining: cancelled,
            ..Default::default()
        }
    }

    fn ctx(item: Option<&ShipmentItem>, capabilities: LocationCapabilities) -> FieldContext<'_> {
        FieldContext {
            save_disabled: false,
            capabilities,
            item,
        }
    }

    fn field(key: &str) -> &'static FieldSchema {
        TABLE_FIELDS
            .iter()
            .find(|field| field.key == key)
            .expect("known field")
    }

    #[test]
    fn bin_location_column_hides_without_support() {
        let row = item(dec!(1), false);
        let shown = dynamic_attrs(
            field("binLocation.name"),
            &ctx(Some(&row), LocationCapabilities::full()),
        );
        assert!(!shown.hidden);

        let hidden = dynamic_attrs(
            field("binLocation.name"),
            &ctx(Some(&row), LocationCapabilities::default()),
        );
        assert!(hidden.hidden);
    }

    #[test]
    fn cancel_checkbox_disables_for_settled_rows_and_unsupported_locations() {
        let outstanding = item(dec!(4), false);
        let settled = item(dec!(0), false);

        let enabled = dynamic_attrs(
            field("cancelRemaining"),
            &ctx(Some(&outstanding), LocationCapabilities::full()),
        );
        assert!(!enabled.disabled);

        let no_remainder = dynamic_attrs(
            field("cancelRemaining"),
            &ctx(Some(&settled), LocationCapabilities::full()),
        );
        assert!(no_remainder.disabled);

        let unsupported = dynamic_attrs(
            field("cancelRemaining"),
            &ctx(
                Some(&outstanding),
                LocationCapabilities {
                    bin_location_support: true,
                    partial_receiving_support: false,
                },
            ),
        );
        assert!(unsupported.disabled);

        let locked = dynamic_attrs(
            field("cancelRemaining"),
            &FieldContext {
                save_disabled: true,
                capabilities: LocationCapabilities::full(),
                item: Some(&outstanding),
            },
        );
        assert!(locked.disabled);
    }

    #[test]
    fn remaining_column_emphasis_tracks_the_remainder() {
        let outstanding = item(dec!(4), false);
        let cancelled = item(dec!(4), true);
        let zero = item(dec!(0), false);
        let negative = item(dec!(-2), false);

        let capabilities = LocationCapabilities::full();
        let attrs = |row| dynamic_attrs(field("quantityRemaining"), &ctx(Some(row), capabilities));
        assert_eq!(attrs(&outstanding).emphasis, Emphasis::Highlight);
        assert_eq!(attrs(&cancelled).emphasis, Emphasis::StrikeThrough);
        assert_eq!(attrs(&zero).emphasis, Emphasis::StrikeThrough);
        assert_eq!(attrs(&negative).emphasis, Emphasis::Highlight);
    }

    #[test]
    fn quantities_group_digits_for_display() {
        assert_eq!(format_quantity(dec!(0)), "0");
        assert_eq!(format_quantity(dec!(512)), "512");
        assert_eq!(format_quantity(dec!(1234)), "1,234");
        assert_eq!(format_quantity(dec!(1234567.5)), "1,234,567.5");
        assert_eq!(format_quantity(dec!(-43210)), "-43,210");
        assert_eq!(format_quantity(dec!(10.00)), "10");
    }

    #[test]
    fn table_resolution_yields_header_then_item_rows() {
        let values = PartialReceipt {
            date_delivered: chrono::NaiveDate::from_ymd_opt(2024, 6, 11),
            containers: vec![Container {
                name: Some("Pallet 1".into()),
                shipment_items: vec![
                    {
                        let mut first = item(dec!(5), false);
                        first.quantity_receiving = Some(dec!(-1));
                        first
                    },
                    item(dec!(0), false),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let errors = validate(&values);
        let catalog = MessageCatalog::new();

        let rows = resolve_table(
            &values,
            &errors,
            &catalog,
            false,
            LocationCapabilities::full(),
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].item_index, None);
        assert_eq!(rows[0].cells[0].value, "Pallet 1");
        assert_eq!(rows[1].item_index, Some(0));

        let flagged = rows[1]
            .cells
            .iter()
            .find(|cell| cell.key == "quantityReceiving")
            .expect("column present");
        assert_eq!(
            flagged.error.as_deref(),
            Some("Quantity to receive can't be negative")
        );
        let clean = rows[2]
            .cells
            .iter()
            .find(|cell| cell.key == "quantityReceiving")
            .expect("column present");
        assert_eq!(clean.error, None);
    }

    #[test]
    fn bin_location_cells_are_omitted_without_support() {
        let values = PartialReceipt {
            containers: vec![Container {
                shipment_items: vec![{
                    let mut row = item(dec!(2), false);
                    row.bin_location = Some(EntityRef::named("bin-1", "A1-02"));
                    row
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let errors = validate(&values);
        let catalog = MessageCatalog::new();

        let with_bins = resolve_table(
            &values,
            &errors,
            &catalog,
            false,
            LocationCapabilities::full(),
        );
        assert!(with_bins[1]
            .cells
            .iter()
            .any(|cell| cell.key == "binLocation.name"));

        let without_bins = resolve_table(
            &values,
            &errors,
            &catalog,
            false,
            LocationCapabilities {
                bin_location_support: false,
                partial_receiving_support: true,
            },
        );
        assert!(!without_bins[1]
            .cells
            .iter()
            .any(|cell| cell.key == "binLocation.name"));
    }

    #[test]
    fn delivery_date_is_the_only_editable_header_field() {
        let values = PartialReceipt::default();
        let errors = validate(&values);
        let catalog = MessageCatalog::new();

        let fields = resolve_header_fields(
            &values,
            &errors,
            &catalog,
            false,
            LocationCapabilities::full(),
        );
        for resolved in &fields {
            if resolved.key == "dateDelivered" {
                assert!(!resolved.attrs.disabled);
                assert_eq!(resolved.error.as_deref(), Some("This field is required"));
            } else {
                assert!(resolved.attrs.disabled);
            }
        }
    }
}
