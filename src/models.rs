use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::messages::{self, MessageCatalog};

/// Wire format for dates on this API, e.g. `06/21/2024`.
pub const DATE_WIRE_FORMAT: &str = "%m/%d/%Y";

/// Serde adapter for optional dates in the API's `MM/DD/YYYY` format.
/// ISO `YYYY-MM-DD` is accepted on input; blanks deserialize to `None`.
pub mod wire_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_WIRE_FORMAT;

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => {
                serializer.serialize_str(&date.format(DATE_WIRE_FORMAT).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => NaiveDate::parse_from_str(&s, DATE_WIRE_FORMAT)
                .or_else(|_| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Deserializer for entity references that the API may send as an empty
/// string instead of an object (the "cleared assignment" marker).
pub mod entity_or_blank {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::EntityRef;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<EntityRef>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Value> = Option::deserialize(deserializer)?;
        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(other) => serde_json::from_value(other)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Reference to a named server entity (location, bin, person).
///
/// The id is the authoritative part: a reference counts as chosen only when
/// the id is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    pub fn is_chosen(&self) -> bool {
        self.id.as_deref().map_or(false, |id| !id.is_empty())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub name: String,
}

/// One receipt line inside a container.
///
/// `quantity_receiving` was entered on the edit step; this step validates
/// and displays it. `quantity_remaining` is server-computed and display
/// only. Fields this step does not model are carried through `extra` so a
/// save round-trip never drops them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_item_id: Option<String>,
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub lot_number: Option<String>,
    #[serde(default, with = "wire_date")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub bin_location: Option<EntityRef>,
    #[serde(default, deserialize_with = "entity_or_blank::deserialize")]
    pub recipient: Option<EntityRef>,
    #[serde(default)]
    pub quantity_receiving: Option<Decimal>,
    #[serde(default)]
    pub quantity_remaining: Decimal,
    #[serde(default)]
    pub cancel_remaining: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShipmentItem {
    /// True when a bin has actually been picked for this line.
    pub fn has_bin_location(&self) -> bool {
        self.bin_location
            .as_ref()
            .map_or(false, EntityRef::is_chosen)
    }
}

/// A pack line. Containers nest at most one level deep through
/// `parent_container`; items live on the child.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_container: Option<Box<Container>>,
    #[serde(default)]
    pub shipment_items: Vec<ShipmentItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Container {
    fn parent_name(&self) -> Option<&str> {
        self.parent_container
            .as_deref()
            .and_then(|parent| parent.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    fn own_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// First pack label: parent name, else own name, else "Unpacked".
    pub fn pack_level_1(&self, catalog: &MessageCatalog) -> String {
        self.parent_name()
            .or_else(|| self.own_name())
            .map(str::to_string)
            .unwrap_or_else(|| catalog.translate(messages::LABEL_UNPACKED, "Unpacked"))
    }

    /// Second pack label: own name when nested under a parent, else blank.
    pub fn pack_level_2(&self) -> String {
        if self.parent_name().is_some() {
            self.own_name().unwrap_or_default().to_string()
        } else {
            String::new()
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ShipmentStatus {
    #[default]
    Pending,
    Shipped,
    PartiallyReceived,
    Received,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ReceiptStatus {
    #[default]
    Pending,
    Completed,
}

/// The whole check-step form: shipment header plus the container tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialReceipt {
    #[serde(default)]
    pub origin: EntityRef,
    #[serde(default)]
    pub destination: EntityRef,
    #[serde(default, with = "wire_date")]
    pub date_shipped: Option<NaiveDate>,
    #[serde(default, with = "wire_date")]
    pub date_delivered: Option<NaiveDate>,
    #[serde(default)]
    pub shipment_status: ShipmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_status: Option<ReceiptStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requisition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PartialReceipt {
    /// The identifier the post-completion summary view is keyed by:
    /// the requisition number when one exists, the shipment id otherwise.
    pub fn summary_reference(&self) -> Option<&str> {
        self.requisition
            .as_deref()
            .filter(|id| !id.is_empty())
            .or(self.shipment_id.as_deref())
    }

    /// True when some line still has no bin location picked.
    pub fn has_unassigned_bin_location(&self) -> bool {
        self.containers.iter().any(|container| {
            container
                .shipment_items
                .iter()
                .any(|item| !item.has_bin_location())
        })
    }

    pub fn item_count(&self) -> usize {
        self.containers
            .iter()
            .map(|container| container.shipment_items.len())
            .sum()
    }
}

/// Feature support of the current location, resolved from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCapabilities {
    #[serde(default)]
    pub bin_location_support: bool,
    #[serde(default)]
    pub partial_receiving_support: bool,
}

impl LocationCapabilities {
    pub fn full() -> Self {
        Self {
            bin_location_support: true,
            partial_receiving_support: true,
        }
    }
}
