use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::errors::ReceivingError;

// Field labels shown on the check screen.
pub const LABEL_ORIGIN: &str = "partialReceiving.origin.label";
pub const LABEL_DESTINATION: &str = "partialReceiving.destination.label";
pub const LABEL_SHIPPED_ON: &str = "partialReceiving.shippedOn.label";
pub const LABEL_DELIVERED_ON: &str = "partialReceiving.deliveredOn.label";
pub const LABEL_PACK_LEVEL_1: &str = "partialReceiving.packLevel1.label";
pub const LABEL_PACK_LEVEL_2: &str = "partialReceiving.packLevel2.label";
pub const LABEL_CODE: &str = "partialReceiving.code.label";
pub const LABEL_PRODUCT: &str = "partialReceiving.product.label";
pub const LABEL_LOT_SERIAL: &str = "partialReceiving.lotSerialNo.label";
pub const LABEL_EXPIRATION_DATE: &str = "partialReceiving.expirationDate.label";
pub const LABEL_BIN_LOCATION: &str = "partialReceiving.binLocation.label";
pub const LABEL_RECIPIENT: &str = "partialReceiving.recipient.label";
pub const LABEL_RECEIVING_NOW: &str = "partialReceiving.receivingNow.label";
pub const LABEL_REMAINING: &str = "partialReceiving.remaining.label";
pub const LABEL_CANCEL_REMAINING: &str = "partialReceiving.cancelRemaining.label";
pub const LABEL_COMMENT: &str = "partialReceiving.comment.label";
pub const LABEL_UNPACKED: &str = "partialReceiving.unpacked.label";

// Buttons.
pub const BUTTON_BACK_TO_EDIT: &str = "partialReceiving.backToEdit.label";
pub const BUTTON_SAVE: &str = "default.button.save.label";
pub const BUTTON_SAVE_AND_EXIT: &str = "default.button.saveAndExit.label";
pub const BUTTON_RECEIVE: &str = "partialReceiving.receiveShipment.label";
pub const BUTTON_CANCEL_ALL: &str = "partialReceiving.cancelAllRemaining.label";
pub const BUTTON_YES: &str = "default.yes.label";
pub const BUTTON_NO: &str = "default.no.label";

// Confirmation dialog shown when bin locations are missing.
pub const CONFIRM_RECEIVING_TITLE: &str = "partialReceiving.message.confirmReceive.label";
pub const CONFIRM_RECEIVING_MESSAGE: &str = "partialReceiving.confirmReceive.message";

// Validation and failure codes.
pub const ERROR_REQUIRED_FIELD: &str = "default.error.requiredField";
pub const ERROR_QUANTITY_NEGATIVE: &str = "partialReceiving.error.quantityToReceiveNegative";
pub const ERROR_NETWORK: &str = "default.error.network";
pub const ERROR_VALIDATION: &str = "default.error.validation";
pub const ERROR_REQUEST_IN_FLIGHT: &str = "default.error.requestInFlight";

/// Built-in English text for every message id, used when a call site has no
/// contextual default of its own.
static DEFAULT_MESSAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (LABEL_ORIGIN, "Origin"),
        (LABEL_DESTINATION, "Destination"),
        (LABEL_SHIPPED_ON, "Shipped on"),
        (LABEL_DELIVERED_ON, "Delivered on"),
        (LABEL_PACK_LEVEL_1, "Pack level 1"),
        (LABEL_PACK_LEVEL_2, "Pack level 2"),
        (LABEL_CODE, "Code"),
        (LABEL_PRODUCT, "Product"),
        (LABEL_LOT_SERIAL, "Lot/Serial No."),
        (LABEL_EXPIRATION_DATE, "Expiration date"),
        (LABEL_BIN_LOCATION, "Bin Location"),
        (LABEL_RECIPIENT, "Recipient"),
        (LABEL_RECEIVING_NOW, "Receiving now"),
        (LABEL_REMAINING, "Remaining"),
        (LABEL_CANCEL_REMAINING, "Cancel remaining"),
        (LABEL_COMMENT, "Comment"),
        (LABEL_UNPACKED, "Unpacked"),
        (BUTTON_BACK_TO_EDIT, "Back to edit"),
        (BUTTON_SAVE, "Save"),
        (BUTTON_SAVE_AND_EXIT, "Save and exit"),
        (BUTTON_RECEIVE, "Receive shipment"),
        (BUTTON_CANCEL_ALL, "Cancel all remaining"),
        (BUTTON_YES, "Yes"),
        (BUTTON_NO, "No"),
        (CONFIRM_RECEIVING_TITLE, "Confirm receiving"),
        (
            CONFIRM_RECEIVING_MESSAGE,
            "Are you sure you want to receive? There are some lines with empty bin locations.",
        ),
        (ERROR_REQUIRED_FIELD, "This field is required"),
        (ERROR_QUANTITY_NEGATIVE, "Quantity to receive can't be negative"),
        (ERROR_NETWORK, "Could not reach the receiving service"),
        (ERROR_VALIDATION, "Please correct the highlighted fields"),
        (ERROR_REQUEST_IN_FLIGHT, "A save is already in progress"),
    ])
});

/// The built-in English text for an id, empty when the id is unknown.
pub fn default_for(id: &str) -> &'static str {
    DEFAULT_MESSAGES.get(id).copied().unwrap_or("")
}

/// Translation lookup used everywhere a message id reaches the user.
///
/// Mirrors the host application's translate contract: every call site passes
/// the id together with an English default, and the catalog falls back to
/// the default when no localized override is loaded.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    overrides: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    /// Loads overrides from a flat JSON object of id to translated string.
    pub fn from_json_str(raw: &str) -> Result<Self, ReceivingError> {
        let overrides: HashMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self { overrides })
    }

    pub fn translate(&self, id: &str, default: &str) -> String {
        self.overrides
            .get(id)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Translation with the built-in English default, for call sites that
    /// only know the id (validation codes in particular).
    pub fn resolve(&self, id: &str) -> String {
        self.translate(id, default_for(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_id_is_unknown() {
        let catalog = MessageCatalog::new();
        assert_eq!(
            catalog.translate(LABEL_RECEIVING_NOW, "Receiving now"),
            "Receiving now"
        );
    }

    #[test]
    fn prefers_loaded_override() {
        let catalog =
            MessageCatalog::from_json_str(r#"{"default.yes.label": "Oui"}"#).expect("valid json");
        assert_eq!(catalog.translate(BUTTON_YES, "Yes"), "Oui");
        assert_eq!(catalog.translate(BUTTON_NO, "No"), "No");
    }

    #[test]
    fn resolve_uses_the_builtin_defaults() {
        let catalog = MessageCatalog::new();
        assert_eq!(
            catalog.resolve(ERROR_QUANTITY_NEGATIVE),
            "Quantity to receive can't be negative"
        );
        assert_eq!(catalog.resolve("no.such.id"), "");
    }
}
