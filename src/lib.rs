//! Client-side workflow engine for the check step of partial receiving.
//!
//! The crate owns everything the check screen of the two-step receiving
//! wizard needs apart from pixels: the typed form tree ([`models`]), the
//! declarative field schema a renderer iterates over ([`schema`]), the pure
//! validation pass ([`validation`]), immutable form-state updates and the
//! remainder-cancellation operator ([`state`]), the flatten/expand wire
//! codec ([`wire`]), the HTTP client for the partial-receiving endpoint
//! ([`client`]), and the save/submit state machine ([`controller`]).
//!
//! [`mock`] carries an in-memory reference implementation of the backend
//! contract for demos and integration tests.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod messages;
pub mod mock;
pub mod models;
pub mod schema;
pub mod state;
pub mod validation;
pub mod wire;

/// Commonly used types, for callers that embed the whole workflow.
pub mod prelude {
    pub use crate::client::ReceivingApiClient;
    pub use crate::controller::{
        CheckStepController, Navigator, NoopProgress, ProgressIndicator, SubmissionPhase,
        SubmitOutcome,
    };
    pub use crate::errors::ReceivingError;
    pub use crate::messages::MessageCatalog;
    pub use crate::models::{
        Container, EntityRef, LocationCapabilities, PartialReceipt, Product, ReceiptStatus,
        ShipmentItem, ShipmentStatus,
    };
    pub use crate::state::ReceivingFormState;
    pub use crate::validation::{validate, ErrorTree};
}
