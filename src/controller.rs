//! The save/submit state machine for the check step.
//!
//! The controller owns the working form state and the conversation with the
//! receiving API. Rendering concerns stay behind two injected seams: a
//! progress indicator that is shown for every network call and hidden when
//! it settles either way, and a navigator that is handed control after
//! completion or when the user goes back to the edit step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::client::ReceivingApiClient;
use crate::errors::ReceivingError;
use crate::messages::{self, MessageCatalog};
use crate::models::{LocationCapabilities, PartialReceipt, ReceiptStatus, ShipmentStatus};
use crate::state::{self, ReceivingFormState};
use crate::validation::{self, ErrorTree};

/// Where the submission flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Editing,
    Saving,
    AwaitingConfirmation,
    Completed,
}

/// What a `submit` call decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The receipt was finalized and the summary view opened.
    Completed,
    /// Submission paused: some lines have no bin location, so the user must
    /// confirm before the receipt is finalized.
    ConfirmationRequired { title: String, message: String },
}

/// Spinner contract: shown once per network operation, hidden exactly once
/// when the operation settles, successfully or not.
pub trait ProgressIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Navigation away from this step.
pub trait Navigator: Send + Sync {
    /// Opens the shipment summary view for the given reference
    /// (requisition number or shipment id).
    fn open_summary(&self, reference: &str);
    /// Hands the values back to the edit step.
    fn return_to_previous_step(&self, values: PartialReceipt);
}

/// Progress indicator for headless callers.
pub struct NoopProgress;

impl ProgressIndicator for NoopProgress {
    fn show(&self) {}
    fn hide(&self) {}
}

struct ControllerState {
    form: ReceivingFormState,
    pending: Option<PartialReceipt>,
}

/// Releases the in-flight latch when the request settles on any path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct CheckStepController {
    api: ReceivingApiClient,
    shipment_id: String,
    capabilities: LocationCapabilities,
    catalog: Arc<MessageCatalog>,
    progress: Arc<dyn ProgressIndicator>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<ControllerState>,
    in_flight: AtomicBool,
}

impl CheckStepController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: ReceivingApiClient,
        shipment_id: impl Into<String>,
        form: ReceivingFormState,
        capabilities: LocationCapabilities,
        catalog: Arc<MessageCatalog>,
        progress: Arc<dyn ProgressIndicator>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            shipment_id: shipment_id.into(),
            capabilities,
            catalog,
            progress,
            navigator,
            state: RwLock::new(ControllerState {
                form,
                pending: None,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn shipment_id(&self) -> &str {
        &self.shipment_id
    }

    pub fn capabilities(&self) -> LocationCapabilities {
        self.capabilities
    }

    pub async fn form_state(&self) -> ReceivingFormState {
        self.state.read().await.form.clone()
    }

    pub async fn values(&self) -> PartialReceipt {
        self.state.read().await.form.values.clone()
    }

    /// Validation over the current working values.
    pub async fn error_tree(&self) -> ErrorTree {
        validation::validate(&self.state.read().await.form.values)
    }

    pub async fn phase(&self) -> SubmissionPhase {
        if self.in_flight.load(Ordering::SeqCst) {
            return SubmissionPhase::Saving;
        }
        let state = self.state.read().await;
        if state.form.completed {
            SubmissionPhase::Completed
        } else if state.pending.is_some() {
            SubmissionPhase::AwaitingConfirmation
        } else {
            SubmissionPhase::Editing
        }
    }

    /// Whether the mutating controls should render disabled right now:
    /// locked form state, or a request still in flight.
    pub async fn controls_locked(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) || self.state.read().await.form.controls_locked()
    }

    fn locked_error(form: &ReceivingFormState) -> ReceivingError {
        if form.completed {
            ReceivingError::AlreadyCompleted
        } else {
            ReceivingError::NothingToReceive
        }
    }

    fn begin_request(&self) -> Result<InFlightGuard<'_>, ReceivingError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ReceivingError::RequestInFlight);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    /// One guarded round trip: latch the in-flight flag, show the spinner,
    /// persist, hide the spinner. Failures keep local state untouched and
    /// are surfaced to the caller.
    async fn persist(&self, values: &PartialReceipt) -> Result<PartialReceipt, ReceivingError> {
        let _guard = self.begin_request()?;
        self.progress.show();
        let result = self.api.save_step2(&self.shipment_id, values).await;
        self.progress.hide();
        result.map_err(|error| {
            warn!(error = %error, "partial receiving save failed, keeping local state");
            error
        })
    }

    /// Saves the current values and replaces them with the server's
    /// reconciled copy.
    #[instrument(skip(self), fields(shipment_id = %self.shipment_id))]
    pub async fn save(&self) -> Result<(), ReceivingError> {
        let values = {
            let state = self.state.read().await;
            if state.form.controls_locked() {
                return Err(Self::locked_error(&state.form));
            }
            state.form.values.clone()
        };

        let saved = self.persist(&values).await?;
        self.state.write().await.form.values = saved;
        Ok(())
    }

    /// Saves the current values and leaves for the shipment summary. Local
    /// state is not reconciled: the screen is being left anyway.
    #[instrument(skip(self), fields(shipment_id = %self.shipment_id))]
    pub async fn save_and_exit(&self) -> Result<(), ReceivingError> {
        let values = {
            let state = self.state.read().await;
            if state.form.controls_locked() {
                return Err(Self::locked_error(&state.form));
            }
            state.form.values.clone()
        };

        self.persist(&values).await?;
        if let Some(reference) = values.summary_reference() {
            self.navigator.open_summary(reference);
        } else {
            warn!("saved, but the receipt has no reference to open a summary for");
        }
        Ok(())
    }

    /// Persists the given values and returns to the edit step. Stays
    /// available after completion; only an in-flight request blocks it.
    #[instrument(skip(self, values), fields(shipment_id = %self.shipment_id))]
    pub async fn back(&self, values: PartialReceipt) -> Result<(), ReceivingError> {
        self.persist(&values).await?;
        self.navigator.return_to_previous_step(values);
        Ok(())
    }

    /// Submits the checked form. Validation failures and the bin-location
    /// confirmation pause both happen before any network traffic.
    #[instrument(skip(self, values), fields(shipment_id = %self.shipment_id))]
    pub async fn submit(&self, values: PartialReceipt) -> Result<SubmitOutcome, ReceivingError> {
        {
            let state = self.state.read().await;
            if state.form.controls_locked() {
                return Err(Self::locked_error(&state.form));
            }
        }
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(ReceivingError::RequestInFlight);
        }

        let errors = validation::validate(&values);
        if !errors.is_empty() {
            return Err(ReceivingError::InvalidForm(errors));
        }

        let needs_confirmation = self.capabilities.bin_location_support
            && values.shipment_status != ShipmentStatus::Received
            && values.has_unassigned_bin_location();

        if needs_confirmation {
            self.state.write().await.pending = Some(values);
            info!("submission paused for bin location confirmation");
            return Ok(SubmitOutcome::ConfirmationRequired {
                title: self.catalog.resolve(messages::CONFIRM_RECEIVING_TITLE),
                message: self.catalog.resolve(messages::CONFIRM_RECEIVING_MESSAGE),
            });
        }

        self.finalize(values).await?;
        Ok(SubmitOutcome::Completed)
    }

    /// Proceeds with the submission parked at the confirmation pause.
    #[instrument(skip(self), fields(shipment_id = %self.shipment_id))]
    pub async fn confirm_pending(&self) -> Result<(), ReceivingError> {
        let values = self
            .state
            .write()
            .await
            .pending
            .take()
            .ok_or(ReceivingError::NothingPending)?;
        self.finalize(values).await
    }

    /// Drops the parked submission and returns to editing.
    pub async fn decline_pending(&self) -> Result<(), ReceivingError> {
        if self.state.write().await.pending.take().is_none() {
            return Err(ReceivingError::NothingPending);
        }
        info!("submission declined at bin location confirmation");
        Ok(())
    }

    /// Marks the payload completed, persists it, reconciles local state,
    /// and opens the summary view.
    async fn finalize(&self, mut values: PartialReceipt) -> Result<(), ReceivingError> {
        values.receipt_status = Some(ReceiptStatus::Completed);
        let reference = values.summary_reference().map(str::to_string);

        let saved = self.persist(&values).await?;
        {
            let mut state = self.state.write().await;
            state.form.values = saved;
            state.form.completed = true;
        }
        info!("partial receiving completed");

        match reference {
            Some(reference) => self.navigator.open_summary(&reference),
            None => warn!("receipt completed without a reference to open a summary for"),
        }
        Ok(())
    }

    /// Flags every line's remainder for cancellation, in place of checking
    /// the rows one by one.
    #[instrument(skip(self), fields(shipment_id = %self.shipment_id))]
    pub async fn cancel_all_remaining(&self) -> Result<(), ReceivingError> {
        if !self.capabilities.partial_receiving_support {
            return Err(ReceivingError::PartialReceivingUnsupported);
        }
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(ReceivingError::RequestInFlight);
        }
        let mut state = self.state.write().await;
        if state.form.controls_locked() {
            return Err(Self::locked_error(&state.form));
        }
        state.form.values = state::cancel_all_remaining(&state.form.values);
        Ok(())
    }

    /// Sets one row's cancel flag through the explicit state handle.
    pub async fn set_cancel_remaining(
        &self,
        container_index: usize,
        item_index: usize,
        cancel: bool,
    ) -> Result<(), ReceivingError> {
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(ReceivingError::RequestInFlight);
        }
        let mut state = self.state.write().await;
        if state.form.controls_locked() {
            return Err(Self::locked_error(&state.form));
        }
        state.form.values =
            state::with_cancel_remaining(&state.form.values, container_index, item_index, cancel)
                .ok_or(ReceivingError::UnknownItemPosition {
                    container: container_index,
                    item: item_index,
                })?;
        Ok(())
    }

    /// Sets the delivery date through the explicit state handle.
    pub async fn set_date_delivered(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<(), ReceivingError> {
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(ReceivingError::RequestInFlight);
        }
        let mut state = self.state.write().await;
        if state.form.controls_locked() {
            return Err(Self::locked_error(&state.form));
        }
        state.form.values = state::with_date_delivered(&state.form.values, date);
        Ok(())
    }
}
