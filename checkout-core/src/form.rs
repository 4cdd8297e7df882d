//! Payment form controller
//!
//! Holds the card field values, their inline errors, the chosen payment
//! method and the `submitting` gate. Values are masked on every change;
//! errors are only computed on blur and on submit, and a change always clears
//! the error of the edited field.
//!
//! Submission is split in two halves so an owner can run the gateway call
//! concurrently: [`PaymentForm::begin_submit`] validates and closes the gate,
//! [`PaymentForm::finish_settlement`] reopens it with the outcome.
//! [`PaymentForm::submit`] chains both around a gateway call.

use crate::formatter;
use crate::gateway::{SettlementError, SettlementGateway, SettlementReceipt};
use crate::types::{CardFormData, FieldKind, PaymentMethod, Plan, SettlementRequest};
use crate::validator::{self, FieldError, FieldErrors};
use chrono::NaiveDate;
use serde::Serialize;

/// Result of a submit attempt before settlement
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitDecision {
    /// A settlement is already pending; nothing was done
    AlreadySubmitting,
    /// Card fields failed validation; every failing field is reported
    Rejected(FieldErrors),
    /// Gate closed; the request must be handed to the gateway
    Proceed(SettlementRequest),
}

/// Result of a complete submit
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Gateway confirmed the payment
    Settled(SettlementReceipt),
    /// Gateway refused the payment
    Failed(SettlementError),
    /// Card fields failed validation
    Rejected(FieldErrors),
    /// A settlement is already pending
    AlreadySubmitting,
}

/// Checkout form state for one selected plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentForm {
    plan: &'static Plan,
    method: PaymentMethod,
    values: CardFormData,
    errors: FieldErrors,
    submitting: bool,
    settlement_error: Option<SettlementError>,
    pix_copied: bool,
}

impl PaymentForm {
    /// Create an empty form for a plan
    pub fn new(plan: &'static Plan) -> Self {
        Self {
            plan,
            method: PaymentMethod::default(),
            values: CardFormData::default(),
            errors: FieldErrors::new(),
            submitting: false,
            settlement_error: None,
            pix_copied: false,
        }
    }

    /// Plan being purchased
    pub fn plan(&self) -> &'static Plan {
        self.plan
    }

    /// Selected payment method
    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    /// Current (masked) field values
    pub fn values(&self) -> &CardFormData {
        &self.values
    }

    /// Current inline errors
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Inline error of a field
    pub fn error(&self, field: FieldKind) -> Option<FieldError> {
        self.errors.get(&field).copied()
    }

    /// Inline error text of a field; empty when the field is not in error
    pub fn error_message(&self, field: FieldKind) -> String {
        self.error(field).map(|e| e.to_string()).unwrap_or_default()
    }

    /// Whether a settlement is pending
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Last whole-form settlement failure
    pub fn settlement_error(&self) -> Option<&SettlementError> {
        self.settlement_error.as_ref()
    }

    /// Whether the PIX code was copied recently
    pub fn pix_copied(&self) -> bool {
        self.pix_copied
    }

    /// Whether a submit right now would reach the gateway
    pub fn is_ready(&self, today: NaiveDate) -> bool {
        if self.submitting {
            return false;
        }
        match self.method {
            PaymentMethod::Pix => true,
            PaymentMethod::Card => validator::validate_all(&self.values, today).is_empty(),
        }
    }

    /// Store a keystroke: mask it and clear the field's error
    pub fn on_change(&mut self, field: FieldKind, raw: &str) {
        let value = formatter::format(field, raw);
        self.values.set(field, value);
        self.errors.remove(&field);
        self.settlement_error = None;
    }

    /// Validate a field when it loses focus
    pub fn on_blur(&mut self, field: FieldKind, today: NaiveDate) {
        match validator::validate(field, self.values.get(field), today) {
            Some(error) => {
                self.errors.insert(field, error);
            }
            None => {
                self.errors.remove(&field);
            }
        }
    }

    /// Switch payment method; entered card values are kept
    pub fn select_method(&mut self, method: PaymentMethod) {
        if self.method != method {
            tracing::debug!("Payment method changed: {} -> {}", self.method, method);
        }
        self.method = method;
    }

    /// Set or clear the "copied" feedback flag
    pub fn set_pix_copied(&mut self, copied: bool) {
        self.pix_copied = copied;
    }

    /// Validate (card only) and close the submitting gate
    pub fn begin_submit(&mut self, today: NaiveDate) -> SubmitDecision {
        if self.submitting {
            return SubmitDecision::AlreadySubmitting;
        }

        let card = match self.method {
            PaymentMethod::Card => {
                let errors = validator::validate_all(&self.values, today);
                if !errors.is_empty() {
                    self.errors = errors.clone();
                    return SubmitDecision::Rejected(errors);
                }
                self.errors.clear();
                Some(self.values.clone())
            }
            PaymentMethod::Pix => None,
        };

        self.submitting = true;
        self.settlement_error = None;

        SubmitDecision::Proceed(SettlementRequest {
            plan_id: self.plan.plan_id(),
            amount: self.plan.monthly_price,
            method: self.method,
            card,
        })
    }

    /// Reopen the gate with the gateway outcome; values are never touched
    pub fn finish_settlement(&mut self, result: &Result<SettlementReceipt, SettlementError>) {
        self.submitting = false;
        self.settlement_error = result.as_ref().err().cloned();
    }

    /// Reopen the gate without an outcome (settlement abandoned)
    pub fn abandon_submission(&mut self) {
        self.submitting = false;
    }

    /// Validate, settle through `gateway` and record the outcome
    pub async fn submit(
        &mut self,
        gateway: &dyn SettlementGateway,
        today: NaiveDate,
    ) -> SubmitOutcome {
        let request = match self.begin_submit(today) {
            SubmitDecision::Proceed(request) => request,
            SubmitDecision::Rejected(errors) => return SubmitOutcome::Rejected(errors),
            SubmitDecision::AlreadySubmitting => return SubmitOutcome::AlreadySubmitting,
        };

        let result = gateway.initiate(&request).await;
        self.finish_settlement(&result);

        match result {
            Ok(receipt) => SubmitOutcome::Settled(receipt),
            Err(error) => SubmitOutcome::Failed(error),
        }
    }
}
