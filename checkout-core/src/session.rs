//! Visitor session actor
//!
//! One actor task owns the [`CheckoutFlow`] of a visitor and applies every
//! intent in mailbox order, so there is a single writer per session:
//!
//! ```text
//!   SessionHandle (Clone) --- mpsc ---> SessionActor ---> watch<Arc<CheckoutFlow>>
//!                                         |    ^
//!                          spawn + abort  |    |  SettlementFinished / ResetCopied
//!                                         v    |
//!                               settlement task, copy-reset task
//! ```
//!
//! Timed work (the gateway call, the "copied" flag reset) runs in tasks owned
//! by the actor. They are aborted as soon as the view changes, and their
//! completions carry the epoch or token they were started with, so a late
//! message can never touch a view that has since been left.

use crate::clock::Clock;
use crate::config::Config;
use crate::flow::{CheckoutFlow, Navigation};
use crate::form::SubmitDecision;
use crate::gateway::{SettlementError, SettlementGateway, SettlementReceipt};
use crate::metrics::Metrics;
use crate::pix::PixCharge;
use crate::types::{FieldKind, PaymentMethod, PlanId, SettlementRequest};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Shared, immutable checkout snapshot
pub type Snapshot = Arc<CheckoutFlow>;

/// Message sent to the session actor
pub enum SessionMessage {
    /// Apply a navigation request
    Navigate {
        navigation: Navigation,
        response: oneshot::Sender<Snapshot>,
    },

    /// Keystroke in a card field
    ChangeField {
        field: FieldKind,
        raw: String,
        response: oneshot::Sender<Snapshot>,
    },

    /// Card field lost focus
    BlurField {
        field: FieldKind,
        response: oneshot::Sender<Snapshot>,
    },

    /// Switch payment method
    SelectMethod {
        method: PaymentMethod,
        response: oneshot::Sender<Snapshot>,
    },

    /// Submit the checkout with the current method
    Submit {
        response: oneshot::Sender<Option<SubmitDecision>>,
    },

    /// Switch to PIX and submit in one step ("I have paid")
    ConfirmPix {
        response: oneshot::Sender<Option<SubmitDecision>>,
    },

    /// PIX charge of the selected plan
    PixCharge {
        response: oneshot::Sender<Result<Option<PixCharge>>>,
    },

    /// Copy the PIX code and raise the "copied" flag
    CopyPix {
        response: oneshot::Sender<Result<Option<PixCharge>>>,
    },

    /// Gateway call finished
    SettlementFinished {
        epoch: u64,
        method: PaymentMethod,
        result: std::result::Result<SettlementReceipt, SettlementError>,
        elapsed: Duration,
    },

    /// "Copied" flag timer elapsed
    ResetCopied { token: u64 },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns one visitor's checkout state
pub struct SessionActor {
    /// Current checkout state
    flow: CheckoutFlow,

    /// Configuration
    config: Config,

    /// Settlement boundary
    gateway: Arc<dyn SettlementGateway>,

    /// Date source for validation
    clock: Arc<dyn Clock>,

    /// Funnel metrics
    metrics: Metrics,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<SessionMessage>,

    /// Sender handed to spawned tasks; weak so dropped handles close the mailbox
    loopback: mpsc::WeakSender<SessionMessage>,

    /// Snapshot publisher
    snapshots: watch::Sender<Snapshot>,

    /// Pending gateway call
    settlement_task: Option<JoinHandle<()>>,

    /// Pending "copied" flag reset
    copy_reset_task: Option<JoinHandle<()>>,

    /// Identifies the latest copy
    copy_token: u64,
}

impl SessionActor {
    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                SessionMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }

        self.cancel_view_tasks();
        tracing::debug!("Checkout session stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: SessionMessage) {
        match msg {
            SessionMessage::Navigate {
                navigation,
                response,
            } => {
                self.navigate(navigation);
                let _ = response.send(self.publish());
            }

            SessionMessage::ChangeField {
                field,
                raw,
                response,
            } => {
                if let Some(form) = self.flow.form_mut() {
                    form.on_change(field, &raw);
                }
                let _ = response.send(self.publish());
            }

            SessionMessage::BlurField { field, response } => {
                let today = self.clock.today();
                if let Some(form) = self.flow.form_mut() {
                    form.on_blur(field, today);
                    if form.error(field).is_some() {
                        self.metrics.record_field_error(field);
                    }
                }
                let _ = response.send(self.publish());
            }

            SessionMessage::SelectMethod { method, response } => {
                if let Some(form) = self.flow.form_mut() {
                    form.select_method(method);
                }
                let _ = response.send(self.publish());
            }

            SessionMessage::Submit { response } => {
                let decision = self.submit();
                self.publish();
                let _ = response.send(decision);
            }

            SessionMessage::ConfirmPix { response } => {
                if let Some(form) = self.flow.form_mut() {
                    if !form.is_submitting() {
                        form.select_method(PaymentMethod::Pix);
                    }
                }
                let decision = self.submit();
                self.publish();
                let _ = response.send(decision);
            }

            SessionMessage::PixCharge { response } => {
                let charge = self
                    .flow
                    .form()
                    .map(|form| PixCharge::for_plan(&self.config.pix, form.plan()))
                    .transpose()
                    .map_err(Error::from);
                let _ = response.send(charge);
            }

            SessionMessage::CopyPix { response } => {
                let charge = self.copy_pix();
                self.publish();
                let _ = response.send(charge);
            }

            SessionMessage::SettlementFinished {
                epoch,
                method,
                result,
                elapsed,
            } => {
                self.settlement_finished(epoch, method, result, elapsed);
                self.publish();
            }

            SessionMessage::ResetCopied { token } => {
                if token == self.copy_token {
                    self.copy_reset_task = None;
                    if let Some(form) = self.flow.form_mut() {
                        form.set_pix_copied(false);
                    }
                    self.publish();
                }
            }

            SessionMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    fn navigate(&mut self, navigation: Navigation) {
        let before = self.flow.epoch();
        let selected = match &navigation {
            Navigation::SelectPlan(id) => Some(id.clone()),
            _ => None,
        };

        self.flow = std::mem::take(&mut self.flow).apply(navigation);

        if self.flow.epoch() != before {
            self.cancel_view_tasks();
            if let Some(id) = selected {
                self.metrics.record_plan_selected(id.as_str());
            }
        }
    }

    fn submit(&mut self) -> Option<SubmitDecision> {
        let today = self.clock.today();
        let epoch = self.flow.epoch();
        let decision = self.flow.form_mut()?.begin_submit(today);

        match &decision {
            SubmitDecision::Proceed(request) => {
                tracing::info!(
                    "Submitting {} payment of {} for plan {}",
                    request.method,
                    request.amount,
                    request.plan_id
                );
                if let Some(last4) = request.card.as_ref().and_then(|c| c.card_last4()) {
                    tracing::debug!("Card ending in {}", last4);
                }
                self.metrics.record_submission("proceed");
                self.spawn_settlement(request.clone(), epoch);
            }
            SubmitDecision::Rejected(errors) => {
                tracing::info!("Submission rejected: {} field error(s)", errors.len());
                self.metrics.record_submission("rejected");
                for field in errors.keys() {
                    self.metrics.record_field_error(*field);
                }
            }
            SubmitDecision::AlreadySubmitting => {
                tracing::debug!("Ignoring submit while a settlement is pending");
                self.metrics.record_submission("duplicate");
            }
        }

        Some(decision)
    }

    fn spawn_settlement(&mut self, request: SettlementRequest, epoch: u64) {
        let gateway = Arc::clone(&self.gateway);
        let loopback = self.loopback.clone();
        let method = request.method;

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let result = gateway.initiate(&request).await;
            if let Some(sender) = loopback.upgrade() {
                let _ = sender
                    .send(SessionMessage::SettlementFinished {
                        epoch,
                        method,
                        result,
                        elapsed: started.elapsed(),
                    })
                    .await;
            }
        });

        if let Some(previous) = self.settlement_task.replace(task) {
            previous.abort();
        }
    }

    fn settlement_finished(
        &mut self,
        epoch: u64,
        method: PaymentMethod,
        result: std::result::Result<SettlementReceipt, SettlementError>,
        elapsed: Duration,
    ) {
        self.settlement_task = None;
        self.metrics
            .record_settlement(method, result.is_ok(), elapsed.as_secs_f64());

        if epoch != self.flow.epoch() {
            tracing::warn!("Discarding settlement from epoch {}", epoch);
            return;
        }

        match &result {
            Ok(receipt) => {
                tracing::info!("Payment settled: {}", receipt.reference);
                self.flow = std::mem::take(&mut self.flow).settle(epoch);
                if self.flow.epoch() != epoch {
                    self.cancel_view_tasks();
                }
            }
            Err(e) => {
                tracing::warn!("Payment failed: {}", e);
                if let Some(form) = self.flow.form_mut() {
                    form.finish_settlement(&result);
                }
            }
        }
    }

    fn copy_pix(&mut self) -> Result<Option<PixCharge>> {
        let form = match self.flow.form_mut() {
            Some(form) => form,
            None => return Ok(None),
        };
        let charge = PixCharge::for_plan(&self.config.pix, form.plan())?;
        form.set_pix_copied(true);

        self.copy_token += 1;
        let token = self.copy_token;
        let loopback = self.loopback.clone();
        let feedback = Duration::from_millis(self.config.pix.copy_feedback_ms);

        let task = tokio::spawn(async move {
            tokio::time::sleep(feedback).await;
            if let Some(sender) = loopback.upgrade() {
                let _ = sender.send(SessionMessage::ResetCopied { token }).await;
            }
        });

        if let Some(previous) = self.copy_reset_task.replace(task) {
            previous.abort();
        }

        Ok(Some(charge))
    }

    /// Abort timed work belonging to the view being left
    fn cancel_view_tasks(&mut self) {
        if let Some(task) = self.settlement_task.take() {
            tracing::debug!("Cancelling pending settlement");
            task.abort();
        }
        if let Some(task) = self.copy_reset_task.take() {
            task.abort();
        }
    }

    fn publish(&self) -> Snapshot {
        let snapshot = Arc::new(self.flow.clone());
        self.snapshots.send_replace(Arc::clone(&snapshot));
        snapshot
    }
}

/// Handle for sending intents to a session
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    snapshots: watch::Receiver<Snapshot>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| Error::SessionClosed("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::SessionClosed("Response channel closed".to_string()))
    }

    /// Apply a navigation request
    pub async fn navigate(&self, navigation: Navigation) -> Result<Snapshot> {
        self.request(|response| SessionMessage::Navigate {
            navigation,
            response,
        })
        .await
    }

    /// Choose a plan and open its checkout
    pub async fn select_plan(&self, plan_id: impl Into<String>) -> Result<Snapshot> {
        self.navigate(Navigation::SelectPlan(PlanId::new(plan_id))).await
    }

    /// Keystroke in a card field
    pub async fn change_field(&self, field: FieldKind, raw: impl Into<String>) -> Result<Snapshot> {
        let raw = raw.into();
        self.request(|response| SessionMessage::ChangeField {
            field,
            raw,
            response,
        })
        .await
    }

    /// Card field lost focus
    pub async fn blur_field(&self, field: FieldKind) -> Result<Snapshot> {
        self.request(|response| SessionMessage::BlurField { field, response }).await
    }

    /// Switch payment method
    pub async fn select_method(&self, method: PaymentMethod) -> Result<Snapshot> {
        self.request(|response| SessionMessage::SelectMethod { method, response }).await
    }

    /// Submit the checkout; `None` when no checkout is on screen
    pub async fn submit(&self) -> Result<Option<SubmitDecision>> {
        self.request(|response| SessionMessage::Submit { response }).await
    }

    /// "I have paid" on the PIX tab
    pub async fn confirm_pix_paid(&self) -> Result<Option<SubmitDecision>> {
        self.request(|response| SessionMessage::ConfirmPix { response }).await
    }

    /// PIX charge of the selected plan
    pub async fn pix_charge(&self) -> Result<Option<PixCharge>> {
        self.request(|response| SessionMessage::PixCharge { response }).await?
    }

    /// Copy the PIX code; the caller writes `payload` to the clipboard
    pub async fn copy_pix(&self) -> Result<Option<PixCharge>> {
        self.request(|response| SessionMessage::CopyPix { response }).await?
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Receive every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SessionMessage::Shutdown)
            .await
            .map_err(|_| Error::SessionClosed("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn a session actor
pub fn spawn_checkout_session(
    config: Config,
    gateway: Arc<dyn SettlementGateway>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(config.session.mailbox_capacity.max(1));
    let initial: Snapshot = Arc::new(CheckoutFlow::new());
    let (snapshot_tx, snapshot_rx) = watch::channel(initial);

    let actor = SessionActor {
        flow: CheckoutFlow::new(),
        config,
        gateway,
        clock,
        metrics,
        mailbox: rx,
        loopback: tx.downgrade(),
        snapshots: snapshot_tx,
        settlement_task: None,
        copy_reset_task: None,
        copy_token: 0,
    };

    tokio::spawn(async move {
        actor.run().await;
    });

    SessionHandle {
        sender: tx,
        snapshots: snapshot_rx,
    }
}
