//! Checkout view state machine
//!
//! [`CheckoutFlow`] is a value: [`CheckoutFlow::apply`] consumes the current
//! state and returns the next one, so every transition replaces the snapshot
//! wholesale.
//!
//! ```text
//!             OpenLogin                  SelectPlan / ResumePayment
//!   Login <-------------- Landing ----------------------------------> Payment
//!     |  \     Back         ^  ^               Back                   |    |
//!     |   `-----------------'  `--------------------------------------'    |
//!     |                        Back                                        |
//!     |                         |                   settle(epoch)          |
//!     `-------- GoToDashboard - Success <----------------------------------'
//! ```
//!
//! Every navigation request is accepted; requests without a transition from
//! the current view leave the state unchanged.
//!
//! Success is not a navigation target. Only the session reaches it, through
//! [`CheckoutFlow::settle`], once a submitted payment has settled.
//!
//! `epoch` increases on every view change. A settlement completion carries the
//! epoch it was started in and is ignored once the view has moved on.

use crate::catalog;
use crate::form::PaymentForm;
use crate::types::{Plan, PlanId, ViewState};
use serde::Serialize;

/// Navigation request from any screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Choose a plan on the pricing section
    SelectPlan(PlanId),
    /// Return to checkout for the already selected plan
    ResumePayment,
    /// Open the login screen
    OpenLogin,
    /// Return to the landing page
    Back,
    /// "Go to dashboard" from the success screen
    GoToDashboard,
}

/// Top-level checkout state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutFlow {
    view: ViewState,
    selected_plan: Option<&'static Plan>,
    form: Option<PaymentForm>,
    epoch: u64,
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutFlow {
    /// Initial state: landing page, no plan
    pub fn new() -> Self {
        Self {
            view: ViewState::Landing,
            selected_plan: None,
            form: None,
            epoch: 0,
        }
    }

    /// Active view
    pub fn view(&self) -> ViewState {
        self.view
    }

    /// Selected plan, kept after leaving the checkout
    pub fn selected_plan(&self) -> Option<&'static Plan> {
        self.selected_plan
    }

    /// Checkout form of the selected plan
    pub fn form(&self) -> Option<&PaymentForm> {
        self.form.as_ref()
    }

    /// Mutable checkout form, only while the checkout is on screen
    pub fn form_mut(&mut self) -> Option<&mut PaymentForm> {
        if self.view != ViewState::Payment {
            return None;
        }
        self.form.as_mut()
    }

    /// View generation counter
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Apply a navigation request
    pub fn apply(self, navigation: Navigation) -> Self {
        let from = self.view;
        let next = match (from, navigation) {
            (ViewState::Landing, Navigation::SelectPlan(id)) => match catalog::find(id.as_str()) {
                Some(plan) => self.enter_payment(plan),
                None => {
                    tracing::warn!("Ignoring selection of unknown plan {}", id);
                    self
                }
            },

            (ViewState::Landing, Navigation::ResumePayment) => match self.selected_plan {
                Some(plan) => self.enter_payment(plan),
                None => self,
            },

            (ViewState::Landing | ViewState::Payment, Navigation::OpenLogin) => {
                self.leave_to(ViewState::Login)
            }

            (ViewState::Login | ViewState::Payment | ViewState::Success, Navigation::Back) => {
                self.leave_to(ViewState::Landing)
            }

            (ViewState::Success, Navigation::GoToDashboard) => self.leave_to(ViewState::Login),

            (_, navigation) => {
                tracing::debug!("No transition from {} for {:?}", from, navigation);
                self
            }
        };

        if next.view != from {
            tracing::info!("View {} -> {} (epoch {})", from, next.view, next.epoch);
        }
        next
    }

    /// Move to Success after the settlement started in `epoch` succeeded
    ///
    /// Requires the checkout to be on screen in that epoch with its submitting
    /// gate closed; anything else leaves the state unchanged.
    pub(crate) fn settle(self, epoch: u64) -> Self {
        if self.view != ViewState::Payment || epoch != self.epoch {
            tracing::warn!(
                "Dropping stale settlement (started in epoch {}, now {})",
                epoch,
                self.epoch
            );
            return self;
        }
        if !self.form.as_ref().map_or(false, PaymentForm::is_submitting) {
            tracing::warn!("Dropping settlement without a pending submission");
            return self;
        }

        let from = self.view;
        let mut next = self.leave_to(ViewState::Success);
        next.form = None;
        tracing::info!("View {} -> {} (epoch {})", from, next.view, next.epoch);
        next
    }

    fn enter_payment(mut self, plan: &'static Plan) -> Self {
        let same_plan = self.selected_plan.map(|p| p.id) == Some(plan.id);
        if !same_plan || self.form.is_none() {
            self.form = Some(PaymentForm::new(plan));
        }
        self.selected_plan = Some(plan);
        self.view = ViewState::Payment;
        self.epoch += 1;
        self
    }

    fn leave_to(mut self, view: ViewState) -> Self {
        if self.view == ViewState::Payment {
            if let Some(form) = self.form.as_mut() {
                form.abandon_submission();
                form.set_pix_copied(false);
            }
        }
        self.view = view;
        self.epoch += 1;
        self
    }
}
