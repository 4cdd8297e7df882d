//! Checkout Core
//!
//! View state machine and card-form engine behind the sign-up funnel:
//! landing page, plan selection, card or PIX checkout, success screen.
//!
//! # Architecture
//!
//! - **Formatter**: masks raw keystrokes per field (card number, expiry,
//!   CVV, CPF)
//! - **Validator**: classifies masked values into valid or a field error
//! - **PaymentForm**: field values, inline errors and the submitting gate
//! - **CheckoutFlow**: landing / login / payment / success plus the
//!   selected plan, replaced wholesale on every transition
//! - **SettlementGateway**: async settlement boundary, simulated by default
//! - **Session**: single-writer actor owning one visitor's flow and its
//!   timed tasks
//!
//! # Example
//!
//! ```no_run
//! use checkout_core::{
//!     spawn_checkout_session, Config, FieldKind, Metrics, SimulatedGateway, SystemClock,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> checkout_core::Result<()> {
//!     let config = Config::default();
//!     let gateway = Arc::new(SimulatedGateway::new(&config.settlement));
//!     let session = spawn_checkout_session(config, gateway, Arc::new(SystemClock), Metrics::new()?);
//!
//!     session.select_plan("creator").await?;
//!     session.change_field(FieldKind::CardNumber, "4111111111111111").await?;
//!     let decision = session.submit().await?;
//!     println!("{:?}", decision);
//!
//!     session.shutdown().await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod flow;
pub mod form;
pub mod formatter;
pub mod gateway;
pub mod metrics;
pub mod pix;
pub mod session;
pub mod types;
pub mod validator;

// Re-exports
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use flow::{CheckoutFlow, Navigation};
pub use form::{PaymentForm, SubmitDecision, SubmitOutcome};
pub use gateway::{SettlementError, SettlementGateway, SettlementReceipt, SimulatedGateway};
pub use metrics::Metrics;
pub use pix::{PixCharge, PixError};
pub use session::{spawn_checkout_session, SessionHandle, Snapshot};
pub use types::*;
pub use validator::{FieldError, FieldErrors};
