//! Session integration tests
//!
//! Drive a full visitor session through the actor handle with paused time:
//! 1. Plan selection and navigation
//! 2. Card submit with batch validation
//! 3. Simulated settlement and the submitting gate
//! 4. PIX confirmation and the "copied" flag timer
//! 5. Cancellation of timed work when the checkout is left

use async_trait::async_trait;
use checkout_core::{
    pix, spawn_checkout_session, Config, FieldKind, FixedClock, Metrics, Navigation,
    PaymentMethod, SessionHandle, SettlementError, SettlementGateway, SettlementReceipt,
    SettlementRequest, SimulatedGateway, SubmitDecision, ViewState,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Simulated gateway that counts calls
struct CountingGateway {
    inner: SimulatedGateway,
    calls: AtomicUsize,
}

#[async_trait]
impl SettlementGateway for CountingGateway {
    async fn initiate(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.initiate(request).await
    }
}

/// Gateway that refuses every payment
struct DecliningGateway;

#[async_trait]
impl SettlementGateway for DecliningGateway {
    async fn initiate(
        &self,
        _request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError> {
        Err(SettlementError::Declined("card not authorized".to_string()))
    }
}

struct Harness {
    session: SessionHandle,
    gateway: Arc<CountingGateway>,
    metrics: Metrics,
}

fn march_2024() -> Arc<FixedClock> {
    Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()))
}

fn harness() -> Harness {
    let config = Config::default();
    let gateway = Arc::new(CountingGateway {
        inner: SimulatedGateway::new(&config.settlement),
        calls: AtomicUsize::new(0),
    });
    let metrics = Metrics::new().unwrap();
    let session = spawn_checkout_session(config, gateway.clone(), march_2024(), metrics.clone());

    Harness {
        session,
        gateway,
        metrics,
    }
}

async fn fill_valid_card(session: &SessionHandle) {
    session.change_field(FieldKind::HolderName, "Ana Souza").await.unwrap();
    session.change_field(FieldKind::TaxId, "12345678901").await.unwrap();
    session.change_field(FieldKind::CardNumber, "4111111111111111").await.unwrap();
    session.change_field(FieldKind::Expiry, "1226").await.unwrap();
    session.change_field(FieldKind::Cvv, "123").await.unwrap();
}

async fn wait_for_view(session: &SessionHandle, view: ViewState) {
    let mut updates = session.subscribe();
    tokio::time::timeout(Duration::from_secs(30), updates.wait_for(|s| s.view() == view))
        .await
        .expect("timed out waiting for view")
        .expect("session closed");
}

#[tokio::test(start_paused = true)]
async fn test_select_creator_then_back_and_resume() {
    let h = harness();

    let snapshot = h.session.select_plan("creator").await.unwrap();
    assert_eq!(snapshot.view(), ViewState::Payment);
    assert_eq!(snapshot.selected_plan().unwrap().id, "creator");

    h.session.change_field(FieldKind::HolderName, "Ana Souza").await.unwrap();
    h.session.navigate(Navigation::Back).await.unwrap();
    let snapshot = h.session.navigate(Navigation::ResumePayment).await.unwrap();

    assert_eq!(snapshot.view(), ViewState::Payment);
    assert_eq!(snapshot.selected_plan().unwrap().id, "creator");
    assert_eq!(snapshot.form().unwrap().values().holder_name, "Ana Souza");
    assert_eq!(
        h.metrics.plan_selections.with_label_values(&["creator"]).get(),
        1
    );

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_empty_card_submit_reports_five_errors() {
    let h = harness();
    h.session.select_plan("creator").await.unwrap();

    let decision = h.session.submit().await.unwrap();
    match decision {
        Some(SubmitDecision::Rejected(errors)) => assert_eq!(errors.len(), 5),
        other => panic!("expected rejection, got {:?}", other),
    }

    let snapshot = h.session.snapshot();
    let form = snapshot.form().unwrap();
    assert_eq!(form.errors().len(), 5);
    assert!(!form.is_submitting());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.session.snapshot().view(), ViewState::Payment);

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_blur_then_change_clears_error() {
    let h = harness();
    h.session.select_plan("start").await.unwrap();

    h.session.change_field(FieldKind::Expiry, "0124").await.unwrap();
    let snapshot = h.session.blur_field(FieldKind::Expiry).await.unwrap();
    assert_eq!(snapshot.form().unwrap().error_message(FieldKind::Expiry), "card expired");

    let snapshot = h.session.change_field(FieldKind::Expiry, "01").await.unwrap();
    assert_eq!(snapshot.form().unwrap().error(FieldKind::Expiry), None);

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_card_settlement_reaches_success_once() {
    let h = harness();
    h.session.select_plan("creator").await.unwrap();
    fill_valid_card(&h.session).await;

    let started = Instant::now();
    let first = h.session.submit().await.unwrap();
    assert!(matches!(first, Some(SubmitDecision::Proceed(_))));
    assert!(h.session.snapshot().form().unwrap().is_submitting());

    // Repeated click while pending
    let second = h.session.submit().await.unwrap();
    assert_eq!(second, Some(SubmitDecision::AlreadySubmitting));

    wait_for_view(&h.session, ViewState::Success).await;
    assert!(started.elapsed() >= Duration::from_millis(2500));
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.metrics.settlements.with_label_values(&["card", "success"]).get(),
        1
    );

    let snapshot = h.session.navigate(Navigation::GoToDashboard).await.unwrap();
    assert_eq!(snapshot.view(), ViewState::Login);

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pix_confirmation_skips_validation() {
    let h = harness();
    h.session.select_plan("premium").await.unwrap();
    h.session.change_field(FieldKind::CardNumber, "4111").await.unwrap();

    let decision = h.session.confirm_pix_paid().await.unwrap();
    match decision {
        Some(SubmitDecision::Proceed(request)) => {
            assert_eq!(request.method, PaymentMethod::Pix);
            assert!(request.card.is_none());
        }
        other => panic!("expected proceed, got {:?}", other),
    }

    wait_for_view(&h.session, ViewState::Success).await;
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 1);

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_confirm_pix_does_not_switch_pending_card_payment() {
    let h = harness();
    h.session.select_plan("creator").await.unwrap();
    fill_valid_card(&h.session).await;

    let first = h.session.submit().await.unwrap();
    assert!(matches!(first, Some(SubmitDecision::Proceed(_))));

    let second = h.session.confirm_pix_paid().await.unwrap();
    assert_eq!(second, Some(SubmitDecision::AlreadySubmitting));
    assert_eq!(
        h.session.snapshot().form().unwrap().method(),
        PaymentMethod::Card
    );

    wait_for_view(&h.session, ViewState::Success).await;
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.metrics.submissions.with_label_values(&["proceed"]).get(),
        1
    );

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_checkout_without_submit_stays_on_payment() {
    let h = harness();
    let snapshot = h.session.select_plan("creator").await.unwrap();
    let epoch = snapshot.epoch();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.view(), ViewState::Payment);
    assert_eq!(snapshot.epoch(), epoch);
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 0);

    let snapshot = h.session.navigate(Navigation::GoToDashboard).await.unwrap();
    assert_eq!(snapshot.view(), ViewState::Payment);

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_leaving_checkout_cancels_settlement() {
    let h = harness();
    h.session.select_plan("creator").await.unwrap();
    fill_valid_card(&h.session).await;
    h.session.submit().await.unwrap();

    h.session.navigate(Navigation::Back).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = h.session.navigate(Navigation::ResumePayment).await.unwrap();
    assert_eq!(snapshot.view(), ViewState::Payment);
    assert!(!snapshot.form().unwrap().is_submitting());
    assert_eq!(snapshot.form().unwrap().values().cvv, "123");
    assert_eq!(
        h.metrics.settlements.with_label_values(&["card", "success"]).get(),
        0
    );

    // The checkout can be submitted again
    let decision = h.session.submit().await.unwrap();
    assert!(matches!(decision, Some(SubmitDecision::Proceed(_))));
    wait_for_view(&h.session, ViewState::Success).await;
    assert_eq!(
        h.metrics.settlements.with_label_values(&["card", "success"]).get(),
        1
    );

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_copy_flag_resets_after_feedback_delay() {
    let h = harness();
    h.session.select_plan("creator").await.unwrap();
    h.session.select_method(PaymentMethod::Pix).await.unwrap();

    let started = Instant::now();
    let charge = h.session.copy_pix().await.unwrap().unwrap();
    assert!(pix::verify_payload(&charge.payload));
    assert!(charge.payload.contains("540597.00"));
    assert!(h.session.snapshot().form().unwrap().pix_copied());

    let mut updates = h.session.subscribe();
    updates
        .wait_for(|s| s.form().map_or(false, |f| !f.pix_copied()))
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2000));

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_leaving_checkout_clears_copy_flag() {
    let h = harness();
    h.session.select_plan("creator").await.unwrap();
    h.session.copy_pix().await.unwrap();

    h.session.navigate(Navigation::Back).await.unwrap();
    let snapshot = h.session.navigate(Navigation::ResumePayment).await.unwrap();
    assert!(!snapshot.form().unwrap().pix_copied());

    // Copying again starts a fresh timer
    h.session.copy_pix().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(h.session.snapshot().form().unwrap().pix_copied());

    h.session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_declined_settlement_keeps_form() {
    let config = Config::default();
    let session = spawn_checkout_session(
        config,
        Arc::new(DecliningGateway),
        march_2024(),
        Metrics::new().unwrap(),
    );
    session.select_plan("start").await.unwrap();
    fill_valid_card(&session).await;
    session.submit().await.unwrap();

    let mut updates = session.subscribe();
    let snapshot = updates
        .wait_for(|s| s.form().map_or(false, |f| f.settlement_error().is_some()))
        .await
        .unwrap()
        .clone();

    assert_eq!(snapshot.view(), ViewState::Payment);
    let form = snapshot.form().unwrap();
    assert!(!form.is_submitting());
    assert!(form.errors().is_empty());
    assert_eq!(form.values().card_number, "4111 1111 1111 1111");
    assert!(matches!(
        form.settlement_error(),
        Some(SettlementError::Declined(_))
    ));

    session.shutdown().await.unwrap();
}
