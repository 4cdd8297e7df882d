//! Scripted walkthrough of the checkout funnel
//!
//! Usage: `checkout-demo [config.toml]` (falls back to `CHECKOUT_*` env vars)

use anyhow::Context;
use checkout_core::{
    spawn_checkout_session, Config, FieldKind, Metrics, Navigation, SimulatedGateway,
    SubmitDecision, SystemClock, ViewState,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::from_env()?,
    };

    let metrics = Metrics::new()?;
    let gateway = Arc::new(SimulatedGateway::new(&config.settlement));
    let session = spawn_checkout_session(config, gateway, Arc::new(SystemClock), metrics);
    let mut updates = session.subscribe();

    tracing::info!("Card checkout for plan creator");
    session.select_plan("creator").await?;

    // Empty submit surfaces every field error at once
    if let Some(SubmitDecision::Rejected(errors)) = session.submit().await? {
        for (field, error) in &errors {
            tracing::info!("  {}: {}", field, error);
        }
    }

    let next_year = chrono::Datelike::year(&chrono::Local::now()) % 100 + 1;
    let entries = [
        (FieldKind::HolderName, "Ana Souza".to_string()),
        (FieldKind::TaxId, "12345678901".to_string()),
        (FieldKind::CardNumber, "4111111111111111".to_string()),
        (FieldKind::Expiry, format!("12{:02}", next_year)),
        (FieldKind::Cvv, "123".to_string()),
    ];
    for (field, raw) in entries {
        let snapshot = session.change_field(field, raw).await?;
        session.blur_field(field).await?;
        if let Some(form) = snapshot.form() {
            tracing::info!("  {} = {:?}", field, form.values().get(field));
        }
    }

    session.submit().await?;
    updates
        .wait_for(|s| s.view() == ViewState::Success)
        .await
        .context("session stopped before settlement")?;
    println!("{}", serde_json::to_string_pretty(&*session.snapshot())?);

    session.navigate(Navigation::GoToDashboard).await?;
    session.navigate(Navigation::Back).await?;

    tracing::info!("PIX checkout for plan premium");
    session.select_plan("premium").await?;
    if let Some(charge) = session.copy_pix().await? {
        println!("PIX code: {}", charge.payload);
        println!("QR image: {}", charge.qr_image_url);
    }
    session.confirm_pix_paid().await?;
    updates
        .wait_for(|s| s.view() == ViewState::Success)
        .await
        .context("session stopped before settlement")?;

    tracing::info!("Funnel complete, now on {}", session.snapshot().view());
    session.shutdown().await?;
    Ok(())
}
