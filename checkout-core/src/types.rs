//! Core types for the checkout funnel

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plan identifier (catalog key, e.g. `creator`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
    /// Create new plan ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription plan offered on the pricing section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Catalog identifier
    pub id: &'static str,

    /// Display name
    pub name: &'static str,

    /// Monthly price (BRL)
    pub monthly_price: Decimal,

    /// Feature descriptions, in display order
    pub features: &'static [&'static str],

    /// Highlighted as the most popular plan
    pub featured: bool,
}

impl Plan {
    /// Plan identifier as an owned key
    pub fn plan_id(&self) -> PlanId {
        PlanId::new(self.id)
    }
}

/// Active screen of the funnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewState {
    /// Marketing page with the pricing section
    Landing,
    /// Login screen (also the dashboard entry point)
    Login,
    /// Checkout for the selected plan
    Payment,
    /// Payment confirmed
    Success,
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewState::Landing => "landing",
            ViewState::Login => "login",
            ViewState::Payment => "payment",
            ViewState::Success => "success",
        };
        f.write_str(name)
    }
}

/// Payment method chosen on the checkout screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Credit card
    #[default]
    Card,
    /// PIX instant payment
    Pix,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Pix => f.write_str("pix"),
        }
    }
}

/// Card form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKind {
    /// Card holder full name
    HolderName,
    /// CPF, 11 digits
    TaxId,
    /// Card number, 16 digits
    CardNumber,
    /// Expiry date, MM/YY
    Expiry,
    /// Security code, 3 or 4 digits
    Cvv,
}

impl FieldKind {
    /// All card fields, in form order
    pub const ALL: [FieldKind; 5] = [
        FieldKind::HolderName,
        FieldKind::TaxId,
        FieldKind::CardNumber,
        FieldKind::Expiry,
        FieldKind::Cvv,
    ];

    /// Form input name
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::HolderName => "name",
            FieldKind::TaxId => "cpf",
            FieldKind::CardNumber => "cardNumber",
            FieldKind::Expiry => "expiry",
            FieldKind::Cvv => "cvv",
        }
    }

    /// Parse from form input name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Card form values, as displayed (already masked)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFormData {
    /// Holder name (raw text)
    pub holder_name: String,

    /// Tax id, `XXX.XXX.XXX-XX`
    pub tax_id: String,

    /// Card number, groups of 4
    pub card_number: String,

    /// Expiry, `MM/YY`
    pub expiry: String,

    /// Security code
    pub cvv: String,
}

impl CardFormData {
    /// Current value of a field
    pub fn get(&self, field: FieldKind) -> &str {
        match field {
            FieldKind::HolderName => &self.holder_name,
            FieldKind::TaxId => &self.tax_id,
            FieldKind::CardNumber => &self.card_number,
            FieldKind::Expiry => &self.expiry,
            FieldKind::Cvv => &self.cvv,
        }
    }

    /// Replace the value of a field
    pub fn set(&mut self, field: FieldKind, value: String) {
        let slot = match field {
            FieldKind::HolderName => &mut self.holder_name,
            FieldKind::TaxId => &mut self.tax_id,
            FieldKind::CardNumber => &mut self.card_number,
            FieldKind::Expiry => &mut self.expiry,
            FieldKind::Cvv => &mut self.cvv,
        };
        *slot = value;
    }

    /// Last four digits of the card number
    pub fn card_last4(&self) -> Option<String> {
        let digits: Vec<char> = self.card_number.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 4 {
            return None;
        }
        Some(digits[digits.len() - 4..].iter().collect())
    }
}

/// Settlement request handed to the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementRequest {
    /// Plan being purchased
    pub plan_id: PlanId,

    /// Amount charged
    pub amount: Decimal,

    /// Payment method
    pub method: PaymentMethod,

    /// Card snapshot (card method only)
    pub card: Option<CardFormData>,
}
