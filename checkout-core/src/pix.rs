//! PIX copy-and-paste payload
//!
//! Builds the static BR Code (EMV merchant-presented QR) string shown next to
//! the QR image. Every field is `ID | LEN | VALUE` with a two-digit length,
//! terminated by a CRC16/CCITT-FALSE checksum over the whole payload,
//! including the `6304` CRC header itself.
//!
//! Rendering the QR image is delegated to an external service; this module
//! only builds the URL for it.

use crate::config::PixConfig;
use crate::types::Plan;
use serde::Serialize;
use thiserror::Error;

const PIX_GUI: &str = "BR.GOV.BCB.PIX";
const CURRENCY_BRL: &str = "986";
const COUNTRY_BR: &str = "BR";
const MERCHANT_NAME_MAX: usize = 25;
const MERCHANT_CITY_MAX: usize = 15;
const CRC_HEADER: &str = "6304";
const FIELD_VALUE_MAX: usize = 99;

/// Longest PIX key that fits the merchant account template (field 26)
pub const PIX_KEY_MAX: usize = FIELD_VALUE_MAX - 4 - (4 + PIX_GUI.len());

/// Longest transaction id accepted in field 62/05
pub const TXID_MAX: usize = 25;

/// PIX payload encoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PixError {
    /// A field value does not fit the two-digit length
    #[error("field {id} is {len} characters long, at most 99 allowed")]
    FieldTooLong {
        /// Field id
        id: &'static str,
        /// Value length in characters
        len: usize,
    },
}

/// PIX charge for a plan: payload plus QR render URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PixCharge {
    /// Copy-and-paste payload
    pub payload: String,

    /// External QR image URL encoding `payload`
    pub qr_image_url: String,
}

impl PixCharge {
    /// Build the charge for a plan's monthly price
    pub fn for_plan(config: &PixConfig, plan: &Plan) -> Result<Self, PixError> {
        let payload = build_payload(config, plan)?;
        let qr_image_url = qr_image_url(&config.qr_service_url, &payload);
        Ok(Self {
            payload,
            qr_image_url,
        })
    }
}

/// Build the BR Code payload for a plan
pub fn build_payload(config: &PixConfig, plan: &Plan) -> Result<String, PixError> {
    let merchant_account = [field("00", PIX_GUI)?, field("01", &config.key)?].concat();
    let amount = format!("{:.2}", plan.monthly_price);
    let txid = config.txid.as_deref().unwrap_or("***");

    let mut payload = String::new();
    payload.push_str(&field("00", "01")?);
    payload.push_str(&field("26", &merchant_account)?);
    payload.push_str(&field("52", "0000")?);
    payload.push_str(&field("53", CURRENCY_BRL)?);
    payload.push_str(&field("54", &amount)?);
    payload.push_str(&field("58", COUNTRY_BR)?);
    payload.push_str(&field("59", &truncate(&config.merchant_name, MERCHANT_NAME_MAX))?);
    payload.push_str(&field("60", &truncate(&config.merchant_city, MERCHANT_CITY_MAX))?);
    payload.push_str(&field("62", &field("05", txid)?)?);
    payload.push_str(CRC_HEADER);

    let crc = crc16(payload.as_bytes());
    payload.push_str(&format!("{:04X}", crc));
    Ok(payload)
}

/// Check the field structure and the trailing CRC of a payload
pub fn verify_payload(payload: &str) -> bool {
    if payload.len() < 8 || !payload.is_char_boundary(payload.len() - 4) {
        return false;
    }
    let (body, checksum) = payload.split_at(payload.len() - 4);
    if !body.ends_with(CRC_HEADER) {
        return false;
    }
    if format!("{:04X}", crc16(body.as_bytes())) != checksum {
        return false;
    }

    let chars: Vec<char> = payload.chars().collect();
    match parse_fields(&chars) {
        Some(fields) => {
            fields.last().map(|(id, _)| id.as_str()) == Some("63")
                && fields.iter().all(|(id, value)| match id.as_str() {
                    "26" | "62" => parse_fields(value).is_some(),
                    _ => true,
                })
        }
        None => false,
    }
}

/// Split `ID | LEN | VALUE` fields; `None` unless they cover the input exactly
fn parse_fields(input: &[char]) -> Option<Vec<(String, &[char])>> {
    let mut fields = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        if rest.len() < 4 || !rest[..4].iter().all(char::is_ascii_digit) {
            return None;
        }
        let id: String = rest[..2].iter().collect();
        let len: usize = rest[2..4].iter().collect::<String>().parse().ok()?;
        let value = rest.get(4..4 + len)?;
        fields.push((id, value));
        rest = &rest[4 + len..];
    }

    Some(fields)
}

/// URL of the external QR image for a payload
pub fn qr_image_url(service_url: &str, payload: &str) -> String {
    format!(
        "{}?size=160x160&data={}&bgcolor=ffffff",
        service_url,
        urlencoding::encode(payload)
    )
}

fn field(id: &'static str, value: &str) -> Result<String, PixError> {
    let len = value.chars().count();
    if len > FIELD_VALUE_MAX {
        return Err(PixError::FieldTooLong { id, len });
    }
    Ok(format!("{}{:02}{}", id, len, value))
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// CRC16/CCITT-FALSE (poly 0x1021, init 0xFFFF)
fn crc16(data: &[u8]) -> u16 {
    const POLYNOMIAL: u16 = 0x1021;
    let mut crc: u16 = 0xFFFF;

    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}
