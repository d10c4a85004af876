//! Claim form parsing.
//!
//! Multipart text fields and JSON bodies both arrive here as a flat
//! [`FormFields`] map. The claimant address may be sent three ways: a JSON
//! string under `address`, bracketed `address[street]`-style fields, or a
//! nested `address` object. All three produce the same [`Address`].

use crate::{
    errors::{Error, Result},
    models::BenefitType,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw form fields keyed by field name.
pub type FormFields = Map<String, Value>;

/// Country used when none is given.
pub const DEFAULT_COUNTRY: &str = "India";

const INVALID_ADDRESS: &str = "Invalid address format";

/// A postal address on a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street and house number
    pub street: String,
    /// City
    pub city: String,
    /// District, empty when not given
    pub district: String,
    /// State, empty when not given
    pub state: String,
    /// Postal code
    pub pincode: String,
    /// Country, defaults to India
    pub country: String,
}

/// A validated claim form.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationForm {
    /// Family id of the claimant
    pub family_id: String,
    /// Claimant member
    pub member_id: i64,
    /// Requested benefit
    pub benefit_type: BenefitType,
    /// Short reason for the claim
    pub reason: String,
    /// Longer description, may be empty
    pub description: String,
    /// Place the expense was incurred
    pub place: String,
    /// Claimant address
    pub address: Address,
    /// Amount claimed, positive
    pub total_amount: f64,
}

/// Reads a field as trimmed text. Numbers are accepted and rendered as text.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match fields.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn required(fields: &FormFields, key: &str, label: &str) -> Result<String> {
    text(fields, key).ok_or_else(|| Error::validation(format!("{label} is required")))
}

fn address_from_object(parts: &Map<String, Value>) -> Result<Address> {
    let part = |key: &str| text(parts, key);
    let need = |key: &str| {
        part(key).ok_or_else(|| Error::validation(format!("Address {key} is required")))
    };

    Ok(Address {
        street: need("street")?,
        city: need("city")?,
        district: part("district").unwrap_or_default(),
        state: part("state").unwrap_or_default(),
        pincode: need("pincode")?,
        country: part("country").unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    })
}

/// Extracts `address[...]` bracket fields into a plain object.
fn bracket_fields(fields: &FormFields) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|(key, value)| {
            let inner = key.strip_prefix("address[")?.strip_suffix(']')?;
            Some((inner.to_string(), value.clone()))
        })
        .collect()
}

/// Resolves the claimant address from whichever encoding the form used.
pub fn parse_address(fields: &FormFields) -> Result<Address> {
    match fields.get("address") {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(parts)) => address_from_object(&parts),
            _ => Err(Error::validation(INVALID_ADDRESS)),
        },
        Some(Value::Object(parts)) => address_from_object(parts),
        Some(_) => Err(Error::validation(INVALID_ADDRESS)),
        None => {
            let parts = bracket_fields(fields);
            if parts.is_empty() {
                return Err(Error::validation(INVALID_ADDRESS));
            }
            address_from_object(&parts)
        }
    }
}

fn parse_member_id(fields: &FormFields) -> Result<i64> {
    let invalid = || Error::validation("Invalid memberId");
    match fields.get("memberId") {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(invalid),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse().map_err(|_| invalid()),
        _ => Err(Error::validation("memberId is required")),
    }
}

fn parse_total_amount(fields: &FormFields) -> Result<f64> {
    let amount = match fields.get("totalAmount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        None => return Err(Error::validation("totalAmount is required")),
        _ => None,
    }
    .ok_or_else(|| Error::validation("Invalid totalAmount"))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

impl ApplicationForm {
    /// Validates raw form fields into a claim form.
    pub fn from_fields(fields: &FormFields) -> Result<Self> {
        let benefit_type: BenefitType = required(fields, "benefitType", "benefitType")?.parse()?;

        Ok(Self {
            family_id: required(fields, "familyId", "familyId")?,
            member_id: parse_member_id(fields)?,
            benefit_type,
            reason: required(fields, "reason", "reason")?,
            description: text(fields, "description").unwrap_or_default(),
            place: required(fields, "place", "place")?,
            address: parse_address(fields)?,
            total_amount: parse_total_amount(fields)?,
        })
    }
}
