use crate::conversion::factor_for;
use crate::error::{DashboardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single submitted observation of waste processed and ethanol yielded
///
/// Field names on the wire follow the stored document layout
/// (`waste_type`, `timestamp`), so the same struct serializes into the
/// record collection and into API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Display name of the submitting user
    pub user: String,

    /// Waste category, one of the conversion table entries
    #[serde(rename = "waste_type")]
    pub category: String,

    /// Waste processed, in kg
    pub quantity: f64,

    /// Ethanol produced, in litres, at full precision
    pub ethanol: f64,

    /// Creation time
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Compute the ethanol yield for a quantity of waste
///
/// The result is kept at full precision; use [`round2`] when displaying it.
///
/// # Errors
/// * `InvalidQuantity` if `quantity` is negative, NaN or infinite
/// * `UnknownCategory` if the category is not in the conversion table
///
/// # Examples
/// ```
/// use ethanol_dashboard::record::compute_yield;
///
/// assert_eq!(compute_yield("Algae", 10.0).unwrap(), 5.0);
/// assert_eq!(compute_yield("Peanut Shell", 3.0).unwrap(), 0.75);
/// ```
pub fn compute_yield(category: &str, quantity: f64) -> Result<f64> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(DashboardError::InvalidQuantity(quantity));
    }
    let factor = factor_for(category)?;
    Ok(quantity * factor)
}

/// Largest quantity, in kg, a single record may carry
///
/// Keeps community sums comfortably inside the finite `f64` range.
pub const MAX_QUANTITY_KG: f64 = 1_000_000.0;

/// Round to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Record {
    /// Build a new record, deriving `ethanol` from the conversion table.
    pub fn create(
        user: &str,
        category: &str,
        quantity: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let ethanol = compute_yield(category, quantity)?;
        Ok(Record {
            user: user.to_string(),
            category: category.to_string(),
            quantity,
            ethanol,
            created_at,
        })
    }

    /// Check a record that did not come through [`Record::create`]
    ///
    /// Applies the rules the store enforces when reading documents back,
    /// plus a known category and the [`MAX_QUANTITY_KG`] ceiling.
    ///
    /// # Errors
    /// * `InvalidQuantity` if the quantity is negative, non-finite or too large
    /// * `MalformedRecord` if the ethanol value is negative, non-finite or too large
    /// * `UnknownCategory` if the category is not in the conversion table
    pub fn validate(&self) -> Result<()> {
        if !self.quantity.is_finite() || !(0.0..=MAX_QUANTITY_KG).contains(&self.quantity) {
            return Err(DashboardError::InvalidQuantity(self.quantity));
        }
        if !self.ethanol.is_finite() || !(0.0..=MAX_QUANTITY_KG).contains(&self.ethanol) {
            return Err(DashboardError::MalformedRecord(format!(
                "field `ethanol` is out of range: {}",
                self.ethanol
            )));
        }
        factor_for(&self.category)?;
        Ok(())
    }

    /// Validate a schema-less stored document into a typed record
    ///
    /// Numeric fields may be JSON numbers or numeric strings. Anything
    /// else (missing, null, non-numeric, negative or non-finite) is
    /// rejected rather than coerced to zero. A missing timestamp reads as
    /// the Unix epoch.
    ///
    /// Stored `ethanol` is trusted and not recomputed from the category.
    ///
    /// # Errors
    /// * `MalformedRecord` naming the offending field
    pub fn from_document(document: &Value) -> Result<Self> {
        let fields = document
            .as_object()
            .ok_or_else(|| DashboardError::MalformedRecord("document is not an object".into()))?;

        Ok(Record {
            user: string_field(fields, "user")?,
            category: string_field(fields, "waste_type")?,
            quantity: number_field(fields, "quantity")?,
            ethanol: number_field(fields, "ethanol")?,
            created_at: timestamp_field(fields, "timestamp")?,
        })
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String> {
    match fields.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(DashboardError::MalformedRecord(format!(
            "field `{}` is not a string: {}",
            name, other
        ))),
        None => Err(DashboardError::MalformedRecord(format!(
            "missing field `{}`",
            name
        ))),
    }
}

fn number_field(fields: &Map<String, Value>, name: &str) -> Result<f64> {
    let value = match fields.get(name) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => {
            return Err(DashboardError::MalformedRecord(format!(
                "missing field `{}`",
                name
            )));
        }
    };

    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DashboardError::MalformedRecord(format!(
            "field `{}` is not a non-negative number: {}",
            name,
            fields.get(name).unwrap_or(&Value::Null)
        ))),
    }
}

fn timestamp_field(fields: &Map<String, Value>, name: &str) -> Result<DateTime<Utc>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(DateTime::<Utc>::default()),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                DashboardError::MalformedRecord(format!("field `{}` is not a timestamp: {}", name, e))
            }),
        Some(other) => Err(DashboardError::MalformedRecord(format!(
            "field `{}` is not a timestamp: {}",
            name, other
        ))),
    }
}
