//! Fixed waste category → ethanol yield factors.

use crate::error::{DashboardError, Result};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;

/// Litres of ethanol produced per kg of one waste category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConversionFactor {
    pub category: &'static str,
    pub factor: f64,
}

/// The closed set of supported categories, in submission-form order.
pub const CONVERSION_TABLE: [ConversionFactor; 11] = [
    ConversionFactor { category: "Tea Powder Waste", factor: 0.25 },
    ConversionFactor { category: "Matchstick Waste", factor: 0.18 },
    ConversionFactor { category: "Paper (Cardboard/Newspaper)", factor: 0.22 },
    ConversionFactor { category: "Cloth (Textile Waste)", factor: 0.20 },
    ConversionFactor { category: "Corn Fibres", factor: 0.45 },
    ConversionFactor { category: "Congress Grass", factor: 0.30 },
    ConversionFactor { category: "Water Hyacinth", factor: 0.15 },
    ConversionFactor { category: "Lantana Camara", factor: 0.28 },
    ConversionFactor { category: "Algae", factor: 0.50 },
    ConversionFactor { category: "Tamarind Waste", factor: 0.35 },
    ConversionFactor { category: "Peanut Shell", factor: 0.25 },
];

lazy_static! {
    static ref FACTOR_INDEX: HashMap<&'static str, f64> = CONVERSION_TABLE
        .iter()
        .map(|entry| (entry.category, entry.factor))
        .collect();
}

/// Look up the conversion factor for a category
///
/// Matching is exact and case-sensitive.
///
/// # Errors
/// * `DashboardError::UnknownCategory` if the category is not in the table
///
/// # Examples
/// ```
/// use ethanol_dashboard::conversion::factor_for;
///
/// assert_eq!(factor_for("Algae").unwrap(), 0.50);
/// assert!(factor_for("algae").is_err());
/// ```
pub fn factor_for(category: &str) -> Result<f64> {
    FACTOR_INDEX
        .get(category)
        .copied()
        .ok_or_else(|| DashboardError::UnknownCategory(category.to_string()))
}

/// All category names in table order.
pub fn categories() -> impl Iterator<Item = &'static str> {
    CONVERSION_TABLE.iter().map(|entry| entry.category)
}
