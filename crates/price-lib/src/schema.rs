//! Request schema and canonicalization
//!
//! The predictor is positional: it expects a fixed-width numeric row, not
//! named fields. This module maps a [`FeatureRecord`] onto the column order
//! stored in the model bundle, coercing booleans to `0.0`/`1.0`.

use crate::models::{CanonicalRow, FeatureRecord};
use std::collections::HashSet;
use thiserror::Error;

/// Number of columns every predictor receives
pub const NUM_FEATURES: usize = 6;

/// Field names of [`FeatureRecord`], in declaration order
pub const SCHEMA_FIELDS: [&str; NUM_FEATURES] = [
    "surface_m2",
    "num_rooms",
    "is_furnished",
    "wifi_incl",
    "charges_incl",
    "car_park",
];

/// Errors raised while reconciling a feature order with the request schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),

    #[error("duplicate feature '{0}'")]
    DuplicateFeature(String),

    #[error("feature '{0}' is missing from feature_order")]
    MissingFeature(String),

    #[error("{field} must be >= 0, got {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
}

/// Boolean coercion used for every flag column
pub fn bool_to_f64(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

impl FeatureRecord {
    /// Look up a column value by field name
    pub fn value_of(&self, name: &str) -> Option<f64> {
        let value = match name {
            "surface_m2" => self.surface_m2,
            "num_rooms" => self.num_rooms,
            "is_furnished" => bool_to_f64(self.is_furnished),
            "wifi_incl" => bool_to_f64(self.wifi_incl),
            "charges_incl" => bool_to_f64(self.charges_incl),
            "car_park" => bool_to_f64(self.car_park),
            _ => return None,
        };
        Some(value)
    }

    /// Range checks applied after the body has been deserialized
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (field, value) in [("surface_m2", self.surface_m2), ("num_rooms", self.num_rooms)] {
            if !value.is_finite() {
                return Err(SchemaError::NonFinite(field));
            }
            if value < 0.0 {
                return Err(SchemaError::NegativeValue { field, value });
            }
        }
        Ok(())
    }
}

/// Build the predictor row for `record` following `feature_order`
pub fn canonicalize(
    record: &FeatureRecord,
    feature_order: &[String],
) -> Result<CanonicalRow, SchemaError> {
    let values = feature_order
        .iter()
        .map(|name| {
            record
                .value_of(name)
                .ok_or_else(|| SchemaError::UnknownFeature(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CanonicalRow::new(values))
}

/// Reject a `feature_order` that names the same column twice
pub fn validate_unique_features(feature_order: &[String]) -> Result<(), SchemaError> {
    let mut seen = HashSet::with_capacity(feature_order.len());
    for name in feature_order {
        if !seen.insert(name.as_str()) {
            return Err(SchemaError::DuplicateFeature(name.clone()));
        }
    }
    Ok(())
}

/// Check that `feature_order` is a permutation of [`SCHEMA_FIELDS`]
pub fn validate_feature_order(feature_order: &[String]) -> Result<(), SchemaError> {
    if let Some(unknown) = feature_order
        .iter()
        .find(|name| !SCHEMA_FIELDS.contains(&name.as_str()))
    {
        return Err(SchemaError::UnknownFeature(unknown.clone()));
    }
    validate_unique_features(feature_order)?;

    match SCHEMA_FIELDS
        .iter()
        .find(|field| !feature_order.iter().any(|name| name == *field))
    {
        Some(missing) => Err(SchemaError::MissingFeature(missing.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn sample_record() -> FeatureRecord {
        FeatureRecord {
            surface_m2: 45.0,
            num_rooms: 2.0,
            is_furnished: true,
            wifi_incl: false,
            charges_incl: true,
            car_park: false,
        }
    }

    #[test]
    fn test_canonicalize_schema_order() {
        let row = canonicalize(&sample_record(), &order(&SCHEMA_FIELDS)).unwrap();
        assert_eq!(row.values(), &[45.0, 2.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_canonicalize_follows_bundle_order() {
        let order = order(&[
            "car_park",
            "charges_incl",
            "num_rooms",
            "surface_m2",
            "wifi_incl",
            "is_furnished",
        ]);
        let row = canonicalize(&sample_record(), &order).unwrap();
        assert_eq!(row.values(), &[0.0, 1.0, 2.0, 45.0, 0.0, 1.0]);
    }

    #[test]
    fn test_canonicalize_is_deterministic() {
        let order = order(&SCHEMA_FIELDS);
        let first = canonicalize(&sample_record(), &order).unwrap();
        let second = canonicalize(&sample_record(), &order).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_canonicalize_unknown_feature() {
        let mut names = SCHEMA_FIELDS.to_vec();
        names[5] = "balcony";
        let err = canonicalize(&sample_record(), &order(&names)).unwrap_err();
        assert_eq!(err, SchemaError::UnknownFeature("balcony".to_string()));
        assert!(err.to_string().contains("balcony"));
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(bool_to_f64(true), 1.0);
        assert_eq!(bool_to_f64(false), 0.0);

        let mut record = sample_record();
        for flag in [true, false] {
            record.is_furnished = flag;
            record.wifi_incl = flag;
            record.charges_incl = flag;
            record.car_park = flag;
            for name in &SCHEMA_FIELDS[2..] {
                let v = record.value_of(name).unwrap();
                assert!(v == 0.0 || v == 1.0);
                assert_eq!(v, bool_to_f64(flag));
            }
        }
    }

    #[test]
    fn test_validate_rejects_negative_values() {
        let mut record = sample_record();
        record.surface_m2 = -1.0;
        assert!(matches!(
            record.validate(),
            Err(SchemaError::NegativeValue { field: "surface_m2", .. })
        ));

        let mut record = sample_record();
        record.num_rooms = -0.5;
        assert!(matches!(
            record.validate(),
            Err(SchemaError::NegativeValue { field: "num_rooms", .. })
        ));
    }

    #[test]
    fn test_validate_accepts_zero() {
        let mut record = sample_record();
        record.surface_m2 = 0.0;
        record.num_rooms = 0.0;
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut record = sample_record();
        record.num_rooms = f64::INFINITY;
        assert_eq!(record.validate(), Err(SchemaError::NonFinite("num_rooms")));
    }

    #[test]
    fn test_feature_order_permutation_is_valid() {
        assert!(validate_feature_order(&order(&SCHEMA_FIELDS)).is_ok());

        let mut reversed = SCHEMA_FIELDS.to_vec();
        reversed.reverse();
        assert!(validate_feature_order(&order(&reversed)).is_ok());
    }

    #[test]
    fn test_feature_order_mismatches() {
        let mut names = SCHEMA_FIELDS.to_vec();
        names[0] = "balcony";
        assert_eq!(
            validate_feature_order(&order(&names)),
            Err(SchemaError::UnknownFeature("balcony".to_string()))
        );

        let mut names = SCHEMA_FIELDS.to_vec();
        names[1] = "surface_m2";
        assert_eq!(
            validate_feature_order(&order(&names)),
            Err(SchemaError::DuplicateFeature("surface_m2".to_string()))
        );

        assert_eq!(
            validate_feature_order(&order(&SCHEMA_FIELDS[..5])),
            Err(SchemaError::MissingFeature("car_park".to_string()))
        );
    }

    #[test]
    fn test_unique_features_ignores_unknown_names() {
        assert!(validate_unique_features(&order(&["balcony", "surface_m2"])).is_ok());
        assert_eq!(
            validate_unique_features(&order(&["balcony", "surface_m2", "balcony"])),
            Err(SchemaError::DuplicateFeature("balcony".to_string()))
        );
    }
}
