//! Missing-value imputation, out-of-range capping, and min-max scaling.
//!
//! [`Normalizer::normalize`] is a pure function over one row: no I/O, no
//! shared state, safe to call concurrently on distinct rows.

use crate::replaystream::types::{FieldValue, Row};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with a value outside `[min_bound, max_bound]`.
///
/// `CapToMin` replaces ANY out-of-range reading, including one above the
/// maximum, with the minimum bound. Semantically surprising, so it is kept
/// as a named, overridable policy rather than hardwired behavior;
/// `ClampToNearest` is the conventional alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapPolicy {
    /// Replace any out-of-range value with `min_bound`
    #[default]
    CapToMin,
    /// Clamp to the nearest bound
    ClampToNearest,
}

impl CapPolicy {
    pub fn apply(self, value: f64, min_bound: f64, max_bound: f64) -> f64 {
        match self {
            CapPolicy::CapToMin => {
                if value < min_bound || value > max_bound {
                    min_bound
                } else {
                    value
                }
            }
            CapPolicy::ClampToNearest => value.clamp(min_bound, max_bound),
        }
    }
}

/// Per-field normalization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column this spec applies to
    pub field: String,
    /// Substitute for absent, empty, or non-numeric values
    pub default_if_missing: f64,
    /// Lower bound of the expected raw range
    pub min_bound: f64,
    /// Upper bound of the expected raw range
    pub max_bound: f64,
    /// Out-of-range handling
    #[serde(default)]
    pub cap_policy: CapPolicy,
}

impl FieldSpec {
    pub fn new(
        field: impl Into<String>,
        default_if_missing: f64,
        min_bound: f64,
        max_bound: f64,
    ) -> Self {
        FieldSpec {
            field: field.into(),
            default_if_missing,
            min_bound,
            max_bound,
            cap_policy: CapPolicy::default(),
        }
    }

    pub fn with_cap_policy(mut self, cap_policy: CapPolicy) -> Self {
        self.cap_policy = cap_policy;
        self
    }
}

/// Normalizer configuration errors. These can only occur at construction
/// time; normalization itself cannot fail because every field is defaulted
/// before bounds-checking.
#[derive(Debug)]
pub enum NormalizeError {
    /// `min_bound` must be strictly below `max_bound`
    InvalidBounds {
        field: String,
        min_bound: f64,
        max_bound: f64,
    },
    /// Two specs name the same field
    DuplicateField(String),
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::InvalidBounds {
                field,
                min_bound,
                max_bound,
            } => {
                write!(
                    f,
                    "field '{}': min_bound {} must be below max_bound {}",
                    field, min_bound, max_bound
                )
            }
            NormalizeError::DuplicateField(field) => {
                write!(f, "field '{}' is configured twice", field)
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Linear rescale of `value` from `[min_bound, max_bound]` to `[0, 1]`.
pub fn scale(value: f64, min_bound: f64, max_bound: f64) -> f64 {
    (value - min_bound) / (max_bound - min_bound)
}

/// Applies a set of [`FieldSpec`]s to rows.
#[derive(Debug, Clone)]
pub struct Normalizer {
    specs: Vec<FieldSpec>,
}

impl Normalizer {
    /// Validate the specs and build a normalizer.
    pub fn new(specs: Vec<FieldSpec>) -> Result<Self, NormalizeError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !(spec.min_bound < spec.max_bound) {
                return Err(NormalizeError::InvalidBounds {
                    field: spec.field.clone(),
                    min_bound: spec.min_bound,
                    max_bound: spec.max_bound,
                });
            }
            if !seen.insert(spec.field.clone()) {
                return Err(NormalizeError::DuplicateField(spec.field.clone()));
            }
        }
        Ok(Normalizer { specs })
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Clean and scale one row, returning a new row.
    ///
    /// Per configured field, in order: absent/empty/non-numeric values are
    /// replaced with the spec's default; out-of-range values get the cap
    /// policy; the result is scaled linearly into `[0, 1]`. Fields without a
    /// spec pass through unchanged, as does a spec whose column is not part
    /// of this dataset's header.
    pub fn normalize(&self, row: &Row) -> Row {
        let mut values = row.values().to_vec();
        for spec in &self.specs {
            let pos = match row.columns().iter().position(|c| c == &spec.field) {
                Some(pos) => pos,
                None => continue,
            };
            let raw = values[pos]
                .as_numeric()
                .unwrap_or(spec.default_if_missing);
            let capped = if raw < spec.min_bound || raw > spec.max_bound {
                warn!(
                    "field '{}' value {} out of range [{}, {}], applying {:?}",
                    spec.field, raw, spec.min_bound, spec.max_bound, spec.cap_policy
                );
                spec.cap_policy.apply(raw, spec.min_bound, spec.max_bound)
            } else {
                raw
            };
            values[pos] = FieldValue::Float(scale(capped, spec.min_bound, spec.max_bound));
        }
        row.with_values(values)
    }
}

/// Stock field specs for environmental sensor data: temperature in [10, 40]
/// defaulting to 10, humidity in [0, 100] defaulting to 50, pressure in
/// [900, 1100] hPa defaulting to 1013.
pub fn sensor_default_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("temperature", 10.0, 10.0, 40.0),
        FieldSpec::new("humidity", 50.0, 0.0, 100.0),
        FieldSpec::new("pressure", 1013.0, 900.0, 1100.0),
    ]
}
