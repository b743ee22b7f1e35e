//! Inference module
//!
//! Loads the persisted pipeline and model once and turns validated form
//! submissions into price estimates.

mod form;
mod predictor;

pub use form::{field_spec, FieldKind, FieldSpec, FormInput, FIELDS};
pub use predictor::{format_currency, Prediction, Predictor};
