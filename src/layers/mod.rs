//! Layer tests, one module per operator.

pub mod adjust_saturation;
