//! Host kernels shared by the reference backend and the interpreter.

pub mod adjust_saturation;
pub mod elementwise;
pub mod reduce;

pub use adjust_saturation::{adjust_saturation_closed_form, adjust_saturation_reference};
pub use elementwise::{BinaryOp, binary, clamp, where_select};
pub use reduce::{ReduceOp, reduce};
