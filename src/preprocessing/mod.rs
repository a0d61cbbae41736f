//! Data preprocessing module
//!
//! Feature scaling of the encoded matrix before windowing.

mod scaler;

pub use scaler::StandardScaler;
