//! Sequence windowing over the scaled feature matrix

mod window;

pub use window::{to_batch, windows_of_length, Sequence, SequenceWindower};
