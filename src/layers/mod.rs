pub mod dense;

pub use dense::{BigLayer, Layer, PINK_DRAWS};
