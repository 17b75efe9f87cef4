pub mod dataset;
pub mod gates;
pub mod stream;

pub use dataset::{Dataset, Sample};
pub use stream::{write_dataset, DataStream};
