pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod data;
pub mod train;

// Convenience re-exports
pub use error::{NnError, Result};
pub use math::{Matrix, MatrixStore, WeightStorage};
pub use activation::{ActivationFunction, ActivationKind};
pub use layers::{BigLayer, Layer};
pub use network::{BigDeepNetwork, DeepNetwork, LayerSpec, Model, NetworkSpec, ShallowNetwork, WeightInit};
pub use data::{DataStream, Dataset, Sample};
pub use train::{Trainer, TrainerConfig, TrainerMonitor};
