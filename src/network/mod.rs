pub mod model;
pub mod model_file;
pub mod network;
pub mod shallow;
pub mod spec;

pub use model::{Model, WeightInit};
pub use model_file::{read_model, write_model, ModelHeader};
pub use network::{BigDeepNetwork, DeepNetwork};
pub use shallow::{BigShallowNetwork, ShallowNetwork};
pub use spec::{LayerSpec, NetworkSpec};
