pub mod matrix;
pub mod matrix_store;
pub mod storage;

pub use matrix::Matrix;
pub use matrix_store::MatrixStore;
pub use storage::WeightStorage;
