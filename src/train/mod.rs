mod best;
pub mod monitor;
pub mod supervisor;
pub mod train_config;
pub mod train_result;
pub mod trainer;

pub use monitor::TrainerMonitor;
pub use supervisor::supervise;
pub use train_config::TrainerConfig;
pub use train_result::{SearchOutcome, TrainResult};
pub use trainer::{build_seed_steps, Trainer};
