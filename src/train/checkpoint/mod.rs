//! Checkpoint persistence, retention and retry

mod retry;
mod ring;
mod store;


pub use retry::RetryPolicy;
pub use ring::CheckpointRing;
pub use store::{
    checkpoint_file_name, load_weights, parse_checkpoint_step, save_weights, weights_path, CheckpointStore,
    FileCheckpointStore, MemoryCheckpointStore, CHECKPOINT_EXT,
};
