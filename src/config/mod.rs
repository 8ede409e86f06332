pub mod settings;

pub use settings::{ResetConfig, Settings};
