pub mod tasks;
pub mod types;

pub use tasks::spawn_logged;
pub use types::*;
