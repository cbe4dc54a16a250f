pub mod config;
pub mod fixtures;

pub use config::BenchConfig;
pub use fixtures::{BenchPost, FakeDatabase, IdGenerator};
