pub mod executor;
pub mod node;

pub use executor::Executor;
pub use node::{BtNode, Status};
