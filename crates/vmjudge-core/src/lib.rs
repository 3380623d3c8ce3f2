pub mod config;
pub mod error;
pub mod pool;
pub mod topology;
pub mod types;

pub use config::JudgeConfig;
pub use error::{ProblemError, Resource, Violation, ViolationKind, ViolationResult};
pub use pool::{NumaNode, ResourcePool};
pub use topology::{RawCoordinate, Topology};
pub use types::*;
