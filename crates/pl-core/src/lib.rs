pub mod error;
pub mod rng;
pub mod tree;
pub mod types;
pub mod value;

pub use error::ParleyError;
pub use rng::{RandomSource, SeededRandom};
pub use tree::{NodeId, NodeKind, ScriptTree};
pub use types::*;
pub use value::*;
