//! Arena-backed XML tree (C7) and the chunk/pointer/projector stack (C3-C5)
//! built on top of it to materialise stand-off annotations as inline markup.

pub mod chunk;
pub mod pointer;
pub mod projector;
pub mod tree;

pub use chunk::{Chunk, ChunkKind};
pub use pointer::{PositionPointer, RecalcInfo};
pub use projector::{Document, ProjectorConfig};
pub use tree::{NodeId, Tree};
