//! Adapter implementations.
//!
//! - Media engines (`engine.audio`, `engine.video`, `engine.convert`,
//!   `engine.meta`): structural validation, then `InvalidInput`
//! - `PassthroughAdapter`: always succeeds, for demos and tests

pub mod engines;
pub mod passthrough;

pub use self::engines::{
    AudioEngineAdapter, ConvertEngineAdapter, MetaEngineAdapter, VideoEngineAdapter,
};
pub use self::passthrough::PassthroughAdapter;
