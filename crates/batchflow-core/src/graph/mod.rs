//! Job graph: nodes, dependency edges and the build/finalize lifecycle.
//!
//! `JobGraphBuilder` is the only mutable form. `finalize` consumes it and
//! returns a `JobGraph` only if the edges are acyclic, so structural queries
//! on an unvalidated graph cannot be written.

mod builder;
mod dag;
mod node;

pub use builder::JobGraphBuilder;
pub use dag::JobGraph;
pub use node::{JobDependency, JobNode};
