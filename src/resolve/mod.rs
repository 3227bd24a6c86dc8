mod cancel;
mod engine;
mod report;
mod request;

pub use cancel::CancelToken;
pub use engine::Resolver;
pub use report::{
    FailureReason, ResolutionReport, ResolvedArtifact, RunState, UnresolvedArtifact, CACHE_SOURCE,
};
pub use request::{ExclusionRule, ResolutionRequest};
