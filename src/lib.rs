// ─── Runtime Resolver ───
// Runtime dependency resolution for proxy plugins: fetch declared library
// coordinates at startup, verify and cache them, and expose the jars
// through an isolated loading scope.
//
// Architecture:
//   coordinate — `group:artifact:version[:classifier][@ext]` model
//   repository — Maven-layout HTTP client with retry + checksum checks
//   cache      — shared on-disk artifact store, single-flight writers
//   resolve    — flat resolution engine, conflict groups, cancellation
//   inject     — isolated class/resource scope over the resolved jars

pub mod cache;
pub mod checksum;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod http;
pub mod inject;
pub mod repository;
pub mod resolve;

pub use cache::ArtifactCache;
pub use config::{ConflictPolicy, ResolverConfig};
pub use coordinate::Coordinate;
pub use error::{ResolverError, ResolverResult};
pub use inject::{PluginScope, SharedScope};
pub use repository::{RepositoryClient, RepositoryDescriptor};
pub use resolve::{
    CancelToken, ResolutionReport, ResolutionRequest, ResolvedArtifact, Resolver, RunState,
};
