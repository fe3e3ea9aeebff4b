//! Shared model/provider context-limit types and resolvers.
//!
//! Kept dependency-light (no HTTP client) so `jan-config` and `jan-agent` can
//! depend on it without pulling reqwest transitively. `jan-orchestrator` layers
//! its own HTTP-backed resolver against the LLM-API catalog on top of
//! [`ModelLimitResolver`].

mod cached;
mod composite;
mod config_override;
mod local_file;
mod resolver;
mod spec;

pub use cached::CachedResolver;
pub use composite::CompositeResolver;
pub use config_override::ConfigOverride;
pub use local_file::LocalFileResolver;
pub use resolver::ModelLimitResolver;
pub use spec::ModelSpec;
