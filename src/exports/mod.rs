//! Configuration export
//!
//! - [`configuration`] - Synthesizes the client configuration from enriched resources
//! - [`writer`] - Renders configuration artifacts and writes them out

pub mod configuration;
pub mod writer;

pub use configuration::{synthesize, CloudLogicRecord, Configuration, FederatedConfiguration};
pub use writer::{render_artifact, write_artifact, Artifact, ArtifactKind};
