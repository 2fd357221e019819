//! Versioned model deployment.
//!
//! Layout of a deployment root:
//!
//! ```text
//! saved_models/
//!   VERSION            last assigned version number
//!   1/
//!     model.bin
//!     transformer.bin
//!     target_encoder.bin
//!     manifest.json
//!   2/
//!     ...
//! ```

mod counter;
mod manifest;
pub mod resolver;

pub use counter::{VersionCounter, VERSION_FILE_NAME};
pub use manifest::{ModelManifest, MANIFEST_FILE_NAME};
pub use resolver::{DeployedModel, ModelResolver, ModelVersion, ResolvedModel};
