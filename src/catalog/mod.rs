//! Container discovery and lookup.
//!
//! # Lifecycle
//!
//! ```text
//! startup ──► Catalog::load_dir ──► Arc<Catalog> shared by every request
//! ```
//!
//! There is no reload: restart the server to pick up new containers.

mod registry;

pub use registry::{identifier_for, is_container_path, Catalog, CONTAINER_EXTENSIONS};
