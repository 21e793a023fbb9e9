//! Memory export (§6 persisted state layout): schema-versioned JSON,
//! human-readable Markdown, and a ZIP bundling both plus per-memory files.
//! Grounded on the original snapshot service; object storage for the
//! resulting bytes stays an external collaborator (§1), so callers own
//! writing the returned content wherever it needs to land.

pub mod exporter;
pub mod model;
pub mod repo;
pub mod service;

pub use exporter::{build_json_export, build_markdown_export, build_zip_export, ExportError};
pub use model::{
    ExportFormat, JsonExportEnvelope, JsonExportMemory, MemorySnapshot, SnapshotFilters,
    SnapshotStatus, JSON_EXPORT_SCHEMA_VERSION,
};
pub use repo::{InMemorySnapshotRepo, SnapshotRepo, SnapshotRepoError};
pub use service::{ExportServiceError, SnapshotService, DEFAULT_RETENTION_DAYS};
