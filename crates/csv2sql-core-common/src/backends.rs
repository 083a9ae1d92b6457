//! Backend registry for database support and capabilities.
//!
//! This module provides a static registry of the supported database
//! backends, including the support status of each management operation
//! (bulk insert, listing databases, creating/dropping databases). The
//! registry backs the CLI's `backends` command and backend-name lookup.

/// Support status for a specific backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The operation is fully supported and implemented.
    Supported,
    /// The operation is not supported by the backend.
    NotSupported,
}

impl SupportStatus {
    /// Returns `true` if the operation is supported.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, SupportStatus::Supported)
    }

    /// Returns the string representation of this support status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::NotSupported => "Not Supported",
        }
    }
}

/// Capabilities of a database backend.
///
/// Every backend supports DDL and chunked bulk insert; the management
/// operations differ (SQLite has no server-side database catalog).
#[derive(Debug, Clone, Copy)]
pub struct BackendCapabilities {
    /// Support status for transactional chunked bulk inserts.
    pub bulk_insert: SupportStatus,
    /// Support status for listing databases on the server.
    pub list_databases: SupportStatus,
    /// Support status for creating and dropping databases.
    pub manage_databases: SupportStatus,
}

/// Database backend definition.
#[derive(Debug, Clone)]
pub struct Backend {
    /// Short name used in configuration and the CLI (e.g. `"mysql"`).
    pub short_name: &'static str,
    /// Long descriptive name for display purposes.
    pub long_name: &'static str,
    /// Operations supported by this backend.
    pub capabilities: BackendCapabilities,
}

impl Backend {
    /// Creates a new backend definition with specified capabilities.
    #[must_use]
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        bulk_insert: SupportStatus,
        list_databases: SupportStatus,
        manage_databases: SupportStatus,
    ) -> Self {
        Self {
            short_name,
            long_name,
            capabilities: BackendCapabilities {
                bulk_insert,
                list_databases,
                manage_databases,
            },
        }
    }
}

/// The static registry of supported backends.
static BACKENDS: &[Backend] = &[
    Backend::new(
        "mysql",
        "MySQL / MariaDB",
        SupportStatus::Supported,
        SupportStatus::Supported,
        SupportStatus::Supported,
    ),
    Backend::new(
        "postgres",
        "PostgreSQL",
        SupportStatus::Supported,
        SupportStatus::Supported,
        SupportStatus::Supported,
    ),
    Backend::new(
        "sqlite",
        "SQLite (file-backed)",
        SupportStatus::Supported,
        SupportStatus::Supported,
        SupportStatus::NotSupported,
    ),
];

/// Finds a backend by its short name (case-insensitive).
///
/// `postgresql` is accepted as an alias for `postgres`, matching common
/// configuration habits.
#[must_use]
pub fn find_backend(name: &str) -> Option<&'static Backend> {
    let name = name.to_ascii_lowercase();
    let name = if name == "postgresql" {
        "postgres".to_string()
    } else {
        name
    };
    BACKENDS.iter().find(|b| b.short_name == name)
}

/// Returns all registered backends.
#[must_use]
pub fn get_available_backends() -> Vec<&'static Backend> {
    BACKENDS.iter().collect()
}

/// Returns the short names of all registered backends.
#[must_use]
pub fn get_backend_names() -> Vec<&'static str> {
    BACKENDS.iter().map(|b| b.short_name).collect()
}
