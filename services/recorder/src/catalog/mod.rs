//! Daily instrument catalog
//!
//! Loads the per-exchange instrument dump into an in-memory table that
//! is read-only after load and shared by every resolver call.

pub mod loader;
pub mod store;

pub use loader::CatalogLoader;
pub use store::Catalog;

/// Exchanges the recorder pulls a daily dump for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogExchange {
    /// NSE cash + indices
    Nse,
    /// NFO futures + options
    Nfo,
}

impl CatalogExchange {
    /// Exchange code used in URLs and cache file names
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Nfo => "NFO",
        }
    }
}

impl std::fmt::Display for CatalogExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
