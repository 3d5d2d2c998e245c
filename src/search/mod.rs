//! Remote log-search capability
//!
//! The export pipeline never stores or indexes logs itself; it drains a
//! paginated search service through the [`LogSearch`] trait.
//!
//! - [`HttpLogSearch`]: JSON-over-HTTP client for a remote search endpoint
//!
//! ## Usage
//!
//! ```no_run
//! use log_download_manager::search::{HttpLogSearch, LogSearch, SearchRequest};
//! use log_download_manager::config::SearchConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let search = HttpLogSearch::new(&SearchConfig::default())?;
//! let page = search
//!     .search(&SearchRequest {
//!         organization_id: "org-1".to_string(),
//!         to: 1_700_000_000_000_000_000,
//!         n_first: true,
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{} entries between {} and {}", page.entries.len(), page.from, page.to);
//! # Ok(())
//! # }
//! ```

mod http;
mod traits;

pub use http::HttpLogSearch;
pub use traits::{LogEntry, LogSearch, SearchRequest, SearchResponse};
