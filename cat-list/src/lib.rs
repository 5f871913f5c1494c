//! Paginated cat list with an offline cache, favorites and search.
//!
//! The list is a reducer driven by a [`catalog_runtime::Store`]. It shows
//! cached cats immediately, pages through TheCatAPI on demand, remembers
//! favorites across sessions and derives filtered views for the UI.
//!
//! - [`CatListReducer`]: every state transition
//! - [`derive`]: search, favorites and lifespan views
//! - [`CatApiClient`]: HTTP fetch port
//! - [`FileCatStore`]: JSON file cache port
//! - [`CatListConfig`]: environment configuration
//!
//! # Quick Start
//!
//! ```no_run
//! use cat_list::{
//!     CatApiClient, CatListAction, CatListConfig, CatListEnvironment, CatListReducer,
//!     FileCatStore, ListState,
//! };
//! use catalog_core::environment::SystemClock;
//! use catalog_runtime::Store;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CatListConfig::from_env()?;
//! let env = CatListEnvironment::new(
//!     Arc::new(CatApiClient::new(&config.api)?),
//!     Arc::new(FileCatStore::open(&config.cache_path).await?),
//!     Arc::new(SystemClock),
//! );
//! let store = Store::new(ListState::new(config.page_size), CatListReducer::new(), env);
//!
//! store.send_cascading(CatListAction::Initialize).await?.wait().await;
//! let count = store.state(|s| s.cats.len()).await;
//! println!("{count} cats loaded");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod derive;
pub mod persistence;
pub mod reducer;
pub mod types;

// Re-export commonly used types
pub use api::CatApiClient;
pub use config::{CatApiConfig, CatListConfig, ConfigError};
pub use derive::{FavoritesSummary, ListSnapshot, ViewFilter};
pub use persistence::FileCatStore;
pub use reducer::{CatListEnvironment, CatListReducer};
pub use types::{CatDetail, CatListAction, ErrorAlert, ListPhase, ListState};
