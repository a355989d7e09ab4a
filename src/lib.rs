pub mod config;
pub mod connections;
pub mod db;
pub mod document;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod models;
pub mod numbering;
pub mod search_index;
pub mod store;

pub use config::Config;
pub use connections::{ConnectionCache, ThematicConnectionFinder, ZettelConnection};
pub use db::Database;
pub use error::{Result, StoreError};
pub use graph::CrossReferenceGraph;
pub use models::{Card, CardBuilder, CardId, CardIndex, CardSummary, Category};
pub use numbering::NumberingAllocator;
pub use search_index::{IndexRow, IndexState, SearchIndex};
pub use store::{CardStore, NewCard, Statistics};
