pub mod client;
pub mod convert;
pub mod entity;
pub mod error;
pub mod index;
pub mod repository;
pub mod results;
pub mod schema;
pub mod search;

pub use client::{IdGenerator, Transport, UlidGenerator};
pub use convert::StorageRecord;
pub use entity::{Entity, EntityData, EntityValue, Point};
pub use error::{OmError, Result};
pub use index::IndexDefinition;
pub use repository::Repository;
pub use results::{RawBatch, SearchResults};
pub use schema::{DataStructure, FieldDefinition, FieldType, Schema};
pub use search::{Circle, Search, SearchRequest, SortOrder};
