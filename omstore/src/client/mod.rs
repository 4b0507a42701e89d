// Collaborators the repository talks to: the store client and id generation

use crate::convert::StorageRecord;
use crate::error::Result;
use crate::index::IndexDefinition;
use crate::results::RawBatch;
use crate::schema::DataStructure;
use crate::search::SearchRequest;

/// Client of the key-value store and its search module.
///
/// Implementations own the connection and translate each call into the
/// store's commands. Failures should be reported as `OmError::Transport`.
pub trait Transport {
    /// Read the record at `key`, or `None` if nothing is stored there.
    fn get_record(&self, key: &str, data_structure: DataStructure) -> Result<Option<StorageRecord>>;

    /// Replace the record at `key`.
    fn set_record(&self, key: &str, record: &StorageRecord) -> Result<()>;

    fn remove_record(&self, key: &str) -> Result<()>;

    fn run_search(&self, request: &SearchRequest) -> Result<RawBatch>;

    fn create_index(&self, definition: &IndexDefinition) -> Result<()>;

    fn drop_index(&self, name: &str) -> Result<()>;
}

/// Source of ids for newly saved entities
pub trait IdGenerator {
    fn new_id(&self) -> String;
}

/// Lexicographically sortable ids, the default for new entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn new_id(&self) -> String {
        ulid::Ulid::new().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ulid_ids_are_unique_and_canonical() {
        let generator = UlidGenerator;
        let a = generator.new_id();
        let b = generator.new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 26);
        assert!(a.parse::<ulid::Ulid>().is_ok());
    }
}
