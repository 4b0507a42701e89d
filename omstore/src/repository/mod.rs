// Repository: sequences transport calls around conversion, indexing and search

use crate::client::{IdGenerator, Transport, UlidGenerator};
use crate::convert;
use crate::entity::{Entity, EntityData};
use crate::error::Result;
use crate::index::IndexDefinition;
use crate::results::{self, SearchResults};
use crate::schema::{DataStructure, Schema};
use crate::search::Search;

/// Entry point for reading, writing and searching one entity type.
pub struct Repository<T: Transport> {
    schema: Schema,
    transport: T,
    ids: Box<dyn IdGenerator>,
}

impl<T: Transport> Repository<T> {
    pub fn new(schema: Schema, transport: T) -> Self {
        Repository {
            schema,
            transport,
            ids: Box::new(UlidGenerator),
        }
    }

    /// Replace the generator used for ids of new entities.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn create_entity(&self) -> Entity<'_> {
        Entity::new(&self.schema)
    }

    pub fn entity_from_json(&self, json: serde_json::Value) -> Result<Entity<'_>> {
        Entity::from_json(&self.schema, json)
    }

    /// Load the entity stored under `id`. A missing record yields an empty
    /// entity that still carries the key.
    pub fn fetch(&self, id: &str) -> Result<Entity<'_>> {
        let key = self.schema.key_for(id);
        let encoding = self.schema.data_structure();
        let data = match self.transport.get_record(&key, encoding)? {
            None => EntityData::new(),
            Some(record) => convert::decode(&self.schema, &record)?,
        };
        log::debug!("Fetched '{key}' with {} field(s)", data.len());
        Ok(Entity::from_storage(&self.schema, key, data))
    }

    /// Write `entity`, assigning a new id first if it has none. Returns the id.
    pub fn save(&self, entity: &mut Entity<'_>) -> Result<String> {
        let key = match entity.key() {
            Some(key) => key.to_string(),
            None => {
                let key = self.schema.key_for(&self.ids.new_id());
                entity.set_key(key.clone());
                key
            }
        };

        let record = convert::encode(&self.schema, entity.data())?;
        if record.is_empty() && record.data_structure() == DataStructure::Hash {
            log::debug!("Removing '{key}': no fields set");
            self.transport.remove_record(&key)?;
        } else {
            log::debug!("Saving '{key}'");
            self.transport.set_record(&key, &record)?;
        }

        let id = self.schema.id_from_key(&key).unwrap_or(&key);
        Ok(id.to_string())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let key = self.schema.key_for(id);
        log::debug!("Removing '{key}'");
        self.transport.remove_record(&key)
    }

    pub fn create_index(&self) -> Result<()> {
        let definition = IndexDefinition::from_schema(&self.schema);
        log::debug!(
            "Creating index '{}' with {} field(s)",
            definition.name,
            definition.fields.len()
        );
        self.transport.create_index(&definition)
    }

    pub fn drop_index(&self) -> Result<()> {
        log::debug!("Dropping index '{}'", self.schema.index_name());
        self.transport.drop_index(self.schema.index_name())
    }

    /// Start a new search over this entity type.
    pub fn search(&self) -> Search<'_> {
        Search::new(&self.schema)
    }

    /// Run `search` for `count` results starting at `offset`.
    pub fn page(&self, search: &Search<'_>, offset: usize, count: usize) -> Result<SearchResults<'_>> {
        let request = search.request(offset, count);
        let batch = self.transport.run_search(&request)?;
        results::convert(&self.schema, self.schema.data_structure(), batch)
    }

    /// Every match of `search`, fetched `page_size` at a time.
    pub fn all(&self, search: &Search<'_>, page_size: usize) -> Result<Vec<Entity<'_>>> {
        let page_size = page_size.max(1);
        let mut entities = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.page(search, offset, page_size)?;
            let fetched = page.entities.len();
            entities.extend(page.entities);
            offset += fetched;
            if fetched < page_size || offset >= page.count {
                break;
            }
        }
        log::debug!("Fetched {} '{}' entities", entities.len(), self.schema.entity_name());
        Ok(entities)
    }

    pub fn first(&self, search: &Search<'_>) -> Result<Option<Entity<'_>>> {
        let page = self.page(search, 0, 1)?;
        Ok(page.entities.into_iter().next())
    }

    /// Total matches of `search` without fetching any records.
    pub fn count(&self, search: &Search<'_>) -> Result<usize> {
        self.page(search, 0, 0).map(|page| page.count)
    }
}
