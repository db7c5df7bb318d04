use crate::common::Value;

/// Outcome of an insert. Ids are listed in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertResult {
    inserted_ids: Vec<Value>,
}

impl InsertResult {
    pub fn new(inserted_ids: Vec<Value>) -> Self {
        Self { inserted_ids }
    }

    pub fn inserted_ids(&self) -> &[Value] {
        &self.inserted_ids
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted_ids.len()
    }
}

/// Outcome of a replace or update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    matched_count: u64,
    modified_count: u64,
    upserted_id: Option<Value>,
}

impl UpdateResult {
    pub fn new(matched_count: u64, modified_count: u64, upserted_id: Option<Value>) -> Self {
        Self {
            matched_count,
            modified_count,
            upserted_id,
        }
    }

    pub fn matched_count(&self) -> u64 {
        self.matched_count
    }

    pub fn modified_count(&self) -> u64 {
        self.modified_count
    }

    /// The `_id` of the inserted document when an upsert matched nothing.
    pub fn upserted_id(&self) -> Option<&Value> {
        self.upserted_id.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self { deleted_count }
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }
}
