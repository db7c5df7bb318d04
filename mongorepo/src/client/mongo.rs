//! Backend over the official MongoDB driver's blocking client.
//!
//! Documents, filters and queries are translated to BSON; partial updates
//! arrive as [UpdateDefinition]s and are parsed with the driver decoders
//! before being sent, so `ISODate` and `NumberLong` literals reach the server
//! as native dates and 64-bit integers.

use crate::client::{
    ClientFactory, Collection, CollectionProvider, Database, DatabaseProvider, DocumentClient,
    DocumentClientProvider,
};
use crate::collection::{
    DeleteResult, Document, InsertResult, Query, ReplaceOptions, UpdateResult,
};
use crate::common::{Value, MONGODB_SCHEME, MONGODB_SRV_SCHEME};
use crate::config::ConnectionString;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::Filter;
use crate::repository::UpdateDefinition;
use chrono::DateTime;
use dashmap::DashMap;
use mongodb::bson::{self, Bson};
use std::sync::Arc;

#[derive(Clone)]
pub struct MongoClient {
    client: mongodb::sync::Client,
}

impl MongoClient {
    pub fn connect(connection_string: &ConnectionString) -> RepoResult<Self> {
        let client = mongodb::sync::Client::with_uri_str(connection_string.as_str())
            .map_err(backend_error)?;
        Ok(MongoClient { client })
    }

    pub fn from_driver(client: mongodb::sync::Client) -> Self {
        MongoClient { client }
    }
}

impl DocumentClientProvider for MongoClient {
    fn database(&self, name: &str) -> RepoResult<Database> {
        if name.is_empty() {
            log::error!("Empty database name");
            return Err(RepoError::new(
                "Database name cannot be empty",
                ErrorKind::InvalidArgument,
            ));
        }
        Ok(Database::new(MongoDatabase {
            database: self.client.database(name),
        }))
    }

    fn database_names(&self) -> RepoResult<Vec<String>> {
        self.client.list_database_names().run().map_err(backend_error)
    }
}

#[derive(Clone)]
pub struct MongoDatabase {
    database: mongodb::sync::Database,
}

impl DatabaseProvider for MongoDatabase {
    fn name(&self) -> String {
        self.database.name().to_string()
    }

    fn collection(&self, name: &str) -> RepoResult<Collection> {
        if name.is_empty() {
            log::error!("Empty collection name");
            return Err(RepoError::new(
                "Collection name cannot be empty",
                ErrorKind::InvalidArgument,
            ));
        }
        Ok(Collection::new(MongoCollection {
            collection: self.database.collection::<bson::Document>(name),
        }))
    }

    fn collection_names(&self) -> RepoResult<Vec<String>> {
        self.database.list_collection_names().run().map_err(backend_error)
    }
}

#[derive(Clone)]
pub struct MongoCollection {
    collection: mongodb::sync::Collection<bson::Document>,
}

impl CollectionProvider for MongoCollection {
    fn name(&self) -> String {
        self.collection.name().to_string()
    }

    fn insert_one(&self, document: Document) -> RepoResult<InsertResult> {
        let result = self
            .collection
            .insert_one(to_bson_document(&document))
            .run()
            .map_err(backend_error)?;
        Ok(InsertResult::new(vec![from_bson(result.inserted_id)?]))
    }

    fn insert_many(&self, documents: Vec<Document>) -> RepoResult<InsertResult> {
        if documents.is_empty() {
            return Ok(InsertResult::new(Vec::new()));
        }

        let documents: Vec<bson::Document> = documents.iter().map(to_bson_document).collect();
        let result = self
            .collection
            .insert_many(documents)
            .run()
            .map_err(backend_error)?;

        let mut indexed: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);
        let ids = indexed
            .into_iter()
            .map(|(_, id)| from_bson(id))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(InsertResult::new(ids))
    }

    fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
        options: &ReplaceOptions,
    ) -> RepoResult<UpdateResult> {
        let result = self
            .collection
            .replace_one(filter_to_bson(filter), to_bson_document(&replacement))
            .upsert(options.is_upsert())
            .run()
            .map_err(backend_error)?;
        to_update_result(result)
    }

    fn update_one(&self, filter: &Filter, update: &UpdateDefinition) -> RepoResult<UpdateResult> {
        let filter = filter_to_bson(filter);
        if update.is_empty() {
            // the server rejects an update without operators
            let matched = self
                .collection
                .count_documents(filter)
                .limit(1)
                .run()
                .map_err(backend_error)?;
            return Ok(UpdateResult::new(matched, 0, None));
        }

        let update = to_bson_document(&update.to_document()?);
        let result = self
            .collection
            .update_one(filter, update)
            .run()
            .map_err(backend_error)?;
        to_update_result(result)
    }

    fn delete_one(&self, filter: &Filter) -> RepoResult<DeleteResult> {
        let result = self
            .collection
            .delete_one(filter_to_bson(filter))
            .run()
            .map_err(backend_error)?;
        Ok(DeleteResult::new(result.deleted_count))
    }

    fn delete_many(&self, filter: &Filter) -> RepoResult<DeleteResult> {
        let result = self
            .collection
            .delete_many(filter_to_bson(filter))
            .run()
            .map_err(backend_error)?;
        Ok(DeleteResult::new(result.deleted_count))
    }

    fn find(&self, query: &Query) -> RepoResult<Vec<Document>> {
        let mut find = self.collection.find(filter_to_bson(query.get_filter()));
        if !query.get_sort_by().is_empty() {
            let mut sort = bson::Document::new();
            for (field, order) in query.get_sort_by() {
                sort.insert(field.clone(), order.direction());
            }
            find = find.sort(sort);
        }
        if let Some(skip) = query.get_skip() {
            find = find.skip(skip);
        }
        if let Some(limit) = query.get_limit() {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(fields) = query.get_projection() {
            let mut projection = bson::Document::new();
            for field in fields {
                projection.insert(field.clone(), 1);
            }
            find = find.projection(projection);
        }

        let cursor = find.run().map_err(backend_error)?;
        let mut documents = Vec::new();
        for document in cursor {
            let document = document.map_err(backend_error)?;
            documents.push(from_bson_document(document)?);
        }
        Ok(documents)
    }

    fn count(&self, filter: &Filter) -> RepoResult<u64> {
        self.collection
            .count_documents(filter_to_bson(filter))
            .run()
            .map_err(backend_error)
    }
}

/// Connects one driver client per connection string and reuses it.
#[derive(Clone, Default)]
pub struct MongoClientFactory {
    clients: Arc<DashMap<String, MongoClient>>,
}

impl MongoClientFactory {
    pub fn new() -> Self {
        MongoClientFactory::default()
    }
}

impl ClientFactory for MongoClientFactory {
    fn create_client(&self, connection_string: &ConnectionString) -> RepoResult<DocumentClient> {
        let scheme = connection_string.scheme();
        if scheme != MONGODB_SCHEME && scheme != MONGODB_SRV_SCHEME {
            log::error!("Unsupported scheme {} for a MongoDB client", scheme);
            return Err(RepoError::new(
                &format!("Unsupported scheme {} for a MongoDB client", scheme),
                ErrorKind::InvalidArgument,
            ));
        }

        if let Some(client) = self.clients.get(connection_string.as_str()) {
            return Ok(DocumentClient::new(client.value().clone()));
        }
        let client = MongoClient::connect(connection_string)?;
        self.clients
            .insert(connection_string.as_str().to_string(), client.clone());
        Ok(DocumentClient::new(client))
    }
}

fn backend_error(err: mongodb::error::Error) -> RepoError {
    let message = err.to_string();
    log::error!("MongoDB call failed: {}", message);
    let kind = if message.contains("E11000") {
        ErrorKind::DuplicateKey
    } else {
        ErrorKind::BackendError
    };
    RepoError::new(&message, kind)
}

fn to_update_result(result: mongodb::results::UpdateResult) -> RepoResult<UpdateResult> {
    let upserted_id = match result.upserted_id {
        Some(id) => Some(from_bson(id)?),
        None => None,
    };
    Ok(UpdateResult::new(
        result.matched_count,
        result.modified_count,
        upserted_id,
    ))
}

pub(crate) fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::I32(i) => Bson::Int32(*i),
        Value::I64(i) => Bson::Int64(*i),
        Value::F64(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::DateTime(d) => Bson::DateTime(bson::DateTime::from_millis(d.timestamp_millis())),
        Value::Document(d) => Bson::Document(to_bson_document(d)),
        Value::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
    }
}

/// Keys are copied verbatim, dotted update paths included.
pub(crate) fn to_bson_document(document: &Document) -> bson::Document {
    let mut converted = bson::Document::new();
    for (key, value) in document.iter() {
        converted.insert(key.clone(), to_bson(value));
    }
    converted
}

pub(crate) fn from_bson(value: Bson) -> RepoResult<Value> {
    let converted = match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::I32(i),
        Bson::Int64(i) => Value::I64(i),
        Bson::Double(f) => Value::F64(f),
        Bson::String(s) | Bson::Symbol(s) | Bson::JavaScriptCode(s) => Value::String(s),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        Bson::DateTime(d) => match DateTime::from_timestamp_millis(d.timestamp_millis()) {
            Some(date) => Value::DateTime(date),
            None => {
                log::error!("Date {} is out of range", d);
                return Err(RepoError::new(
                    &format!("Date {} is out of range", d),
                    ErrorKind::InvalidDataType,
                ));
            }
        },
        Bson::Document(d) => Value::Document(from_bson_document(d)?),
        Bson::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_bson)
                .collect::<RepoResult<Vec<_>>>()?,
        ),
        other => {
            log::error!("Unsupported BSON value {:?}", other);
            return Err(RepoError::new(
                &format!("Unsupported BSON type {:?}", other.element_type()),
                ErrorKind::InvalidDataType,
            ));
        }
    };
    Ok(converted)
}

pub(crate) fn from_bson_document(document: bson::Document) -> RepoResult<Document> {
    let mut converted = Document::new();
    for (key, value) in document {
        converted.insert_flat(key, from_bson(value)?);
    }
    Ok(converted)
}

pub(crate) fn filter_to_bson(filter: &Filter) -> bson::Document {
    match filter {
        Filter::All => bson::Document::new(),
        Filter::Eq(field, value) => bson::doc! { field.as_str(): to_bson(value) },
        Filter::Ne(field, value) => operator(field, "$ne", to_bson(value)),
        Filter::Gt(field, value) => operator(field, "$gt", to_bson(value)),
        Filter::Gte(field, value) => operator(field, "$gte", to_bson(value)),
        Filter::Lt(field, value) => operator(field, "$lt", to_bson(value)),
        Filter::Lte(field, value) => operator(field, "$lte", to_bson(value)),
        Filter::In(field, values) => {
            operator(field, "$in", Bson::Array(values.iter().map(to_bson).collect()))
        }
        Filter::NotIn(field, values) => {
            operator(field, "$nin", Bson::Array(values.iter().map(to_bson).collect()))
        }
        Filter::Exists(field, exists) => operator(field, "$exists", Bson::Boolean(*exists)),
        Filter::Regex(field, pattern) => operator(field, "$regex", Bson::String(pattern.clone())),
        Filter::And(filters) => logical("$and", filters),
        Filter::Or(filters) => logical("$or", filters),
        Filter::Not(filter) => bson::doc! { "$nor": [filter_to_bson(filter)] },
    }
}

fn operator(field: &str, operator: &str, value: Bson) -> bson::Document {
    bson::doc! { field: { operator: value } }
}

fn logical(operator: &str, filters: &[Filter]) -> bson::Document {
    if filters.is_empty() {
        // $and/$or reject empty arrays
        return match operator {
            "$or" => bson::doc! { "$expr": false },
            _ => bson::Document::new(),
        };
    }
    let clauses: Vec<Bson> = filters
        .iter()
        .map(|filter| Bson::Document(filter_to_bson(filter)))
        .collect();
    bson::doc! { operator: clauses }
}
