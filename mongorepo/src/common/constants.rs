// document constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: &str = ".";

// update operators
pub const SET_OPERATOR: &str = "$set";
pub const UNSET_OPERATOR: &str = "$unset";
pub const INC_OPERATOR: &str = "$inc";

// shell literal wrappers
pub const ISO_DATE_WRAPPER: &str = "ISODate";
pub const NUMBER_LONG_WRAPPER: &str = "NumberLong";

// connection string schemes
pub const MONGODB_SCHEME: &str = "mongodb";
pub const MONGODB_SRV_SCHEME: &str = "mongodb+srv";
pub const MEMORY_SCHEME: &str = "memory";

pub const MONGOREPO_VERSION: &str = env!("CARGO_PKG_VERSION");
