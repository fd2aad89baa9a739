use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PersistenceError, Result};
use crate::migration::{MigrationArm, MigrationResolver, Plain};

/// A domain type persisted as one document per id.
///
/// Implementors describe where they live, which schema version they are
/// written with and how older stored shapes are brought forward on read.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Name used in not-found errors.
    const NAME: &'static str;
    /// Tag stamped on every save.
    const SCHEMA_VERSION: &'static str;
    const MIGRATIONS: &'static [MigrationArm] = &[];

    fn id(&self) -> &str;

    fn migration_resolver() -> MigrationResolver {
        MigrationResolver::new(Self::MIGRATIONS)
    }

    fn to_plain(&self) -> Result<Plain> {
        match serde_json::to_value(self)? {
            Value::Object(plain) => Ok(plain),
            other => Err(PersistenceError::Serialization(serde::ser::Error::custom(format!(
                "{} serialized to {} instead of an object",
                Self::NAME,
                crate::model::DataType::describe(&other)
            )))),
        }
    }

    fn from_plain(plain: Plain) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(plain))
    }
}

/// Entities owned by an organization and listed newest first.
pub trait TenantScoped: Entity {
    const OWNER_FIELD: &'static str = "organizationId";

    fn owner(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}
