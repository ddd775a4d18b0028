mod category;
mod organization;
mod scholarship;
mod user;

pub use category::Category;
pub use organization::{Membership, Organization};
pub use scholarship::Scholarship;
pub use user::{StudentProfile, User};

use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::err::Error;
use crate::schema::{Record, Schema};

/// A persisted record type. The schema drives validation, storage and the
/// console description; `from_record` is the explicit, per-entity decoding of
/// a stored row.
pub trait Entity: Serialize + Sized + Send + Sync + 'static {
    fn schema() -> &'static Schema;

    fn from_record(record: &Record) -> Result<Self, Error>;

    /// Rewrites an incoming payload before it is validated against the schema.
    fn prepare(_payload: &mut Map<String, Json>, _creating: bool) -> Result<(), Error> {
        Ok(())
    }
}
