use serde::Serialize;

use crate::err::Error;
use crate::models::Entity;
use crate::schema::{Field, Id, Record, Schema};

pub static SCHEMA: Schema = Schema {
    name: "category",
    table: "categories",
    fields: &[Field::char("name", 100).unique()],
};

/// Classification tag for scholarships.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
}

impl Entity for Category {
    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Category {
            id: record.id,
            name: record.text("name")?,
        })
    }
}
