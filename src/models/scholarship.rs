use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::err::Error;
use crate::models::Entity;
use crate::schema::{Field, Id, OnDelete, Record, Schema};

pub static SCHEMA: Schema = Schema {
    name: "scholarship",
    table: "scholarships",
    fields: &[
        Field::char("name", 255),
        Field::text("content"),
        Field::date("start_date"),
        Field::date("end_date"),
        Field::char("image", 255).null().blank(),
        Field::datetime("published").auto_now_add(),
        Field::foreign_key("created_by_id", "users", OnDelete::SetNull).null(),
        Field::foreign_key("organization_id", "organizations", OnDelete::SetNull).null(),
        Field::foreign_key("category_id", "categories", OnDelete::SetNull).null(),
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scholarship {
    pub id: Id,
    pub name: String,
    pub content: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub image: Option<String>,
    pub published: DateTime<Utc>,
    pub created_by_id: Option<Id>,
    pub organization_id: Option<Id>,
    pub category_id: Option<Id>,
}

impl Entity for Scholarship {
    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Scholarship {
            id: record.id,
            name: record.text("name")?,
            content: record.text("content")?,
            start_date: record.date("start_date")?,
            end_date: record.date("end_date")?,
            image: record.opt_text("image")?,
            published: record.datetime("published")?,
            created_by_id: record.opt_reference("created_by_id")?,
            organization_id: record.opt_reference("organization_id")?,
            category_id: record.opt_reference("category_id")?,
        })
    }
}
