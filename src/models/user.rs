use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::auth;
use crate::err::Error;
use crate::models::Entity;
use crate::schema::{Field, Id, Record, Schema};

pub static SCHEMA: Schema = Schema {
    name: "user",
    table: "users",
    fields: &[
        Field::username("username", 150).unique(),
        Field::char("first_name", 150).blank(),
        Field::char("last_name", 150).blank(),
        Field::email("email", 100).unique(),
        Field::char("password_hash", 128),
        Field::boolean("is_staff", false),
        Field::boolean("is_active", true),
        Field::datetime("date_joined").auto_now_add(),
        // student profile
        Field::char("search", 255).blank(),
        Field::char("intereses", 255).blank(),
        Field::char("phone_number", 15).null().blank().unique(),
        Field::date("birthday").null(),
    ],
};

/// An applicant account. Stored flat in `users`, the student-only columns are
/// grouped into [`StudentProfile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: StudentProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentProfile {
    pub search: String,
    pub intereses: String,
    pub phone_number: Option<String>,
    pub birthday: Option<NaiveDate>,
}

impl Entity for User {
    fn schema() -> &'static Schema {
        &SCHEMA
    }

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(User {
            id: record.id,
            username: record.text("username")?,
            first_name: record.text("first_name")?,
            last_name: record.text("last_name")?,
            email: record.text("email")?,
            password_hash: record.text("password_hash")?,
            is_staff: record.boolean("is_staff")?,
            is_active: record.boolean("is_active")?,
            date_joined: record.datetime("date_joined")?,
            profile: StudentProfile {
                search: record.text("search")?,
                intereses: record.text("intereses")?,
                phone_number: record.opt_text("phone_number")?,
                birthday: record.opt_date("birthday")?,
            },
        })
    }

    /// Clients send `password`; only its hash is stored.
    fn prepare(payload: &mut Map<String, Json>, creating: bool) -> Result<(), Error> {
        if payload.contains_key("password_hash") {
            return Err(Error::validation(
                "password_hash",
                "Set the password through `password`.",
            ));
        }
        match payload.remove("password") {
            Some(Json::String(password)) => {
                let hash = auth::make_password(&password)?;
                payload.insert("password_hash".to_string(), Json::String(hash));
            }
            Some(_) => return Err(Error::validation("password", "Expected a string.")),
            None if creating => {
                return Err(Error::validation("password", "This field is required."))
            }
            None => {}
        }
        Ok(())
    }
}
