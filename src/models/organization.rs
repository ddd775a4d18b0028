use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::err::Error;
use crate::models::Entity;
use crate::schema::{Field, Id, OnDelete, Record, Schema};

pub static ORGANIZATION: Schema = Schema {
    name: "organization",
    table: "organizations",
    fields: &[
        Field::char("name", 255).unique(),
        Field::email("email", 100),
        Field::url("website", 200),
        Field::text("description").blank(),
        Field::char("logo", 255).null().blank(),
        Field::char("location", 255).null().blank(),
    ],
};

pub static MEMBERSHIP: Schema = Schema {
    name: "membership",
    table: "memberships",
    fields: &[
        Field::foreign_key("user_id", "users", OnDelete::Cascade),
        Field::foreign_key("organization_id", "organizations", OnDelete::Cascade),
        Field::datetime("joined_at").auto_now_add(),
    ],
};

/// Entity granting or sponsoring scholarships.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Organization {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub website: String,
    pub description: String,
    pub logo: Option<String>,
    pub location: Option<String>,
}

impl Entity for Organization {
    fn schema() -> &'static Schema {
        &ORGANIZATION
    }

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Organization {
            id: record.id,
            name: record.text("name")?,
            email: record.text("email")?,
            website: record.text("website")?,
            description: record.text("description")?,
            logo: record.opt_text("logo")?,
            location: record.opt_text("location")?,
        })
    }
}

/// Links a user to an organization. Removed together with either side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Membership {
    pub id: Id,
    pub user_id: Id,
    pub organization_id: Id,
    pub joined_at: DateTime<Utc>,
}

impl Entity for Membership {
    fn schema() -> &'static Schema {
        &MEMBERSHIP
    }

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Membership {
            id: record.id,
            user_id: record.reference("user_id")?,
            organization_id: record.reference("organization_id")?,
            joined_at: record.datetime("joined_at")?,
        })
    }
}
