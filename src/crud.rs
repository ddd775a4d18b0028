//! Typed create/read/update/delete over any [`Entity`], shared by the admin
//! handlers and library callers.

use chrono::Utc;
use serde_json::{Map, Value as Json};

use crate::err::Error;
use crate::models::Entity;
use crate::schema::{Id, Schema};
use crate::store::{Page, PageRequest, Store};

fn object(payload: Json) -> Result<Map<String, Json>, Error> {
    match payload {
        Json::Object(map) => Ok(map),
        _ => Err(Error::validation(
            "non_field_errors",
            "Expected a JSON object.",
        )),
    }
}

fn not_found(schema: &Schema, id: Id) -> Error {
    Error::not_found(format!("{} with id {} does not exist", schema.name, id))
}

pub async fn create<E: Entity>(store: &dyn Store, payload: Json) -> Result<E, Error> {
    let schema = E::schema();
    let mut payload = object(payload)?;
    E::prepare(&mut payload, true)?;
    let values = schema.build_insert(&payload, Utc::now())?;
    let record = store.insert(schema, values).await?;
    log::debug!("Created {} #{}", schema.name, record.id);
    E::from_record(&record)
}

pub async fn retrieve<E: Entity>(store: &dyn Store, id: Id) -> Result<E, Error> {
    let schema = E::schema();
    match store.fetch(schema, id).await? {
        Some(record) => E::from_record(&record),
        None => Err(not_found(schema, id)),
    }
}

pub async fn list<E: Entity>(store: &dyn Store, page: PageRequest) -> Result<Page<E>, Error> {
    page.validate()?;
    let (records, total) = store.list(E::schema(), page).await?;
    let items = records
        .iter()
        .map(E::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(items, total, page))
}

/// Partial update: fields absent from the payload keep their value.
pub async fn update<E: Entity>(store: &dyn Store, id: Id, payload: Json) -> Result<E, Error> {
    let schema = E::schema();
    let mut payload = object(payload)?;
    E::prepare(&mut payload, false)?;
    let changes = schema.build_changes(&payload)?;
    match store.update(schema, id, changes).await? {
        Some(record) => {
            log::debug!("Updated {} #{}", schema.name, id);
            E::from_record(&record)
        }
        None => Err(not_found(schema, id)),
    }
}

pub async fn delete<E: Entity>(store: &dyn Store, id: Id) -> Result<(), Error> {
    let schema = E::schema();
    if store.delete(schema, id).await? {
        log::debug!("Deleted {} #{}", schema.name, id);
        Ok(())
    } else {
        Err(not_found(schema, id))
    }
}
