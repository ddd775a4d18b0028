pub mod admin;
pub mod auth;
pub mod config;
pub mod crud;
pub mod err;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;

use axum::Json;
use serde::Serialize;

use crate::err::{Error, Fine, Success};

pub type Payload<T> = Result<Json<Success<T>>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(Fine(value)))
}
