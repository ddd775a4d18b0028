use std::fmt::Display;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::handler::Handler;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::admin::AdminSite;
use crate::err::{self, Error};
use crate::schema::{Id, Schema};
use crate::store::{Page, PageRequest, Store};
use crate::{proceeds, Payload};

/// Everything a request handler needs: the registered models and the store
/// behind them.
pub struct Console {
    pub site: AdminSite,
    pub store: Arc<dyn Store>,
}

impl Console {
    pub fn new(site: AdminSite, store: Arc<dyn Store>) -> Self {
        Self { site, store }
    }
}

type Shared = Extension<Arc<Console>>;

type Body = Result<Json<Value>, JsonRejection>;
type RecordPath = Result<Path<(String, Id)>, PathRejection>;

/// Maps an extractor rejection to a `ValidationError` on `field`.
fn rejected<R: Display>(field: &'static str) -> impl FnOnce(R) -> Error {
    move |rejection| Error::validation(field, rejection.to_string())
}

pub fn router(console: Console) -> Router {
    Router::new()
        .route("/schema", get(list_schemas))
        .route("/schema/:model", get(read_schema))
        .route("/admin/:model", get(list_records).post(create_record))
        .route(
            "/admin/:model/:id",
            get(read_record)
                .put(update_record)
                .patch(update_record)
                .delete(delete_record),
        )
        .fallback(err::handler404.into_service())
        .layer(Extension(Arc::new(console)))
}

#[derive(Debug, Serialize)]
struct SchemaIndex {
    models: Vec<&'static Schema>,
}

#[derive(Debug, Serialize)]
struct Deleted {
    model: String,
    id: Id,
}

async fn list_schemas(Extension(console): Shared) -> Payload<SchemaIndex> {
    proceeds(SchemaIndex {
        models: console.site.schemas(),
    })
}

async fn read_schema(Path(model): Path<String>, Extension(console): Shared) -> Payload<&'static Schema> {
    proceeds(console.site.model(&model)?.schema())
}

async fn list_records(
    Path(model): Path<String>,
    page: Result<Query<PageRequest>, QueryRejection>,
    Extension(console): Shared,
) -> Payload<Page<Value>> {
    let Query(page) = page.map_err(rejected("page"))?;
    let admin = console.site.model(&model)?;
    proceeds(admin.list(console.store.as_ref(), page).await?)
}

async fn create_record(
    Path(model): Path<String>,
    Extension(console): Shared,
    payload: Body,
) -> Payload<Value> {
    let Json(payload) = payload.map_err(rejected("non_field_errors"))?;
    let admin = console.site.model(&model)?;
    proceeds(admin.create(console.store.as_ref(), payload).await?)
}

async fn read_record(path: RecordPath, Extension(console): Shared) -> Payload<Value> {
    let Path((model, id)) = path.map_err(rejected("id"))?;
    let admin = console.site.model(&model)?;
    proceeds(admin.retrieve(console.store.as_ref(), id).await?)
}

async fn update_record(
    path: RecordPath,
    Extension(console): Shared,
    payload: Body,
) -> Payload<Value> {
    let Path((model, id)) = path.map_err(rejected("id"))?;
    let Json(payload) = payload.map_err(rejected("non_field_errors"))?;
    let admin = console.site.model(&model)?;
    proceeds(admin.update(console.store.as_ref(), id, payload).await?)
}

async fn delete_record(path: RecordPath, Extension(console): Shared) -> Payload<Deleted> {
    let Path((model, id)) = path.map_err(rejected("id"))?;
    let admin = console.site.model(&model)?;
    admin.delete(console.store.as_ref(), id).await?;
    log::info!("Deleted {} #{} through the console", model, id);
    proceeds(Deleted { model, id })
}
