mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::schema::{Field, Id, Record, Schema, Values};

pub const DEFAULT_PER_PAGE: u32 = 100;
pub const MAX_PER_PAGE: u32 = 1000;

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

/// One-based page selection, as sent by the console in the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: first_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.page == 0 {
            return Err(Error::validation("page", "Pages are numbered from 1."));
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(Error::validation(
                "per_page",
                format!("Ensure this value is between 1 and {}.", MAX_PER_PAGE),
            ));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub num_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let per_page = u64::from(request.per_page.max(1));
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            num_pages: (total + per_page - 1) / per_page,
        }
    }

    pub fn try_map<U, F>(self, f: F) -> Result<Page<U>, Error>
    where
        F: FnMut(T) -> Result<U, Error>,
    {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            num_pages: self.num_pages,
        })
    }
}

/// Persistence for schema-described tables. Implementations enforce unique
/// fields (absent values never collide), reject references to missing rows
/// and apply each foreign key's `on_delete` rule.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, schema: &'static Schema, values: Values) -> Result<Record, Error>;

    async fn fetch(&self, schema: &'static Schema, id: Id) -> Result<Option<Record>, Error>;

    /// Rows in ascending id order, with the total row count.
    async fn list(
        &self,
        schema: &'static Schema,
        page: PageRequest,
    ) -> Result<(Vec<Record>, u64), Error>;

    async fn update(
        &self,
        schema: &'static Schema,
        id: Id,
        changes: Values,
    ) -> Result<Option<Record>, Error>;

    /// Returns whether a row was removed.
    async fn delete(&self, schema: &'static Schema, id: Id) -> Result<bool, Error>;
}

pub(crate) fn conflict(schema: &Schema, field: &Field) -> Error {
    Error::conflict(
        field.name,
        format!("{} with this {} already exists.", schema.name, field.name),
    )
}

pub(crate) fn missing_reference(field: &Field, table: &str, id: Id) -> Error {
    Error::validation(
        field.name,
        format!("{} instance with id {} does not exist.", table, id),
    )
}
