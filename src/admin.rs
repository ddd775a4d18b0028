use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::crud;
use crate::err::Error;
use crate::models::{Category, Entity, Membership, Organization, Scholarship, User};
use crate::schema::{FieldKind, Id, Schema};
use crate::store::{Page, PageRequest, Store};

/// CRUD surface the console drives for one registered model.
#[async_trait]
pub trait ModelAdmin: Send + Sync {
    fn schema(&self) -> &'static Schema;

    async fn list(&self, store: &dyn Store, page: PageRequest) -> Result<Page<Json>, Error>;

    async fn retrieve(&self, store: &dyn Store, id: Id) -> Result<Json, Error>;

    async fn create(&self, store: &dyn Store, payload: Json) -> Result<Json, Error>;

    async fn update(&self, store: &dyn Store, id: Id, payload: Json) -> Result<Json, Error>;

    async fn delete(&self, store: &dyn Store, id: Id) -> Result<(), Error>;
}

pub struct EntityAdmin<E> {
    marker: PhantomData<fn() -> E>,
}

impl<E> EntityAdmin<E> {
    pub fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<E> Default for EntityAdmin<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> ModelAdmin for EntityAdmin<E> {
    fn schema(&self) -> &'static Schema {
        E::schema()
    }

    async fn list(&self, store: &dyn Store, page: PageRequest) -> Result<Page<Json>, Error> {
        crud::list::<E>(store, page)
            .await?
            .try_map(|entity| serde_json::to_value(entity).map_err(Error::from))
    }

    async fn retrieve(&self, store: &dyn Store, id: Id) -> Result<Json, Error> {
        Ok(serde_json::to_value(crud::retrieve::<E>(store, id).await?)?)
    }

    async fn create(&self, store: &dyn Store, payload: Json) -> Result<Json, Error> {
        Ok(serde_json::to_value(crud::create::<E>(store, payload).await?)?)
    }

    async fn update(&self, store: &dyn Store, id: Id, payload: Json) -> Result<Json, Error> {
        Ok(serde_json::to_value(crud::update::<E>(store, id, payload).await?)?)
    }

    async fn delete(&self, store: &dyn Store, id: Id) -> Result<(), Error> {
        crud::delete::<E>(store, id).await
    }
}

/// Ordered table of registered models.
#[derive(Default)]
pub struct AdminSite {
    models: Vec<Box<dyn ModelAdmin>>,
}

impl AdminSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Entity>(&mut self) -> Result<&mut Self, Error> {
        self.register_admin(Box::new(EntityAdmin::<E>::new()))
    }

    /// Models referenced through a foreign key have to be registered first.
    pub fn register_admin(&mut self, admin: Box<dyn ModelAdmin>) -> Result<&mut Self, Error> {
        let schema = admin.schema();
        schema.validate()?;
        let taken = self.models.iter().any(|registered| {
            let other = registered.schema();
            other.name == schema.name || other.table == schema.table
        });
        if taken {
            return Err(Error::configuration(format!(
                "model `{}` is already registered",
                schema.name
            )));
        }
        for field in schema.fields {
            if let FieldKind::ForeignKey { to, .. } = field.kind {
                let known = to == schema.table
                    || self.models.iter().any(|model| model.schema().table == to);
                if !known {
                    return Err(Error::configuration(format!(
                        "field `{}.{}` references unregistered table `{}`",
                        schema.name, field.name, to
                    )));
                }
            }
        }
        log::info!(
            "Registered model `{}` (table `{}`)",
            schema.name,
            schema.table
        );
        self.models.push(admin);
        Ok(self)
    }

    pub fn model(&self, name: &str) -> Result<&(dyn ModelAdmin + 'static), Error> {
        self.models
            .iter()
            .find(|model| model.schema().name == name)
            .map(|model| &**model)
            .ok_or_else(|| Error::not_found(format!("model `{}` is not registered", name)))
    }

    pub fn models(&self) -> impl Iterator<Item = &(dyn ModelAdmin + 'static)> {
        self.models.iter().map(|model| &**model)
    }

    /// Schemas in registration order, which is also a valid table creation order.
    pub fn schemas(&self) -> Vec<&'static Schema> {
        self.models().map(|model| model.schema()).collect()
    }
}

pub fn default_site() -> Result<AdminSite, Error> {
    let mut site = AdminSite::new();
    site.register::<User>()?
        .register::<Category>()?
        .register::<Organization>()?
        .register::<Scholarship>()?
        .register::<Membership>()?;
    Ok(site)
}
