use scholarship_admin::admin::{default_site, AdminSite};
use scholarship_admin::err::Error;
use scholarship_admin::models::{Category, Entity, Membership, Organization, User};
use scholarship_admin::schema::{Field, Id, Record, Schema};
use scholarship_admin::store::{MemoryStore, PageRequest};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct Bare {
    id: Id,
}

static BARE: Schema = Schema {
    name: "bare",
    table: "bares",
    fields: &[],
};

impl Entity for Bare {
    fn schema() -> &'static Schema {
        &BARE
    }

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Bare { id: record.id })
    }
}

#[derive(Serialize)]
struct Shadow {
    id: Id,
}

static SHADOW: Schema = Schema {
    name: "shadow",
    table: "users",
    fields: &[Field::text("note")],
};

impl Entity for Shadow {
    fn schema() -> &'static Schema {
        &SHADOW
    }

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Shadow { id: record.id })
    }
}

#[test]
fn default_site_registers_every_model_in_order() {
    let site = default_site().unwrap();
    let names: Vec<_> = site.models().map(|model| model.schema().name).collect();
    assert_eq!(
        names,
        vec!["user", "category", "organization", "scholarship", "membership"]
    );
}

#[test]
fn registering_twice_is_a_configuration_error() {
    let mut site = AdminSite::new();
    site.register::<User>().unwrap();
    assert!(matches!(
        site.register::<User>(),
        Err(Error::ConfigurationError { .. })
    ));
}

#[test]
fn reusing_a_table_is_a_configuration_error() {
    let mut site = AdminSite::new();
    site.register::<User>().unwrap();
    assert!(matches!(
        site.register::<Shadow>(),
        Err(Error::ConfigurationError { .. })
    ));
}

#[test]
fn schema_without_fields_is_refused() {
    let mut site = AdminSite::new();
    assert!(matches!(
        site.register::<Bare>(),
        Err(Error::ConfigurationError { .. })
    ));
    assert_eq!(site.models().count(), 0);
}

#[test]
fn referenced_models_must_come_first() {
    let mut site = AdminSite::new();
    site.register::<User>().unwrap();
    assert!(matches!(
        site.register::<Membership>(),
        Err(Error::ConfigurationError { .. })
    ));

    site.register::<Organization>().unwrap();
    assert!(site.register::<Membership>().is_ok());
}

#[test]
fn unknown_model_is_not_found() {
    let site = default_site().unwrap();
    assert!(matches!(site.model("student"), Err(Error::NotFound { .. })));
    assert_eq!(site.model("category").unwrap().schema().table, "categories");
}

#[test]
fn users_table_layout() {
    let site = default_site().unwrap();
    let sql = site.model("user").unwrap().schema().create_table_sql();
    assert!(sql.contains("email VARCHAR(100) NOT NULL"));
    assert!(sql.contains("phone_number VARCHAR(15),"));
    assert!(sql.contains("birthday DATE,"));
    assert!(sql.contains("CONSTRAINT users_email_key UNIQUE (email)"));
    assert!(sql.contains("CONSTRAINT users_phone_number_key UNIQUE (phone_number)"));

    let sql = site.model("membership").unwrap().schema().create_table_sql();
    assert!(sql.contains("REFERENCES organizations (id) ON DELETE CASCADE"));
}

#[tokio::test]
async fn registered_handlers_speak_json() {
    let mut site = AdminSite::new();
    site.register::<Category>().unwrap();
    let store = MemoryStore::new();
    let admin = site.model("category").unwrap();

    let created = admin
        .create(&store, json!({"name": "Grado"}))
        .await
        .unwrap();
    assert_eq!(created, json!({"id": 1, "name": "Grado"}));

    let updated = admin
        .update(&store, 1, json!({"name": "Grado universitario"}))
        .await
        .unwrap();
    assert_eq!(updated["name"], "Grado universitario");
    assert_eq!(admin.retrieve(&store, 1).await.unwrap(), updated);

    let page = admin.list(&store, PageRequest::default()).await.unwrap();
    assert_eq!(page.items, vec![updated]);

    admin.delete(&store, 1).await.unwrap();
    assert!(admin.list(&store, PageRequest::default()).await.unwrap().items.is_empty());
}
