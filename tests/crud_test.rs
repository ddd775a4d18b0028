use scholarship_admin::auth::check_password;
use scholarship_admin::crud;
use scholarship_admin::err::Error;
use scholarship_admin::models::{Category, Membership, Organization, Scholarship, User};
use scholarship_admin::store::{MemoryStore, PageRequest};
use serde_json::{json, Value};

fn student(username: &str, email: &str) -> Value {
    json!({
        "username": username,
        "email": email,
        "password": "hunter22",
    })
}

fn organization(name: &str) -> Value {
    json!({
        "name": name,
        "email": "contact@fundacion.org",
        "website": "https://fundacion.org",
    })
}

#[tokio::test]
async fn created_student_keeps_its_id() {
    let store = MemoryStore::new();
    let user: User = crud::create(
        &store,
        json!({
            "username": "lucia",
            "first_name": "Lucía",
            "last_name": "Gómez",
            "email": "lucia@example.org",
            "password": "hunter22",
            "search": "becas ingeniería",
            "intereses": "robótica",
            "phone_number": "+34600111222",
            "birthday": "2001-04-09",
        }),
    )
    .await
    .unwrap();

    assert_eq!(user.first_name, "Lucía");
    assert_eq!(user.last_name, "Gómez");
    assert_eq!(user.profile.phone_number.as_deref(), Some("+34600111222"));
    assert!(user.is_active);
    assert!(!user.is_staff);

    let read: User = crud::retrieve(&store, user.id).await.unwrap();
    assert_eq!(read, user);

    let updated: User = crud::update(&store, user.id, json!({"intereses": "música"}))
        .await
        .unwrap();
    assert_eq!(updated.id, user.id);
    assert_eq!(updated.profile.intereses, "música");
    assert_eq!(updated.profile.search, "becas ingeniería");
}

#[tokio::test]
async fn password_is_hashed_and_never_serialized() {
    let store = MemoryStore::new();
    let user: User = crud::create(&store, student("ana", "ana@example.org"))
        .await
        .unwrap();
    assert_ne!(user.password_hash, "hunter22");
    assert!(check_password("hunter22", &user.password_hash));

    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("password_hash").is_none());
    assert!(json.get("password").is_none());
    assert_eq!(json["phone_number"], Value::Null);

    let user: User = crud::update(&store, user.id, json!({"password": "n3w-pass"}))
        .await
        .unwrap();
    assert!(check_password("n3w-pass", &user.password_hash));
    assert!(!check_password("hunter22", &user.password_hash));
}

#[tokio::test]
async fn raw_hash_and_missing_password_are_rejected() {
    let store = MemoryStore::new();
    let err = crud::create::<User>(&store, json!({"username": "ana", "email": "ana@example.org"}))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("password"));

    let mut payload = student("ana", "ana@example.org");
    payload["password_hash"] = json!("pbkdf2$whatever");
    let err = crud::create::<User>(&store, payload).await.unwrap_err();
    assert_eq!(err.field(), Some("password_hash"));
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let store = MemoryStore::new();
    crud::create::<User>(&store, student("ana", "same@example.org"))
        .await
        .unwrap();
    let err = crud::create::<User>(&store, student("bea", "same@example.org"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ConflictError { .. }));
    assert_eq!(err.field(), Some("email"));
}

#[tokio::test]
async fn overlong_email_fails_validation() {
    let store = MemoryStore::new();
    let email = format!("{}@example.org", "a".repeat(95));
    let err = crud::create::<User>(&store, student("ana", &email))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationError { .. }));
    assert_eq!(err.field(), Some("email"));
}

#[tokio::test]
async fn absent_phone_numbers_never_conflict() {
    let store = MemoryStore::new();
    let first: User = crud::create(&store, student("ana", "ana@example.org"))
        .await
        .unwrap();
    let mut blank = student("bea", "bea@example.org");
    blank["phone_number"] = json!("");
    let second: User = crud::create(&store, blank).await.unwrap();
    assert_eq!(first.profile.phone_number, None);
    assert_eq!(second.profile.phone_number, None);

    let mut with_phone = student("carla", "carla@example.org");
    with_phone["phone_number"] = json!("600111222");
    crud::create::<User>(&store, with_phone).await.unwrap();
    let mut clash = student("dani", "dani@example.org");
    clash["phone_number"] = json!("600111222");
    let err = crud::create::<User>(&store, clash).await.unwrap_err();
    assert!(matches!(err, Error::ConflictError { .. }));
    assert_eq!(err.field(), Some("phone_number"));
}

#[tokio::test]
async fn update_cannot_steal_a_unique_value() {
    let store = MemoryStore::new();
    crud::create::<User>(&store, student("ana", "ana@example.org"))
        .await
        .unwrap();
    let bea: User = crud::create(&store, student("bea", "bea@example.org"))
        .await
        .unwrap();
    let err = crud::update::<User>(&store, bea.id, json!({"email": "ana@example.org"}))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("email"));

    let read: User = crud::retrieve(&store, bea.id).await.unwrap();
    assert_eq!(read.email, "bea@example.org");
}

#[tokio::test]
async fn read_only_fields_are_refused() {
    let store = MemoryStore::new();
    let user: User = crud::create(&store, student("ana", "ana@example.org"))
        .await
        .unwrap();
    let err = crud::update::<User>(
        &store,
        user.id,
        json!({"date_joined": "2020-01-01T00:00:00Z"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.field(), Some("date_joined"));
}

#[tokio::test]
async fn deleting_a_membership_keeps_both_sides() {
    let store = MemoryStore::new();
    let user: User = crud::create(&store, student("ana", "ana@example.org"))
        .await
        .unwrap();
    let org: Organization = crud::create(&store, organization("Fundación Luz"))
        .await
        .unwrap();
    let membership: Membership = crud::create(
        &store,
        json!({"user_id": user.id, "organization_id": org.id}),
    )
    .await
    .unwrap();

    crud::delete::<Membership>(&store, membership.id).await.unwrap();

    let err = crud::retrieve::<Membership>(&store, membership.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(crud::retrieve::<User>(&store, user.id).await.unwrap(), user);
    assert_eq!(
        crud::retrieve::<Organization>(&store, org.id).await.unwrap(),
        org
    );
}

#[tokio::test]
async fn deleting_an_organization_removes_its_memberships() {
    let store = MemoryStore::new();
    let user: User = crud::create(&store, student("ana", "ana@example.org"))
        .await
        .unwrap();
    let org: Organization = crud::create(&store, organization("Fundación Luz"))
        .await
        .unwrap();
    let membership: Membership = crud::create(
        &store,
        json!({"user_id": user.id, "organization_id": org.id}),
    )
    .await
    .unwrap();

    crud::delete::<Organization>(&store, org.id).await.unwrap();
    assert!(crud::retrieve::<Membership>(&store, membership.id)
        .await
        .is_err());
    assert!(crud::retrieve::<User>(&store, user.id).await.is_ok());
}

#[tokio::test]
async fn membership_needs_existing_rows() {
    let store = MemoryStore::new();
    let org: Organization = crud::create(&store, organization("Fundación Luz"))
        .await
        .unwrap();
    let err = crud::create::<Membership>(&store, json!({"user_id": 99, "organization_id": org.id}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationError { .. }));
    assert_eq!(err.field(), Some("user_id"));
}

#[tokio::test]
async fn scholarship_survives_its_category() {
    let store = MemoryStore::new();
    let category: Category = crud::create(&store, json!({"name": "Posgrado"}))
        .await
        .unwrap();
    let scholarship: Scholarship = crud::create(
        &store,
        json!({
            "name": "Beca Excelencia",
            "content": "Cubre matrícula y alojamiento.",
            "start_date": "2025-09-01",
            "end_date": "2026-06-30",
            "category_id": category.id,
        }),
    )
    .await
    .unwrap();
    assert_eq!(scholarship.category_id, Some(category.id));
    assert_eq!(scholarship.image, None);

    crud::delete::<Category>(&store, category.id).await.unwrap();
    let read: Scholarship = crud::retrieve(&store, scholarship.id).await.unwrap();
    assert_eq!(read.category_id, None);
    assert_eq!(read.name, "Beca Excelencia");
}

#[tokio::test]
async fn scholarship_dates_must_parse() {
    let store = MemoryStore::new();
    let err = crud::create::<Scholarship>(
        &store,
        json!({
            "name": "Beca",
            "content": "x",
            "start_date": "01/09/2025",
            "end_date": "2026-06-30",
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.field(), Some("start_date"));
}

#[tokio::test]
async fn organization_website_must_be_http() {
    let store = MemoryStore::new();
    let mut payload = organization("Fundación Luz");
    payload["website"] = json!("fundacion.org");
    let err = crud::create::<Organization>(&store, payload).await.unwrap_err();
    assert_eq!(err.field(), Some("website"));
}

#[tokio::test]
async fn listing_follows_creation_order() {
    let store = MemoryStore::new();
    let mut ids = Vec::new();
    for name in ["Grado", "Posgrado", "Doctorado", "Idiomas"] {
        let category: Category = crud::create(&store, json!({ "name": name })).await.unwrap();
        ids.push(category.id);
    }
    crud::delete::<Category>(&store, ids[1]).await.unwrap();

    let page = crud::list::<Category>(&store, PageRequest::default())
        .await
        .unwrap();
    let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Grado", "Doctorado", "Idiomas"]);
    assert_eq!(page.total, 3);

    let second = crud::list::<Category>(&store, PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "Idiomas");
    assert_eq!(second.num_pages, 2);
}

#[tokio::test]
async fn zero_page_is_rejected() {
    let store = MemoryStore::new();
    let err = crud::list::<Category>(&store, PageRequest::new(0, 10))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("page"));
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let store = MemoryStore::new();
    assert!(matches!(
        crud::delete::<Category>(&store, 7).await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        crud::update::<Category>(&store, 7, json!({"name": "x"})).await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn non_object_payloads_are_rejected() {
    let store = MemoryStore::new();
    let err = crud::create::<Category>(&store, json!(["Grado"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationError { .. }));
}
