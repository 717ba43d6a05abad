//! Integration tests for the field-value repository using in-memory
//! SurrealDB.

use fieldkit_core::models::definition::EntityType;
use fieldkit_core::models::value::{AttrValue, UpsertFieldValue};
use fieldkit_core::repository::ValueRepository;
use fieldkit_db::repository::{SurrealValueRepository, value_record_id};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> SurrealValueRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fieldkit_db::run_migrations(&db).await.unwrap();
    SurrealValueRepository::new(db)
}

fn upsert_input(
    tenant_id: Uuid,
    field_id: Uuid,
    entity_id: &str,
    value: Option<AttrValue>,
) -> UpsertFieldValue {
    UpsertFieldValue {
        tenant_id,
        field_id,
        entity_type: EntityType::Material,
        entity_id: entity_id.into(),
        value,
    }
}

#[test]
fn record_ids_are_deterministic_per_tuple() {
    let tenant = Uuid::new_v4();
    let field = Uuid::new_v4();

    let a = value_record_id(tenant, field, EntityType::Material, "42");
    let b = value_record_id(tenant, field, EntityType::Material, "42");
    assert_eq!(a, b);

    let other_entity = value_record_id(tenant, field, EntityType::Material, "43");
    assert_ne!(a, other_entity);
    let other_type = value_record_id(tenant, field, EntityType::WorkOrder, "42");
    assert_ne!(a, other_type);
}

#[tokio::test]
async fn upsert_round_trips_integer_values() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let field = Uuid::new_v4();

    let stored = repo
        .upsert(upsert_input(
            tenant,
            field,
            "42",
            Some(AttrValue::Number(30.into())),
        ))
        .await
        .unwrap();
    assert_eq!(stored.value, Some(AttrValue::Number(30.into())));
    assert_eq!(stored.entity_id, "42");

    let listed = repo
        .list_for_entity(tenant, EntityType::Material, "42")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].value, Some(AttrValue::Number(30.into())));
    assert_eq!(listed[0].field_id, field);
}

#[tokio::test]
async fn upsert_overwrites_with_last_write() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let field = Uuid::new_v4();

    let first = repo
        .upsert(upsert_input(
            tenant,
            field,
            "42",
            Some(AttrValue::Text("draft".into())),
        ))
        .await
        .unwrap();
    let second = repo
        .upsert(upsert_input(
            tenant,
            field,
            "42",
            Some(AttrValue::Text("final".into())),
        ))
        .await
        .unwrap();

    assert_eq!(first.id, second.id, "same tuple must map to one row");

    let listed = repo
        .list_for_entity(tenant, EntityType::Material, "42")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1, "overwrite must not add a second row");
    assert_eq!(listed[0].value, Some(AttrValue::Text("final".into())));
}

#[tokio::test]
async fn stored_null_is_preserved() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let field = Uuid::new_v4();

    repo.upsert(upsert_input(
        tenant,
        field,
        "42",
        Some(AttrValue::Text("temp".into())),
    ))
    .await
    .unwrap();
    let cleared = repo
        .upsert(upsert_input(tenant, field, "42", None))
        .await
        .unwrap();
    assert_eq!(cleared.value, None);

    let listed = repo
        .list_for_entity(tenant, EntityType::Material, "42")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].value, None);
}

#[tokio::test]
async fn list_is_scoped_to_the_entity_instance() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let field = Uuid::new_v4();

    repo.upsert(upsert_input(
        tenant,
        field,
        "42",
        Some(AttrValue::Bool(true)),
    ))
    .await
    .unwrap();
    repo.upsert(upsert_input(
        tenant,
        field,
        "43",
        Some(AttrValue::Bool(false)),
    ))
    .await
    .unwrap();

    let listed = repo
        .list_for_entity(tenant, EntityType::Material, "42")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].entity_id, "42");

    let other_tenant = repo
        .list_for_entity(Uuid::new_v4(), EntityType::Material, "42")
        .await
        .unwrap();
    assert!(other_tenant.is_empty());
}

#[tokio::test]
async fn upsert_many_writes_the_batch_in_input_order() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let fields: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

    let inputs = vec![
        upsert_input(tenant, fields[0], "42", Some(AttrValue::Number(1.into()))),
        upsert_input(tenant, fields[1], "42", Some(AttrValue::Text("two".into()))),
        upsert_input(tenant, fields[2], "42", Some(AttrValue::Bool(true))),
    ];

    let written = repo.upsert_many(inputs).await.unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(written[0].field_id, fields[0]);
    assert_eq!(written[1].field_id, fields[1]);
    assert_eq!(written[2].field_id, fields[2]);

    let listed = repo
        .list_for_entity(tenant, EntityType::Material, "42")
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
}

#[tokio::test]
async fn upsert_many_overwrites_existing_rows() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let field = Uuid::new_v4();

    repo.upsert(upsert_input(
        tenant,
        field,
        "42",
        Some(AttrValue::Number(1.into())),
    ))
    .await
    .unwrap();

    let written = repo
        .upsert_many(vec![upsert_input(
            tenant,
            field,
            "42",
            Some(AttrValue::Number(2.into())),
        )])
        .await
        .unwrap();
    assert_eq!(written[0].value, Some(AttrValue::Number(2.into())));

    let listed = repo
        .list_for_entity(tenant, EntityType::Material, "42")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn upsert_many_with_empty_batch_is_a_no_op() {
    let repo = setup().await;
    let written = repo.upsert_many(Vec::new()).await.unwrap();
    assert!(written.is_empty());
}

#[tokio::test]
async fn multiselect_arrays_round_trip() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let field = Uuid::new_v4();

    let value = AttrValue::Many(vec![
        AttrValue::Text("A".into()),
        AttrValue::Text("B".into()),
    ]);
    let stored = repo
        .upsert(upsert_input(tenant, field, "42", Some(value.clone())))
        .await
        .unwrap();
    assert_eq!(stored.value, Some(value));
}
