use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use testbase_core::{attrs, merge_attributes, SequenceRegistry};
use testbase_database::{EntityStore, MemoryStore};
use testbase_factory::{
    BatchAttrs, BuilderOutput, DeferredInsert, EntityFactory, FactoryError, FactoryRegistry,
};

/// Registry with a `user` builder (deferred insert, sequenced email), a
/// `post` builder that auto-creates its owning user, and a
/// `user_with_posts` seed.
fn test_registry(sequences: Arc<SequenceRegistry>) -> Arc<FactoryRegistry<MemoryStore>> {
    let registry = FactoryRegistry::new()
        .builder("user", move |attrs_in, _factory: EntityFactory<MemoryStore>, _store| {
            let sequences = Arc::clone(&sequences);
            Box::pin(async move {
                let defaults = attrs(json!({
                    "name": "Test User",
                    "email": format!("user{}@example.com", sequences.next("users")),
                }));
                let values = merge_attributes(defaults, &attrs_in);
                Ok(BuilderOutput::from(DeferredInsert::new("users", values)))
            })
        })
        .builder("post", |attrs_in, factory, store| {
            Box::pin(async move {
                let user_id = match attrs_in.get("user_id") {
                    Some(id) => id.clone(),
                    None => {
                        let user = factory.insert("user", None).await?;
                        user.get("id").cloned().unwrap_or(JsonValue::Null)
                    }
                };
                let defaults = attrs(json!({"title": "Untitled"}));
                let mut values = merge_attributes(defaults, &attrs_in);
                values.insert("user_id".to_owned(), user_id);
                let row = store.insert_row("posts", &values).await?;
                Ok(BuilderOutput::Entity(row))
            })
        })
        .seed("user_with_posts", |attrs_in, factory, _store| {
            Box::pin(async move {
                let post_count = attrs_in
                    .get("post_count")
                    .and_then(|count| count.as_u64())
                    .unwrap_or(2) as usize;
                let user = factory.insert("user", Some(attrs_in)).await?;
                let user_id = user.get("id").cloned().unwrap_or(JsonValue::Null);
                let posts = factory
                    .insert_many(
                        post_count,
                        "post",
                        BatchAttrs::indexed(move |index| {
                            let mut post = attrs(json!({"title": format!("Post {}", index)}));
                            post.insert("user_id".to_owned(), user_id.clone());
                            post
                        }),
                    )
                    .await?;
                Ok(json!({"user": user, "posts": posts}))
            })
        });
    Arc::new(registry)
}

fn factory_with_store() -> (EntityFactory<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let registry = test_registry(Arc::new(SequenceRegistry::new()));
    (EntityFactory::new(registry, Arc::clone(&store)), store)
}

#[tokio::test]
async fn insert_performs_the_deferred_insert_for_the_builder() -> anyhow::Result<()> {
    let (factory, store) = factory_with_store();

    let user = factory.insert("user", None).await?;

    assert_eq!(user.get("name"), Some(&json!("Test User")));
    assert_eq!(user.get("email"), Some(&json!("user1@example.com")));
    assert!(user.get("id").is_some());
    assert_eq!(store.row_count("users").await, 1);
    Ok(())
}

#[tokio::test]
async fn attribute_overrides_beat_builder_defaults() -> anyhow::Result<()> {
    let (factory, _store) = factory_with_store();

    let user = factory
        .insert("user", Some(attrs(json!({"name": "Override"}))))
        .await?;

    assert_eq!(user.get("name"), Some(&json!("Override")));
    // Defaults the override did not touch are kept.
    assert_eq!(user.get("email"), Some(&json!("user1@example.com")));
    Ok(())
}

#[tokio::test]
async fn unknown_builder_fails_with_the_offending_name() {
    let (factory, _store) = factory_with_store();

    let err = factory.insert("doesNotExist", None).await.unwrap_err();

    assert!(matches!(err, FactoryError::BuilderNotFound(_)));
    assert!(err.to_string().contains("doesNotExist"));
}

#[tokio::test]
async fn unknown_seed_fails_with_the_offending_name() {
    let (factory, _store) = factory_with_store();

    let err = factory.seed("doesNotExist", None).await.unwrap_err();

    assert!(matches!(err, FactoryError::SeedNotFound(_)));
    assert!(err.to_string().contains("doesNotExist"));
}

#[tokio::test]
async fn insert_many_returns_count_entities_in_index_order() -> anyhow::Result<()> {
    let (factory, store) = factory_with_store();

    let users = factory
        .insert_many(
            3,
            "user",
            BatchAttrs::indexed(|index| attrs(json!({"name": format!("User {}", index)}))),
        )
        .await?;

    assert_eq!(users.len(), 3);
    for (index, user) in users.iter().enumerate() {
        assert_eq!(user.get("name"), Some(&json!(format!("User {}", index))));
    }
    assert_eq!(store.row_count("users").await, 3);
    Ok(())
}

#[tokio::test]
async fn insert_many_with_shared_attributes_repeats_them() -> anyhow::Result<()> {
    let (factory, _store) = factory_with_store();

    let users = factory
        .insert_many(2, "user", BatchAttrs::shared(attrs(json!({"name": "Same"}))))
        .await?;

    assert!(users.iter().all(|u| u.get("name") == Some(&json!("Same"))));
    Ok(())
}

#[tokio::test]
async fn insert_many_fails_fast_on_an_unknown_builder() {
    let (factory, _store) = factory_with_store();

    let err = factory
        .insert_many(3, "doesNotExist", BatchAttrs::None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("doesNotExist"));
}

#[tokio::test]
async fn post_builder_auto_creates_its_owning_user() -> anyhow::Result<()> {
    let (factory, store) = factory_with_store();

    let post = factory
        .insert("post", Some(attrs(json!({"title": "T"}))))
        .await?;

    assert_eq!(post.get("title"), Some(&json!("T")));
    let user_id = post.get("user_id").cloned().expect("post has a user_id");
    assert_ne!(user_id, JsonValue::Null);

    // The auto-created dependency is retrievable through the same store.
    let mut filter = testbase_core::Attributes::new();
    filter.insert("id".to_owned(), user_id);
    let owners = store.find_rows("users", &filter).await?;
    assert_eq!(owners.len(), 1);
    Ok(())
}

#[tokio::test]
async fn supplied_foreign_keys_suppress_dependency_creation() -> anyhow::Result<()> {
    let (factory, store) = factory_with_store();

    let user = factory.insert("user", None).await?;
    let user_id = user.get("id").cloned().unwrap();

    let mut post_attrs = attrs(json!({"title": "Linked"}));
    post_attrs.insert("user_id".to_owned(), user_id.clone());
    let post = factory.insert("post", Some(post_attrs)).await?;

    assert_eq!(post.get("user_id"), Some(&user_id));
    assert_eq!(store.row_count("users").await, 1);
    Ok(())
}

#[tokio::test]
async fn seeds_compose_builders_into_larger_scenarios() -> anyhow::Result<()> {
    let (factory, store) = factory_with_store();

    let result = factory
        .seed("user_with_posts", Some(attrs(json!({"post_count": 3}))))
        .await?;

    let posts = result.get("posts").and_then(|p| p.as_array()).unwrap();
    assert_eq!(posts.len(), 3);
    assert_eq!(store.row_count("users").await, 1);
    assert_eq!(store.row_count("posts").await, 3);

    let user_id = result.pointer("/user/id").cloned().unwrap();
    assert!(posts.iter().all(|p| p.get("user_id") == Some(&user_id)));
    Ok(())
}

#[tokio::test]
async fn sequenced_emails_never_collide_within_a_run() -> anyhow::Result<()> {
    let (factory, _store) = factory_with_store();

    let users = factory.insert_many(5, "user", BatchAttrs::None).await?;
    let mut emails: Vec<String> = users
        .iter()
        .map(|u| u.get("email").and_then(|e| e.as_str()).unwrap().to_owned())
        .collect();
    emails.sort();
    emails.dedup();
    assert_eq!(emails.len(), 5);
    Ok(())
}
