//! Saving and restoring the authoritative collection.

use std::sync::Arc;

use items_core::{
    ContainerCollection, ContainerDefinition, ItemCatalog, ItemDefinition, ItemSettings,
    ParentLink, Tag,
};
use items_runtime::{
    FileSaveRepository, InMemorySaveRepository, Runtime, RuntimeConfig, RuntimeError, SaveFormat,
    SaveRepository,
};

fn collection() -> ContainerCollection {
    let catalog: ItemCatalog = [
        ItemDefinition::new("herb", "Herb"),
        ItemDefinition::new("staff", "Staff"),
    ]
    .into_iter()
    .collect();
    let mut items = ContainerCollection::new("mage", ItemSettings::new(), Arc::new(catalog));
    items
        .add_container(
            "Container.Satchel",
            Arc::new(ContainerDefinition::new("satchel").with_slot_limit(6)),
        )
        .expect("satchel");
    items
        .add_container(
            "Container.Belt",
            Arc::new(
                ContainerDefinition::new("belt")
                    .with_slot_limit(2)
                    .with_rule(ParentLink {
                        linked_container: Some(Tag::from("Container.Satchel")),
                    }),
            ),
        )
        .expect("belt");
    items
}

fn satchel() -> Tag {
    Tag::from("Container.Satchel")
}

#[tokio::test]
async fn file_saves_restore_contents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = RuntimeConfig {
        save_dir: Some(dir.path().to_path_buf()),
        ..RuntimeConfig::default()
    };

    let runtime = Runtime::builder()
        .config(config.clone())
        .collection(collection())
        .build()
        .await
        .expect("runtime");
    let handle = runtime.handle();
    handle.create_item(satchel(), "herb", 9).await.expect("herbs");
    let staff = handle.create_item(satchel(), "staff", 1).await.expect("staff")[0];
    handle
        .execute(items_runtime::SessionCommand::Container(
            items_core::ContainerCommand::AddItem {
                container: Tag::from("Container.Belt"),
                item: staff,
                slot: Some(1),
            },
        ))
        .await
        .expect("belt staff");
    handle.save().await.expect("save");
    assert!(dir.path().join("save_mage.bin").exists());

    let restored = Runtime::builder()
        .config(config)
        .collection(collection())
        .build()
        .await
        .expect("second runtime");
    let restored_handle = restored.handle();
    assert_eq!(restored_handle.load().await.expect("load"), 2);

    let saved = handle.snapshot().await.expect("saved snapshot");
    let loaded = restored_handle.snapshot().await.expect("loaded snapshot");
    assert_eq!(loaded.items.len(), saved.items.len());
    let counts = |snapshot: &items_core::CollectionSnapshot| {
        let mut counts: Vec<(String, u32)> = snapshot
            .items
            .values()
            .map(|item| (item.def.to_string(), item.count))
            .collect();
        counts.sort();
        counts
    };
    assert_eq!(counts(&loaded), counts(&saved));
}

#[tokio::test]
async fn json_saves_are_readable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repository = Arc::new(
        FileSaveRepository::with_format(dir.path(), SaveFormat::Json).expect("repository"),
    );
    let runtime = Runtime::builder()
        .collection(collection())
        .repository(repository.clone())
        .build()
        .await
        .expect("runtime");
    let handle = runtime.handle();
    handle.create_item(satchel(), "herb", 4).await.expect("herbs");
    handle.save().await.expect("save");

    let text = std::fs::read_to_string(dir.path().join("save_mage.json")).expect("json save");
    assert!(text.contains("herb"));
    assert_eq!(repository.list_keys().expect("keys"), vec!["mage".to_string()]);
}

#[tokio::test]
async fn loading_requires_a_save() {
    let runtime = Runtime::builder()
        .collection(collection())
        .build()
        .await
        .expect("runtime");
    let error = runtime.handle().save().await.expect_err("no repository");
    assert!(matches!(error, RuntimeError::NoRepository));

    let runtime = Runtime::builder()
        .collection(collection())
        .repository(Arc::new(InMemorySaveRepository::new()))
        .build()
        .await
        .expect("runtime");
    let error = runtime.handle().load().await.expect_err("missing save");
    assert!(matches!(error, RuntimeError::MissingSave { .. }));
}

#[test]
fn in_memory_repository_round_trips() {
    let repository = InMemorySaveRepository::new();
    let data = collection().commit_save_data();

    repository.save("mage", &data).expect("save");
    assert!(repository.exists("mage"));
    assert_eq!(repository.load("mage").expect("load"), Some(data));

    repository.delete("mage").expect("delete");
    assert!(!repository.exists("mage"));
    assert!(repository.list_keys().expect("keys").is_empty());
}
