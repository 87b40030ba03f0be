//! Loads the bundled data directory and exercises the resulting collection.

use std::path::PathBuf;

use items_content::{ContentFactory, ItemLoader, SettingsLoader};
use items_core::{EconValueFragment, FragmentKind, RuleKind, Tag};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

#[test]
fn bundled_content_loads() {
    let factory = ContentFactory::new(data_dir());

    let settings = factory.load_settings().unwrap();
    assert_eq!(settings.default_container_id, Some(Tag::from("Container.Backpack")));

    let items = factory.load_items().unwrap();
    assert_eq!(items.len(), 5);

    let registry = factory.load_containers().unwrap();
    assert_eq!(registry.len(), 4);

    let graph = factory.load_graph("player", &registry).unwrap();
    assert_eq!(graph.containers.len(), 4);
    assert_eq!(graph.links.len(), 2);
}

#[test]
fn built_collection_has_defaults_and_links() {
    let factory = ContentFactory::new(data_dir());
    let mut player = factory.build_collection("player", "player").unwrap();
    let backpack = Tag::from("Container.Backpack");
    let quiver = Tag::from("Container.Quiver");
    let hotbar = Tag::from("Container.Hotbar");
    let hand = Tag::from("Container.Hand");

    assert_eq!(player.default_container().map(|c| c.id().clone()), Some(backpack.clone()));
    let pack_view = player.view(&backpack).unwrap();
    assert_eq!(pack_view.total_item_count_by_def(&"gold_coin".into()), 25);
    assert_eq!(pack_view.total_item_count_by_def(&"health_potion".into()), 3);
    assert_eq!(
        player.view(&quiver).unwrap().total_item_count_by_def(&"arrow".into()),
        30
    );
    assert!(player.container(&hotbar).unwrap().rule(RuleKind::ParentLink).is_some());
    assert!(player.container(&hand).unwrap().rule(RuleKind::SelectionLink).is_some());

    let sword = player.create_item_in_container(&backpack, &"short_sword".into(), 1)[0];
    assert_eq!(player.item(sword).unwrap().tag_stat(&Tag::from("Stat.Damage")), 6);
    assert_eq!(player.add_item(&hotbar, sword, Some(0)), vec![sword]);
    assert_eq!(player.container(&hand).unwrap().item_at(0), Some(sword));

    assert!(player.create_item_in_container(&quiver, &"gold_coin".into(), 1).is_empty());
}

#[test]
fn econ_value_converts_to_counts() {
    let items = ItemLoader::load(&data_dir().join("items.ron")).unwrap();
    let arrow = items.iter().find(|d| d.id.as_str() == "arrow").unwrap();
    let value = arrow
        .find_fragment(FragmentKind::EconValue)
        .and_then(|f| f.as_econ_value())
        .copied()
        .unwrap();
    assert_eq!(value, EconValueFragment { value: 0.5 });
    assert_eq!(value.count_for_value(10.0, 1), 20);
}

#[test]
fn unreadable_files_report_their_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "zero_count_policy = 3").unwrap();

    let err = SettingsLoader::load(&path).unwrap_err();
    assert!(err.to_string().contains("settings"));

    let missing = ContentFactory::new(dir.path()).load_items().unwrap_err();
    assert!(missing.to_string().contains("items.ron"));
}
