//! Sessions built from the bundled content directory.
#![cfg(feature = "content")]

use std::path::PathBuf;

use items_content::ContentFactory;
use items_core::{
    ConditionEvaluator, ConditionId, ContainerCollection, ContainerCommand, EquipmentComponent,
    ItemInstance, NetRole, Tag,
};
use items_runtime::{ReplicaId, Runtime, SessionCommand};

struct InHand;

impl ConditionEvaluator for InHand {
    fn evaluate(&self, condition: &ConditionId, item: &ItemInstance, _: &ContainerCollection) -> bool {
        condition.0 == "in_hand" && item.containers().contains(&Tag::from("Container.Hand"))
    }
}

fn factory() -> ContentFactory {
    ContentFactory::new(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../items/content/data"),
    )
}

#[tokio::test]
async fn content_session_replicates_defaults_and_equipment() {
    let factory = factory();
    let runtime = Runtime::builder()
        .content(&factory, "hero", "player")
        .expect("content")
        .conditions(InHand)
        .build()
        .await
        .expect("runtime");
    let handle = runtime.handle();
    let backpack = Tag::from("Container.Backpack");
    let hotbar = Tag::from("Container.Hotbar");

    let sword = handle
        .create_item(backpack.clone(), "short_sword", 1)
        .await
        .expect("sword")[0];
    assert!(handle.equipment().await.expect("equipment").is_empty());

    handle
        .execute(SessionCommand::Container(ContainerCommand::AddItem {
            container: hotbar.clone(),
            item: sword,
            slot: Some(0),
        }))
        .await
        .expect("hotbar sword");
    let equipment = handle.equipment().await.expect("equipment");
    assert_eq!(equipment.len(), 1);
    assert_eq!(equipment[0].def.as_str(), "short_sword");

    let replica = factory
        .build_replica("hero", "player", NetRole::AutonomousProxy)
        .expect("replica");
    let mut client = handle
        .connect(
            ReplicaId(1),
            replica,
            EquipmentComponent::new("hero").with_role(NetRole::AutonomousProxy),
        )
        .await
        .expect("connect");
    client.recv_update().await.expect("initial update");

    assert!(client.is_converged());
    let view = client.collection().view(&backpack).expect("backpack");
    assert_eq!(view.total_item_count_by_def(&"gold_coin".into()), 25);
    assert_eq!(
        client
            .collection()
            .container(&Tag::from("Container.Hand"))
            .expect("hand")
            .item_at(0),
        Some(sword)
    );
    assert!(client
        .equipment()
        .find_equipment_by_def(&"short_sword".into())
        .is_some());
}
