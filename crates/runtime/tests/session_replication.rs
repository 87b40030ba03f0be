//! Server session and client replicas over in-process channels.

use std::sync::Arc;

use tokio::sync::mpsc;

use items_core::{
    ContainerCollection, ContainerDefinition, EquipmentComponent, EquipmentEvent,
    EquipmentFragment, EquipmentSpec, Fragment, ItemCatalog, ItemDefinition, ItemSettings,
    NetExecutionPolicy, NetRole, ParentLink, Tag,
};
use items_runtime::{
    Event, ReplicaId, ReplicaRole, ReplicationUpdate, Runtime, RuntimeError, SessionCommand,
    Topic,
};

fn catalog() -> Arc<ItemCatalog> {
    Arc::new(
        [
            ItemDefinition::new("coin", "Coin"),
            ItemDefinition::new("lamp", "Lamp").with_fragment(Fragment::Equipment(
                EquipmentFragment {
                    equipment: "lamp_light".into(),
                    condition: None,
                },
            )),
        ]
        .into_iter()
        .collect(),
    )
}

/// Pack is predicted on the owning client; Quick lists items of Pack.
fn collection(role: NetRole) -> ContainerCollection {
    let mut items = ContainerCollection::new("hero", ItemSettings::new(), catalog()).with_role(role);
    items
        .add_container(
            "Container.Pack",
            Arc::new(
                ContainerDefinition::new("pack")
                    .with_slot_limit(8)
                    .with_net_policy(NetExecutionPolicy::LocalPredicted),
            ),
        )
        .expect("pack container");
    items
        .add_container(
            "Container.Quick",
            Arc::new(
                ContainerDefinition::new("quick")
                    .with_slot_limit(2)
                    .with_rule(ParentLink {
                        linked_container: Some(Tag::from("Container.Pack")),
                    }),
            ),
        )
        .expect("quick container");
    items
}

async fn start() -> Runtime {
    Runtime::builder()
        .collection(collection(NetRole::Authority))
        .build()
        .await
        .expect("runtime should start")
}

fn replica_equipment() -> EquipmentComponent {
    EquipmentComponent::new("hero").with_role(NetRole::AutonomousProxy)
}

#[tokio::test]
async fn connecting_replica_receives_full_state() {
    let runtime = start().await;
    let handle = runtime.handle();
    handle
        .create_item("Container.Pack", "coin", 12)
        .await
        .expect("create coins");

    let mut client = handle
        .connect(
            ReplicaId(1),
            collection(NetRole::AutonomousProxy),
            replica_equipment(),
        )
        .await
        .expect("connect");
    client.recv_update().await.expect("initial update");

    assert_eq!(client.last_sequence(), 1);
    assert!(client.is_converged());
    assert_eq!(
        client.collection().snapshot(),
        handle.snapshot().await.expect("server snapshot")
    );
}

#[tokio::test]
async fn client_equipment_applies_only_after_the_server() {
    let runtime = start().await;
    let handle = runtime.handle();
    let mut client = handle
        .connect(
            ReplicaId(1),
            collection(NetRole::AutonomousProxy),
            replica_equipment(),
        )
        .await
        .expect("connect");
    client.recv_update().await.expect("initial update");

    client
        .equipment_mut()
        .apply_equipment_spec(EquipmentSpec::new("torch"), None);
    assert!(client.equipment().all_equipment().is_empty());

    let outcome = client.flush().await.expect("forward");
    assert_eq!(outcome.applied, 1);
    assert!(outcome.rejected.is_empty());
    assert!(client.equipment().all_equipment().is_empty());

    client.recv_update().await.expect("equipment update");
    let torch = client
        .equipment()
        .find_equipment_by_def(&"torch".into())
        .expect("torch replicated");
    assert!(torch.equipped);
    assert!(matches!(
        client.take_equipment_events().as_slice(),
        [EquipmentEvent::Equipped { .. }]
    ));
    assert_eq!(handle.equipment().await.expect("server equipment").len(), 1);
}

#[tokio::test]
async fn predicted_moves_converge_after_replay() {
    let runtime = start().await;
    let handle = runtime.handle();
    let pack = Tag::from("Container.Pack");
    let quick = Tag::from("Container.Quick");
    handle.create_item(pack.clone(), "coin", 30).await.expect("coins");
    let lamp = handle.create_item(pack.clone(), "lamp", 1).await.expect("lamp")[0];

    let mut client = handle
        .connect(
            ReplicaId(7),
            collection(NetRole::AutonomousProxy),
            replica_equipment(),
        )
        .await
        .expect("connect");
    client.recv_update().await.expect("initial update");

    assert!(client.collection_mut().swap_items(&pack, 0, 1));
    assert_eq!(client.collection().container(&pack).unwrap().item_at(0), Some(lamp));
    client.collection_mut().add_item(&quick, lamp, None);

    let outcome = client.flush().await.expect("forward");
    assert!(outcome.rejected.is_empty());
    client.recv_update().await.expect("replayed state");

    assert!(client.is_converged());
    assert!(client.collection().container(&quick).unwrap().contains(lamp));
    assert_eq!(
        client.collection().snapshot(),
        handle.snapshot().await.expect("server snapshot")
    );
}

#[tokio::test]
async fn equipment_follows_items_with_an_equipment_fragment() {
    let runtime = start().await;
    let handle = runtime.handle();
    let mut equipment_events = handle.subscribe(Topic::Equipment);

    let lamp = handle
        .create_item("Container.Pack", "lamp", 1)
        .await
        .expect("lamp")[0];
    let granted = handle.equipment().await.expect("equipment");
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].instigator, Some(lamp));
    assert!(matches!(
        equipment_events.recv().await.expect("equipment event"),
        Event::Equipment(_)
    ));

    handle
        .execute(SessionCommand::Container(
            items_core::ContainerCommand::RemoveItem {
                container: Tag::from("Container.Pack"),
                item: lamp,
            },
        ))
        .await
        .expect("remove lamp");
    assert!(handle.equipment().await.expect("equipment").is_empty());
}

#[tokio::test]
async fn observers_receive_updates_but_cannot_forward() {
    let runtime = start().await;
    let handle = runtime.handle();
    let mut observer = handle
        .connect_as(
            ReplicaId(2),
            ReplicaRole::Observer,
            collection(NetRole::SimulatedProxy),
            EquipmentComponent::new("hero").with_role(NetRole::SimulatedProxy),
        )
        .await
        .expect("connect observer");
    observer.recv_update().await.expect("initial update");

    handle.create_item("Container.Pack", "coin", 3).await.expect("coins");
    observer.recv_update().await.expect("coin update");
    assert_eq!(
        observer
            .collection()
            .view(&Tag::from("Container.Pack"))
            .unwrap()
            .total_item_count(),
        3
    );

    let error = handle
        .forward(ReplicaId(2), Default::default())
        .await
        .expect_err("observer forward");
    assert!(matches!(error, RuntimeError::ReadOnlyReplica { .. }));
}

#[tokio::test]
async fn replicas_are_rejected_in_bad_states() {
    let runtime = start().await;
    let handle = runtime.handle();

    let error = handle
        .connect(ReplicaId(1), collection(NetRole::Authority), replica_equipment())
        .await
        .expect_err("authority replica");
    assert!(matches!(error, RuntimeError::AuthorityReplica { .. }));

    let _client = handle
        .connect(
            ReplicaId(1),
            collection(NetRole::AutonomousProxy),
            replica_equipment(),
        )
        .await
        .expect("connect");
    let error = handle
        .connect(
            ReplicaId(1),
            collection(NetRole::AutonomousProxy),
            replica_equipment(),
        )
        .await
        .expect_err("duplicate replica");
    assert!(matches!(error, RuntimeError::ReplicaAlreadyConnected { .. }));

    let (closed_tx, closed_rx) = mpsc::channel::<ReplicationUpdate>(1);
    drop(closed_rx);
    let error = handle
        .connect_sink(ReplicaId(9), ReplicaRole::Owner, Box::new(closed_tx))
        .await
        .expect_err("closed sink");
    assert!(matches!(error, RuntimeError::UpdateChannelClosed { .. }));

    let error = handle.disconnect(ReplicaId(9)).await.expect_err("already dropped");
    assert!(matches!(error, RuntimeError::UnknownReplica { .. }));
}

#[tokio::test]
async fn updates_apply_in_sequence_order() {
    let runtime = start().await;
    let handle = runtime.handle();
    let (update_tx, mut update_rx) = mpsc::channel::<ReplicationUpdate>(8);
    handle
        .connect_sink(ReplicaId(3), ReplicaRole::Owner, Box::new(update_tx))
        .await
        .expect("connect sink");
    handle.create_item("Container.Pack", "coin", 4).await.expect("coins");

    let first = update_rx.recv().await.expect("first update");
    let second = update_rx.recv().await.expect("second update");
    assert_eq!((first.sequence, second.sequence), (1, 2));
    assert_eq!(
        second.state_root,
        handle.state_root().await.expect("server root")
    );

    let mut client = handle
        .connect(
            ReplicaId(4),
            collection(NetRole::AutonomousProxy),
            replica_equipment(),
        )
        .await
        .expect("connect");
    let error = client.apply_update(second).expect_err("skipped sequence");
    assert!(matches!(
        error,
        RuntimeError::OutOfOrderUpdate {
            expected: 1,
            received: 2
        }
    ));
    client.apply_pending().expect("pending updates");
    assert_eq!(client.last_sequence(), 1);
}

#[tokio::test]
async fn unknown_containers_are_reported() {
    let runtime = start().await;
    let handle = runtime.handle();

    let error = handle
        .create_item("Container.Missing", "coin", 1)
        .await
        .expect_err("missing container");
    assert!(matches!(error, RuntimeError::Container(_)));
}

#[tokio::test]
async fn shutdown_waits_for_handles() {
    let runtime = start().await;
    let handle = runtime.handle();
    let mut replication = handle.subscribe(Topic::Replication);
    let client = handle
        .connect(
            ReplicaId(5),
            collection(NetRole::AutonomousProxy),
            replica_equipment(),
        )
        .await
        .expect("connect");
    assert!(matches!(
        replication.recv().await.expect("connected"),
        Event::Replication(items_runtime::ReplicationEvent::Connected { .. })
    ));

    client.disconnect().await.expect("disconnect");
    drop(handle);
    runtime.shutdown().await.expect("shutdown");
}
