// ==========================================
// 端到端场景: 厨房下柜
// ==========================================
// 分区 "Кухня" → 制品 "Нижний модуль" → 部件 "Корпус"（ЛДСП，7 道工序）
// 逐个完成工序，三级进度同步变化；删除唯一部件后归零
// ==========================================

mod helpers;

use helpers::*;
use workshop_production::domain::{
    EntityKind, NewComponentMaterial, NewComponentPart, StagePatch, StageStatus,
};
use workshop_production::engine::ChangeEventType;
use workshop_production::repository::EntityStore;
use workshop_production::sync::FeedSignal;

#[test]
fn test_kitchen_sequence_tracks_every_level() {
    let env = build_env();
    let (zone, item, component) = seed_kitchen(&env.api, "p-kitchen");

    assert_eq!(component.material.as_deref(), Some("ЛДСП"));
    let stages = component_stages(&env.api, &component.component_id);
    assert_eq!(stages.len(), 7);
    assert!(stages.iter().all(|s| s.status == StageStatus::Pending));

    let mut sequence = vec![progress_triple(&env, &component.component_id).0];
    for stage in &stages {
        env.api
            .update_stage(&stage.stage_id, &StagePatch::status(StageStatus::Completed))
            .unwrap();
        let (c, i, z) = progress_triple(&env, &component.component_id);
        assert_eq!(c, i);
        assert_eq!(i, z);
        sequence.push(c);
    }
    assert_eq!(sequence, vec![0, 14, 29, 43, 57, 71, 86, 100]);

    let snapshot = env.api.get_project_snapshot("p-kitchen").unwrap();
    assert_eq!(snapshot.zones.len(), 1);
    assert_eq!(snapshot.zones[0].zone_id, zone.zone_id);
    assert_eq!(snapshot.zones[0].progress, 100);
    assert_eq!(snapshot.items[0].item_id, item.item_id);

    env.api.delete_component(&component.component_id).unwrap();
    assert_eq!(env.repos.items.get(&item.item_id).unwrap().progress, 0);
    assert_eq!(env.repos.zones.get(&zone.zone_id).unwrap().progress, 0);
}

#[test]
fn test_component_detail_includes_materials_and_cut_list() {
    let env = build_env();
    let (_zone, item, component) = seed_kitchen(&env.api, "p-kitchen");

    env.api
        .create_material(
            &component.component_id,
            NewComponentMaterial {
                name: "Плита".to_string(),
                material_type: Some("ЛДСП".to_string()),
                thickness_mm: Some(16.0),
                brand: Some("Egger".to_string()),
                color: Some("Белый".to_string()),
                quantity: Some(2.5),
                unit: Some("м²".to_string()),
                notes: None,
            },
        )
        .unwrap();
    env.api
        .create_part(
            &component.component_id,
            NewComponentPart {
                name: "Боковина".to_string(),
                length_mm: Some(720.0),
                width_mm: Some(560.0),
                quantity: 2,
                edging: Some("ABS 0.4".to_string()),
                notes: None,
            },
        )
        .unwrap();

    let invalid = env.api.create_part(
        &component.component_id,
        NewComponentPart {
            name: "Полка".to_string(),
            quantity: 0,
            ..Default::default()
        },
    );
    assert!(invalid.unwrap_err().is_validation());

    let detail = env.api.get_item_detail(&item.item_id).unwrap();
    assert_eq!(detail.components.len(), 1);
    let component_detail = &detail.components[0];
    assert_eq!(component_detail.stages.len(), 7);
    assert_eq!(component_detail.materials.len(), 1);
    assert_eq!(component_detail.parts.len(), 1);
    assert_eq!(component_detail.parts[0].quantity, 2);

    // 删除部件时子记录随外键级联删除
    env.api.delete_component(&component.component_id).unwrap();
    assert!(env.repos.materials.list(&component.component_id).unwrap().is_empty());
    assert!(env.repos.parts.list(&component.component_id).unwrap().is_empty());
}

#[tokio::test]
async fn test_mutations_publish_change_events_for_project() {
    let env = build_env();
    let mut subscription = env.hub.subscribe("p-kitchen");
    let mut other = env.hub.subscribe("p-other");

    let (_zone, _item, component) = seed_kitchen(&env.api, "p-kitchen");
    let stage = component_stages(&env.api, &component.component_id).remove(0);
    env.api
        .update_stage(&stage.stage_id, &StagePatch::status(StageStatus::InProgress))
        .unwrap();

    let mut kinds = Vec::new();
    for _ in 0..4 {
        match subscription.recv().await {
            Some(FeedSignal::Changed(event)) => {
                assert_eq!(event.project_id, "p-kitchen");
                kinds.push((event.entity_kind, event.event_type));
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }
    assert_eq!(
        kinds,
        vec![
            (EntityKind::Zone, ChangeEventType::Insert),
            (EntityKind::Item, ChangeEventType::Insert),
            (EntityKind::Component, ChangeEventType::Insert),
            (EntityKind::Stage, ChangeEventType::Update),
        ]
    );

    // 其他项目的订阅收不到事件
    drop(env);
    assert!(other.recv().await.is_none());
}
