// ==========================================
// 乐观变更层测试
// ==========================================
// 场景: 成功后聚合值被权威值覆盖、失败后不留乐观状态、占位记录替换
// ==========================================

mod helpers;

use std::sync::Arc;

use helpers::*;
use workshop_production::api::{ApiError, MoveDirection};
use workshop_production::client::OptimisticMutationLayer;
use workshop_production::domain::{
    NewComponent, NewItem, StageDefinition, StagePatch, StageStatus, Zone, ZonePatch,
};
use workshop_production::engine::TemplateCatalog;
use workshop_production::repository::EntityStore;
use workshop_production::sync::RefetchTarget;

fn open_layer(env: &TestEnv, project_id: &str, item_id: &str) -> OptimisticMutationLayer {
    let layer = OptimisticMutationLayer::new(env.api.clone(), project_id);
    layer.refetch().unwrap();
    layer.open_item(item_id).unwrap();
    layer
}

#[test]
fn test_status_change_overwrites_guess_with_authoritative_aggregates() {
    let env = build_env();
    let (zone, item, component) = seed_kitchen(&env.api, "p1");
    let layer = open_layer(&env, "p1", &item.item_id);

    let stage_id = layer
        .with_mirror(|m| m.stages_of(&component.component_id)[0].stage_id.clone())
        .unwrap();
    let result = layer.set_stage_status(&stage_id, StageStatus::Completed).unwrap();
    assert_eq!(result.cascade.as_ref().unwrap().zone.progress, 14);

    layer
        .with_mirror(|m| {
            assert!(!m.has_pending());
            assert_eq!(m.stages.get(&stage_id).unwrap().status, StageStatus::Completed);
            assert_eq!(m.components.get(&component.component_id).unwrap().progress, 14);
            assert_eq!(m.items.get(&item.item_id).unwrap().progress, 14);
            assert_eq!(m.zones.get(&zone.zone_id).unwrap().progress, 14);
        })
        .unwrap();
}

#[test]
fn test_rejected_status_leaves_no_optimistic_state() {
    let env = build_env();
    let (_zone, item, _component) = seed_kitchen(&env.api, "p1");
    let layer = open_layer(&env, "p1", &item.item_id);

    let stage = layer
        .add_item_stage(&item.item_id, &StageDefinition::new("delivery", "Доставка", None))
        .unwrap()
        .stage;

    let err = layer
        .update_item_stage(
            &stage.stage_id,
            &StagePatch::status(StageStatus::Qa),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::UnsupportedStatus(_)));

    layer
        .with_mirror(|m| {
            assert!(!m.has_pending());
            assert_eq!(
                m.item_stages.get(&stage.stage_id).unwrap().status,
                StageStatus::Pending
            );
        })
        .unwrap();
}

#[test]
fn test_partial_cascade_failure_reloads_truth() {
    let mut failing = None;
    let env = build_env_with(TemplateCatalog::builtin(), |mut repos| {
        let store = FailingZoneStore::wrap(repos.zones.clone());
        failing = Some(store.clone());
        let zones: Arc<dyn EntityStore<Zone>> = store;
        repos.zones = zones;
        repos
    });
    let failing = failing.unwrap();
    let (zone, item, component) = seed_kitchen(&env.api, "p1");
    let layer = open_layer(&env, "p1", &item.item_id);
    let stage_id = layer
        .with_mirror(|m| m.stages_of(&component.component_id)[0].stage_id.clone())
        .unwrap();

    failing.set_failing(true);
    let err = layer
        .set_stage_status(&stage_id, StageStatus::Completed)
        .unwrap_err();
    assert!(err.is_partial_cascade());

    // 本地状态与存储一致：工序与低层聚合已写入，分区聚合过期
    layer
        .with_mirror(|m| {
            assert!(!m.has_pending());
            assert_eq!(m.stages.get(&stage_id).unwrap().status, StageStatus::Completed);
            assert_eq!(m.components.get(&component.component_id).unwrap().progress, 14);
            assert_eq!(m.items.get(&item.item_id).unwrap().progress, 14);
            assert_eq!(m.zones.get(&zone.zone_id).unwrap().progress, 0);
        })
        .unwrap();
}

#[test]
fn test_failed_zone_rename_rolls_back() {
    let env = build_env();
    let (zone, item, _component) = seed_kitchen(&env.api, "p1");
    let layer = open_layer(&env, "p1", &item.item_id);

    let patch = ZonePatch {
        name: Some("   ".to_string()),
        ..Default::default()
    };
    assert!(layer.update_zone(&zone.zone_id, &patch).unwrap_err().is_validation());

    layer
        .with_mirror(|m| {
            assert!(!m.has_pending());
            assert_eq!(m.zones.get(&zone.zone_id).unwrap().name, "Кухня");
        })
        .unwrap();
}

#[test]
fn test_placeholders_are_replaced_by_stored_records() {
    let env = build_env();
    let (zone, item, _component) = seed_kitchen(&env.api, "p1");
    let layer = open_layer(&env, "p1", &item.item_id);

    let created = layer
        .create_component(&item.item_id, NewComponent::named("Фасад").with_template("mdf"))
        .unwrap()
        .record;
    let new_item = layer
        .create_item(&zone.zone_id, NewItem::named("K-02", "Пенал"))
        .unwrap()
        .record;

    layer
        .with_mirror(|m| {
            assert!(!m.has_pending());
            let components = m.components_of(&item.item_id);
            assert_eq!(components.len(), 2);
            assert_eq!(components[1].component_id, created.component_id);
            assert_eq!(m.stages_of(&created.component_id).len(), 7);

            let items = m.items_of(&zone.zone_id);
            assert_eq!(items.len(), 2);
            assert_eq!(items[1].item_id, new_item.item_id);
            assert_eq!(m.zones.get(&zone.zone_id).unwrap().items_count, 2);
        })
        .unwrap();
}

#[test]
fn test_move_and_delete_stage_through_layer() {
    let env = build_env();
    let (_zone, item, component) = seed_kitchen(&env.api, "p1");
    let layer = open_layer(&env, "p1", &item.item_id);
    let ids: Vec<String> = layer
        .with_mirror(|m| {
            m.stages_of(&component.component_id)
                .iter()
                .map(|s| s.stage_id.clone())
                .collect()
        })
        .unwrap();

    assert!(layer
        .move_stage(&component.component_id, &ids[1], MoveDirection::Up)
        .unwrap());
    assert!(!layer
        .move_stage(&component.component_id, &ids[1], MoveDirection::Up)
        .unwrap());
    layer.delete_stage(&ids[6]).unwrap();

    let order: Vec<String> = layer
        .with_mirror(|m| {
            assert!(!m.has_pending());
            m.stages_of(&component.component_id)
                .iter()
                .map(|s| s.stage_id.clone())
                .collect()
        })
        .unwrap();
    assert_eq!(order.len(), 6);
    assert_eq!(order[0], ids[1]);
    assert_eq!(order[1], ids[0]);

    let stored: Vec<String> = component_stages(&env.api, &component.component_id)
        .into_iter()
        .map(|s| s.stage_id)
        .collect();
    assert_eq!(order, stored);
}

#[tokio::test]
async fn test_refetch_picks_up_changes_from_another_viewer() {
    let env = build_env();
    let (zone, item, component) = seed_kitchen(&env.api, "p1");
    let layer = open_layer(&env, "p1", &item.item_id);

    // 另一位查看者直接通过 API 修改
    let stage = component_stages(&env.api, &component.component_id).remove(0);
    env.api
        .update_stage(
            &stage.stage_id,
            &StagePatch::status(StageStatus::Completed),
        )
        .unwrap();
    env.api.delete_item(&item.item_id).unwrap();

    layer.refetch_project("p1").await.unwrap();

    layer
        .with_mirror(|m| {
            assert!(m.items_of(&zone.zone_id).is_empty());
            assert!(m.components_of(&item.item_id).is_empty());
            assert_eq!(m.open_item(), None);
            assert_eq!(m.zones.get(&zone.zone_id).unwrap().items_count, 0);
        })
        .unwrap();
}
