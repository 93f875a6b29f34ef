// ==========================================
// 进度级联集成测试
// ==========================================
// 场景: 部件 → 制品 → 分区 三级重算、幂等、空集合、部分失败
// ==========================================

mod helpers;

use std::sync::Arc;

use helpers::*;
use workshop_production::api::ApiError;
use workshop_production::domain::{
    EntityKind, ItemPatch, NewComponent, NewItem, StageDefinition, StagePatch, StageStatus, Zone,
};
use workshop_production::engine::{
    AggregationEngine, CascadeError, CascadeLevel, TemplateCatalog,
};
use workshop_production::repository::EntityStore;

fn four_stage_component(env: &TestEnv, item_id: &str, name: &str) -> String {
    let component = env
        .api
        .create_component(item_id, NewComponent::named(name))
        .unwrap()
        .record;
    for key in ["a", "b", "c", "d"] {
        env.api
            .add_stage(
                &component.component_id,
                &StageDefinition::new(key, &key.to_uppercase(), None),
            )
            .unwrap();
    }
    component.component_id
}

fn complete(env: &TestEnv, stage_id: &str) {
    env.api
        .update_stage(stage_id, &StagePatch::status(StageStatus::Completed))
        .unwrap();
}

#[test]
fn test_third_completed_stage_propagates_to_item_and_zone() {
    let env = build_env();
    let zone = env.api.create_zone("p1", "Цех").unwrap().record;
    let item = env
        .api
        .create_item(&zone.zone_id, NewItem::named("A-1", "Шкаф"))
        .unwrap()
        .record;
    let sibling_item = env
        .api
        .create_item(&zone.zone_id, NewItem::named("A-2", "Тумба"))
        .unwrap()
        .record;

    let target = four_stage_component(&env, &item.item_id, "Корпус");
    let other = four_stage_component(&env, &item.item_id, "Фасад");

    let stages = component_stages(&env.api, &target);
    complete(&env, &stages[0].stage_id);
    complete(&env, &stages[1].stage_id);
    assert_eq!(progress_triple(&env, &target), (50, 25, 13));

    let result = env
        .api
        .update_stage(&stages[2].stage_id, &StagePatch::status(StageStatus::Completed))
        .unwrap();
    let outcome = result.cascade.expect("component stage must cascade");

    // (75 + 0) / 2 = 37.5 → 38；(38 + 0) / 2 = 19
    assert_eq!(outcome.component.as_ref().map(|c| c.progress), Some(75));
    assert_eq!(outcome.item.progress, 38);
    assert_eq!(outcome.zone.progress, 19);
    assert_eq!(progress_triple(&env, &target), (75, 38, 19));

    assert_eq!(env.repos.components.get(&other).unwrap().progress, 0);
    assert_eq!(env.repos.items.get(&sibling_item.item_id).unwrap().progress, 0);
}

#[test]
fn test_cascade_is_idempotent() {
    let env = build_env();
    let (_zone, _item, component) = seed_kitchen(&env.api, "p1");
    let stages = component_stages(&env.api, &component.component_id);
    complete(&env, &stages[0].stage_id);
    complete(&env, &stages[3].stage_id);

    let aggregation = AggregationEngine::new(env.repos.clone());
    let first = aggregation.recalculate_cascade(&component.component_id).unwrap();
    let second = aggregation.recalculate_cascade(&component.component_id).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.component.map(|c| c.progress), Some(29));
}

#[test]
fn test_empty_levels_report_zero() {
    let env = build_env();
    let zone = env.api.create_zone("p1", "Пустая").unwrap().record;
    assert_eq!(zone.progress, 0);

    let item = env
        .api
        .create_item(&zone.zone_id, NewItem::named("E-1", "Без деталей"))
        .unwrap();
    assert_eq!(item.record.progress, 0);
    assert_eq!(item.zone.as_ref().map(|z| z.items_count), Some(1));

    let component = env
        .api
        .create_component(&item.record.item_id, NewComponent::named("Без этапов"))
        .unwrap();
    assert_eq!(component.record.progress, 0);
    let cascade = component.cascade.unwrap();
    assert_eq!(cascade.item.progress, 0);
    assert_eq!(cascade.zone.progress, 0);
}

#[test]
fn test_deleting_only_component_resets_item_and_recomputes_zone() {
    let env = build_env();
    let (zone, item, component) = seed_kitchen(&env.api, "p1");
    let finished = env
        .api
        .create_item(&zone.zone_id, NewItem::named("K-02", "Верхний модуль"))
        .unwrap()
        .record;
    let finished_component = env
        .api
        .create_component(&finished.item_id, NewComponent::named("Корпус").with_template("ldsp"))
        .unwrap()
        .record;
    for stage in component_stages(&env.api, &finished_component.component_id) {
        complete(&env, &stage.stage_id);
    }
    for stage in component_stages(&env.api, &component.component_id).iter().take(2) {
        complete(&env, &stage.stage_id);
    }
    assert_eq!(progress_triple(&env, &component.component_id), (29, 29, 65));

    let deleted = env.api.delete_component(&component.component_id).unwrap();
    let cascade = deleted.cascade.unwrap();
    assert_eq!(cascade.item.progress, 0);
    assert_eq!(cascade.zone.progress, 50);

    assert_eq!(env.repos.items.get(&item.item_id).unwrap().progress, 0);
    assert_eq!(env.repos.zones.get(&zone.zone_id).unwrap().progress, 50);
    assert!(env.repos.stages.list(&component.component_id).unwrap().is_empty());
}

#[test]
fn test_item_deletion_updates_zone_count_and_progress() {
    let env = build_env();
    let (zone, item, component) = seed_kitchen(&env.api, "p1");
    for stage in component_stages(&env.api, &component.component_id) {
        complete(&env, &stage.stage_id);
    }
    let other = env
        .api
        .create_item(&zone.zone_id, NewItem::named("K-02", "Пенал"))
        .unwrap();
    let refreshed = other.zone.unwrap();
    assert_eq!(refreshed.items_count, 2);
    assert_eq!(refreshed.progress, 50);

    let deleted = env.api.delete_item(&item.item_id).unwrap();
    let refreshed = deleted.zone.unwrap();
    assert_eq!(refreshed.items_count, 1);
    assert_eq!(refreshed.progress, 0);
}

#[test]
fn test_audit_detects_and_cascade_repairs_drift() {
    let env = build_env();
    let (_zone, item, component) = seed_kitchen(&env.api, "p1");
    let stages = component_stages(&env.api, &component.component_id);
    complete(&env, &stages[0].stage_id);
    assert!(env.api.audit_project("p1").unwrap().is_empty());

    // 绕过 API 直接改写缓存值
    env.repos
        .items
        .update(&item.item_id, &ItemPatch::progress(90))
        .unwrap();
    let drifts = env.api.audit_project("p1").unwrap();
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].kind, EntityKind::Item);
    assert_eq!(drifts[0].cached, 90);
    assert_eq!(drifts[0].derived, 14);

    complete(&env, &stages[1].stage_id);
    assert!(env.api.audit_project("p1").unwrap().is_empty());
}

#[test]
fn test_partial_failure_keeps_lower_writes_and_reports_level() {
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
    let stages = component_stages(&env.api, &component.component_id);

    failing.set_failing(true);
    let err = env
        .api
        .update_stage(&stages[0].stage_id, &StagePatch::status(StageStatus::Completed))
        .unwrap_err();

    assert!(err.is_partial_cascade());
    match err {
        ApiError::Cascade(CascadeError::PartialFailure {
            last_written,
            failed,
            ..
        }) => {
            assert_eq!(last_written, CascadeLevel::Item);
            assert_eq!(failed, CascadeLevel::Zone);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // 工序写入与低层聚合保留，分区聚合过期
    assert_eq!(
        env.repos.stages.get(&stages[0].stage_id).unwrap().status,
        StageStatus::Completed
    );
    assert_eq!(env.repos.components.get(&component.component_id).unwrap().progress, 14);
    assert_eq!(env.repos.items.get(&item.item_id).unwrap().progress, 14);
    assert_eq!(env.repos.zones.get(&zone.zone_id).unwrap().progress, 0);

    // 下一次级联修正高层
    failing.set_failing(false);
    env.api
        .update_stage(&stages[1].stage_id, &StagePatch::status(StageStatus::Completed))
        .unwrap();
    assert_eq!(progress_triple(&env, &component.component_id), (29, 29, 29));
}
