// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、API 组装、常用测试数据
// ==========================================

#![allow(dead_code)]

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use workshop_production::api::ProductionApi;
use workshop_production::db::{ensure_schema, open_sqlite_connection};
use workshop_production::domain::{
    Component, EntityKind, Item, NewComponent, NewItem, Stage, StageDefinition, StageTemplate,
    Zone, ZonePatch,
};
use workshop_production::engine::{
    AggregationEngine, ChangePublisher, ProductionRepositories, StageLifecycleManager,
    TemplateCatalog,
};
use workshop_production::repository::{EntityStore, RepositoryError, RepositoryResult};
use workshop_production::sync::ChangeHub;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试环境（临时库 + 完整 API）
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub repos: ProductionRepositories,
    pub api: Arc<ProductionApi>,
    pub hub: Arc<ChangeHub>,
}

/// 内置模板目录
pub fn build_env() -> TestEnv {
    build_env_with(TemplateCatalog::builtin(), |repos| repos)
}

/// 自定义模板目录，并允许替换个别存储
pub fn build_env_with(
    catalog: TemplateCatalog,
    wrap: impl FnOnce(ProductionRepositories) -> ProductionRepositories,
) -> TestEnv {
    workshop_production::logging::init_test();
    let (temp_file, db_path) = create_test_db().unwrap();
    let conn = open_sqlite_connection(&db_path).unwrap();
    let repos = wrap(ProductionRepositories::from_connection(Arc::new(Mutex::new(conn))));

    let aggregation = Arc::new(AggregationEngine::new(repos.clone()));
    let lifecycle = Arc::new(StageLifecycleManager::new(
        repos.clone(),
        Arc::new(catalog),
        aggregation.clone(),
    ));
    let hub = Arc::new(ChangeHub::new(64));
    let publisher: Arc<dyn ChangePublisher> = hub.clone();
    let api = Arc::new(ProductionApi::new(
        repos.clone(),
        lifecycle,
        aggregation,
        Some(publisher),
    ));

    TestEnv {
        _temp_file: temp_file,
        db_path,
        repos,
        api,
        hub,
    }
}

/// 测试模板: cutting → edging → qa
pub fn short_template() -> StageTemplate {
    StageTemplate {
        key: "short".to_string(),
        label: "Короткий".to_string(),
        stages: vec![
            StageDefinition::new("cutting", "Раскрой", Some(1.0)),
            StageDefinition::new("edging", "Кромление", None),
            StageDefinition::new("qa", "Контроль качества", Some(0.5)),
        ],
    }
}

/// 创建 分区 "Кухня" / 制品 "Нижний модуль" / 部件 "Корпус"（ЛДСП 模板）
pub fn seed_kitchen(api: &ProductionApi, project_id: &str) -> (Zone, Item, Component) {
    let zone = api.create_zone(project_id, "Кухня").unwrap().record;
    let item = api
        .create_item(&zone.zone_id, NewItem::named("K-01", "Нижний модуль"))
        .unwrap()
        .record;
    let component = api
        .create_component(&item.item_id, NewComponent::named("Корпус").with_template("ЛДСП"))
        .unwrap()
        .record;
    (zone, item, component)
}

/// 部件工序（按 position 排序）
pub fn component_stages(api: &ProductionApi, component_id: &str) -> Vec<Stage> {
    api.get_component_detail(component_id).unwrap().stages
}

/// 当前缓存进度 (部件, 制品, 分区)
pub fn progress_triple(env: &TestEnv, component_id: &str) -> (i32, i32, i32) {
    let component = env.repos.components.get(component_id).unwrap();
    let item = env.repos.items.get(&component.item_id).unwrap();
    let zone = env.repos.zones.get(&item.zone_id).unwrap();
    (component.progress, item.progress, zone.progress)
}

// ==========================================
// 可注入失败的分区存储
// ==========================================

/// 包装分区存储；开启后 update 返回存储错误
pub struct FailingZoneStore {
    inner: Arc<dyn EntityStore<Zone>>,
    fail_updates: AtomicBool,
}

impl FailingZoneStore {
    pub fn wrap(inner: Arc<dyn EntityStore<Zone>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_updates: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_updates.store(failing, Ordering::SeqCst);
    }
}

impl EntityStore<Zone> for FailingZoneStore {
    fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    fn get(&self, id: &str) -> RepositoryResult<Zone> {
        self.inner.get(id)
    }

    fn list(&self, parent_id: &str) -> RepositoryResult<Vec<Zone>> {
        self.inner.list(parent_id)
    }

    fn create(&self, record: &Zone) -> RepositoryResult<()> {
        self.inner.create(record)
    }

    fn update(&self, id: &str, patch: &ZonePatch) -> RepositoryResult<Zone> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseConnectionError(
                "注入的分区写入失败".to_string(),
            ));
        }
        self.inner.update(id, patch)
    }

    fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.inner.delete(id)
    }
}
