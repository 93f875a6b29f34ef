// ==========================================
// 车间生产跟踪 - 应用状态
// ==========================================
// 职责: 组装存储、引擎、API 与变更广播
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ApiResult, ProductionApi};
use crate::client::OptimisticMutationLayer;
use crate::config::{ConfigManager, ProductionConfig};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::{AggregationEngine, ChangePublisher, ProductionRepositories, StageLifecycleManager};
use crate::repository::ZoneRepository;
use crate::sync::{ChangeHub, ChangeNotificationController};

/// 应用状态
///
/// 所有组件共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 运行配置快照（启动时读取）
    pub config: ProductionConfig,

    /// 生产 API
    pub production_api: Arc<ProductionApi>,

    /// 变更广播中心
    pub change_hub: Arc<ChangeHub>,

    /// 配置管理器（运行期覆写）
    pub config_manager: Arc<ConfigManager>,

    /// 分区仓储（项目枚举）
    zone_repo: Arc<ZoneRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并确保表结构
    /// 2. 读取运行配置（防抖窗口、通道容量、自定义模板）
    /// 3. 组装仓储、聚合引擎、工序生命周期与 API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("表结构初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_production_config()
            .map_err(|e| format!("配置读取失败: {}", e))?;
        tracing::info!(
            debounce_ms = config.debounce_ms,
            channel_capacity = config.channel_capacity,
            custom_templates = config.custom_templates.len(),
            "运行配置已加载"
        );

        // ==========================================
        // 仓储 / 引擎 / API
        // ==========================================
        let repos = ProductionRepositories::from_connection(conn.clone());
        let catalog = Arc::new(config.template_catalog());
        let aggregation = Arc::new(AggregationEngine::new(repos.clone()));
        let lifecycle = Arc::new(StageLifecycleManager::new(
            repos.clone(),
            catalog,
            aggregation.clone(),
        ));

        let change_hub = Arc::new(ChangeHub::new(config.channel_capacity));
        let publisher: Arc<dyn ChangePublisher> = change_hub.clone();
        let production_api = Arc::new(ProductionApi::new(
            repos,
            lifecycle,
            aggregation,
            Some(publisher),
        ));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            config,
            production_api,
            change_hub,
            config_manager,
            zone_repo: Arc::new(ZoneRepository::from_connection(conn)),
        })
    }

    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// 已有分区的全部项目
    pub fn list_project_ids(&self) -> ApiResult<Vec<String>> {
        Ok(self.zone_repo.list_project_ids()?)
    }

    /// 打开项目视图: 加载镜像并启动变更订阅
    ///
    /// 必须在 tokio 运行时内调用
    pub fn open_project_view(
        &self,
        project_id: &str,
    ) -> ApiResult<(Arc<OptimisticMutationLayer>, ChangeNotificationController)> {
        let subscription = self.change_hub.subscribe(project_id);
        let viewer = Arc::new(OptimisticMutationLayer::new(
            self.production_api.clone(),
            project_id,
        ));
        viewer.refetch()?;

        let controller =
            ChangeNotificationController::spawn(subscription, viewer.clone(), self.config.debounce());
        Ok((viewer, controller))
    }
}

/// 获取默认数据库路径
///
/// 优先使用环境变量 WORKSHOP_PRODUCTION_DB_PATH，其次用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("WORKSHOP_PRODUCTION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./workshop_production.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("workshop-production-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("workshop-production");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("workshop_production.db");
    }

    path.to_string_lossy().to_string()
}
