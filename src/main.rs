// ==========================================
// 车间生产跟踪 - 命令行入口
// ==========================================
// 打开数据库，核对缓存进度，输出各项目进度概览
// ==========================================

use anyhow::{Context, Result};
use workshop_production::app::{get_default_db_path, AppState};
use workshop_production::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", workshop_production::APP_NAME, workshop_production::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let api = state.production_api.clone();

    let project_ids = state.list_project_ids().context("项目列表读取失败")?;
    if project_ids.is_empty() {
        tracing::info!("数据库中没有项目");
        return Ok(());
    }

    for project_id in project_ids {
        let snapshot = api
            .get_project_snapshot(&project_id)
            .with_context(|| format!("项目读取失败: {}", project_id))?;
        println!("项目 {}", project_id);
        for zone in &snapshot.zones {
            println!("  {:<24} {:>3}%  ({} 个制品)", zone.name, zone.progress, zone.items_count);
            for item in snapshot.items.iter().filter(|i| i.zone_id == zone.zone_id) {
                println!("    {:<10} {:<20} {:>3}%", item.code, item.name, item.progress);
            }
        }

        let drifts = api
            .audit_project(&project_id)
            .with_context(|| format!("进度核对失败: {}", project_id))?;
        for drift in drifts {
            tracing::warn!(
                kind = %drift.kind,
                id = %drift.id,
                cached = drift.cached,
                derived = drift.derived,
                "缓存进度与工序推导值不一致"
            );
        }
    }

    Ok(())
}
