// ==========================================
// 车间生产跟踪 - 进度聚合引擎
// ==========================================
// 职责: 工序状态 → 部件 → 制品 → 分区 的自底向上重算
// 红线: 每次结构变更或状态变更后必须重算
// ==========================================
// 说明:
// - 三步读-改-写链，不是单一原子事务
// - 中间步骤失败不回滚已写入的低层值（可恢复的不一致）
// - 另提供按需派生视图与一致性审计，不写库
// ==========================================

use crate::domain::{ComponentPatch, EntityKind, ItemPatch, ZonePatch};
use crate::engine::error::{CascadeError, CascadeLevel, CascadeResult};
use crate::engine::progress::{component_progress, mean_progress};
use crate::engine::repositories::ProductionRepositories;
use crate::repository::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

// ==========================================
// 重算结果
// ==========================================

/// 单个节点的进度写入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub id: String,
    pub progress: i32,
}

/// 级联重算结果（供乐观层覆盖本地猜测值）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    /// 从制品层开始的重算没有部件层
    pub component: Option<ProgressUpdate>,
    pub item: ProgressUpdate,
    pub zone: ProgressUpdate,
}

/// 缓存进度与派生进度不一致的节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDrift {
    pub kind: EntityKind,
    pub id: String,
    pub cached: i32,
    pub derived: i32,
}

// ==========================================
// AggregationEngine - 进度聚合引擎
// ==========================================
pub struct AggregationEngine {
    repos: ProductionRepositories,
}

impl AggregationEngine {
    pub fn new(repos: ProductionRepositories) -> Self {
        Self { repos }
    }

    // ==========================================
    // 级联重算（写库）
    // ==========================================

    /// 从部件开始的三步级联重算
    ///
    /// 1. 读取部件全部工序，计算并写入部件进度
    /// 2. 读取所属制品全部部件，写入制品进度
    /// 3. 读取所属分区全部制品，写入分区进度
    #[instrument(skip(self))]
    pub fn recalculate_cascade(&self, component_id: &str) -> CascadeResult<CascadeOutcome> {
        let (component, item_id) = self
            .write_component_progress(component_id)
            .map_err(|source| CascadeError::Store {
                level: CascadeLevel::Component,
                source,
            })?;
        debug!(
            "部件进度已写入: component_id={}, progress={}",
            component.id, component.progress
        );

        let (item, zone_id) = self
            .write_item_progress(&item_id)
            .map_err(|source| partial(CascadeLevel::Component, CascadeLevel::Item, source))?;
        debug!("制品进度已写入: item_id={}, progress={}", item.id, item.progress);

        let zone = self
            .write_zone_progress(&zone_id)
            .map_err(|source| partial(CascadeLevel::Item, CascadeLevel::Zone, source))?;
        debug!("分区进度已写入: zone_id={}, progress={}", zone.id, zone.progress);

        Ok(CascadeOutcome {
            component: Some(component),
            item,
            zone,
        })
    }

    /// 从制品开始重算（部件整体增删时使用）
    #[instrument(skip(self))]
    pub fn recalculate_item_progress(&self, item_id: &str) -> CascadeResult<CascadeOutcome> {
        let (item, zone_id) =
            self.write_item_progress(item_id)
                .map_err(|source| CascadeError::Store {
                    level: CascadeLevel::Item,
                    source,
                })?;

        let zone = self
            .write_zone_progress(&zone_id)
            .map_err(|source| partial(CascadeLevel::Item, CascadeLevel::Zone, source))?;

        Ok(CascadeOutcome {
            component: None,
            item,
            zone,
        })
    }

    /// 仅重算分区（制品增删时使用）
    #[instrument(skip(self))]
    pub fn recalculate_zone_progress(&self, zone_id: &str) -> CascadeResult<ProgressUpdate> {
        self.write_zone_progress(zone_id)
            .map_err(|source| CascadeError::Store {
                level: CascadeLevel::Zone,
                source,
            })
    }

    /// 返回写入结果与所属制品ID
    fn write_component_progress(
        &self,
        component_id: &str,
    ) -> RepositoryResult<(ProgressUpdate, String)> {
        let stages = self.repos.stages.list(component_id)?;
        let progress = component_progress(&stages);
        let component = self
            .repos
            .components
            .update(component_id, &ComponentPatch::progress(progress))?;
        Ok((
            ProgressUpdate {
                id: component.component_id,
                progress: component.progress,
            },
            component.item_id,
        ))
    }

    /// 返回写入结果与所属分区ID
    fn write_item_progress(&self, item_id: &str) -> RepositoryResult<(ProgressUpdate, String)> {
        let components = self.repos.components.list(item_id)?;
        let progress = mean_progress(components.iter().map(|c| c.progress));
        let item = self
            .repos
            .items
            .update(item_id, &ItemPatch::progress(progress))?;
        Ok((
            ProgressUpdate {
                id: item.item_id,
                progress: item.progress,
            },
            item.zone_id,
        ))
    }

    fn write_zone_progress(&self, zone_id: &str) -> RepositoryResult<ProgressUpdate> {
        let items = self.repos.items.list(zone_id)?;
        let patch = ZonePatch {
            progress: Some(mean_progress(items.iter().map(|i| i.progress))),
            items_count: Some(items.len() as i32),
            ..Default::default()
        };
        let zone = self.repos.zones.update(zone_id, &patch)?;
        Ok(ProgressUpdate {
            id: zone.zone_id,
            progress: zone.progress,
        })
    }

    // ==========================================
    // 派生视图（只读）
    // ==========================================

    /// 由工序状态直接派生部件进度
    pub fn derive_component_progress(&self, component_id: &str) -> RepositoryResult<i32> {
        Ok(component_progress(&self.repos.stages.list(component_id)?))
    }

    /// 由叶子状态直接派生制品进度（忽略缓存值）
    pub fn derive_item_progress(&self, item_id: &str) -> RepositoryResult<i32> {
        let components = self.repos.components.list(item_id)?;
        let values = components
            .iter()
            .map(|c| self.derive_component_progress(&c.component_id))
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(mean_progress(values))
    }

    /// 由叶子状态直接派生分区进度（忽略缓存值）
    pub fn derive_zone_progress(&self, zone_id: &str) -> RepositoryResult<i32> {
        let items = self.repos.items.list(zone_id)?;
        let values = items
            .iter()
            .map(|i| self.derive_item_progress(&i.item_id))
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(mean_progress(values))
    }

    /// 审计项目内全部缓存进度
    ///
    /// 返回与派生值不一致的节点；多查看者并发级联产生的丢失更新可借此发现
    pub fn audit_project(&self, project_id: &str) -> RepositoryResult<Vec<ProgressDrift>> {
        let mut drifts = Vec::new();

        for zone in self.repos.zones.list(project_id)? {
            let mut item_values = Vec::new();
            for item in self.repos.items.list(&zone.zone_id)? {
                let mut component_values = Vec::new();
                for component in self.repos.components.list(&item.item_id)? {
                    let derived = self.derive_component_progress(&component.component_id)?;
                    component_values.push(derived);
                    if derived != component.progress {
                        drifts.push(ProgressDrift {
                            kind: EntityKind::Component,
                            id: component.component_id.clone(),
                            cached: component.progress,
                            derived,
                        });
                    }
                }

                let derived = mean_progress(component_values);
                item_values.push(derived);
                if derived != item.progress {
                    drifts.push(ProgressDrift {
                        kind: EntityKind::Item,
                        id: item.item_id.clone(),
                        cached: item.progress,
                        derived,
                    });
                }
            }

            let derived = mean_progress(item_values);
            if derived != zone.progress {
                drifts.push(ProgressDrift {
                    kind: EntityKind::Zone,
                    id: zone.zone_id.clone(),
                    cached: zone.progress,
                    derived,
                });
            }
        }

        if !drifts.is_empty() {
            warn!(
                "项目进度缓存存在偏差: project_id={}, drift_count={}",
                project_id,
                drifts.len()
            );
        }
        Ok(drifts)
    }
}

fn partial(last_written: CascadeLevel, failed: CascadeLevel, source: RepositoryError) -> CascadeError {
    warn!(
        "进度级联部分失败: last_written={}, failed={}, error={}",
        last_written, failed, source
    );
    CascadeError::PartialFailure {
        last_written,
        failed,
        source,
    }
}
