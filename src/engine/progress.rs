// ==========================================
// 车间生产跟踪 - 进度计算规则
// ==========================================
// 规则:
// - 部件进度 = round(100 * 已完成工序数 / 工序总数)
// - 制品进度 = round(mean(部件进度))
// - 分区进度 = round(mean(制品进度))
// - 空集合一律为 0（不产生 NaN）
// 舍入: 四舍五入（half-up），整数运算，避免浮点误差
// ==========================================

use crate::domain::Stage;

/// 百分比（half-up 取整），total 为 0 时返回 0
pub fn percent(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)) as i32
}

/// 部件进度
pub fn component_progress(stages: &[Stage]) -> i32 {
    let completed = stages.iter().filter(|s| s.is_completed()).count();
    percent(completed, stages.len())
}

/// 子级进度均值（half-up 取整），空集合返回 0
pub fn mean_progress<I>(values: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), v| (sum + v.clamp(0, 100) as i64, count + 1));
    if count == 0 {
        return 0;
    }
    ((2 * sum + count) / (2 * count)) as i32
}
