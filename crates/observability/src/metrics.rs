//! Splitter 指标收集模块
//!
//! 基于 FrameReport 收集和统计分流引擎的运行指标。

use std::collections::BTreeMap;

use contracts::{FrameReport, FrameStatus};
use metrics::{counter, gauge, histogram};

/// 从 FrameReport 记录指标
///
/// 每次 `process` 返回后调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_metrics;
///
/// let report = splitter.process(&mut input, &mut outputs)?;
/// record_frame_metrics(&report);
/// ```
pub fn record_frame_metrics(report: &FrameReport) {
    let status = match report.status() {
        FrameStatus::Ok => "ok",
        FrameStatus::Degraded => "degraded",
    };
    counter!("splitter_frames_total", "status" => status).increment(1);

    gauge!("splitter_active_ports").set(report.deliveries.len() as f64);

    if report.metadata_transferred > 0 {
        counter!("splitter_metadata_transferred_total")
            .increment(report.metadata_transferred as u64);
    }
    if report.metadata_cloned > 0 {
        counter!("splitter_metadata_cloned_total").increment(report.metadata_cloned as u64);
    }
    if report.metadata_dropped > 0 {
        counter!("splitter_metadata_dropped_total").increment(report.metadata_dropped as u64);
    }
    if !report.clone_failures.is_empty() {
        counter!("splitter_metadata_clone_failures_total")
            .increment(report.clone_failures.len() as u64);
    }

    for delivery in &report.deliveries {
        counter!(
            "splitter_bytes_delivered_total",
            "port" => delivery.port_id.to_string()
        )
        .increment(delivery.bytes as u64);

        histogram!(
            "splitter_frame_bytes",
            "port" => delivery.port_id.to_string()
        )
        .record(delivery.bytes as f64);
    }
}

/// 记录单个 clone 失败
pub fn record_clone_failure(metadata_id: u32, port_index: usize) {
    counter!(
        "splitter_clone_failure_events_total",
        "metadata_id" => format!("0x{metadata_id:08X}"),
        "port_index" => port_index.to_string()
    )
    .increment(1);
}

/// 记录端口状态切换
pub fn record_port_state_change(port_id: u32, state: &str) {
    counter!(
        "splitter_port_state_changes_total",
        "port" => port_id.to_string(),
        "state" => state.to_string()
    )
    .increment(1);
}

/// 分流指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FrameMetricsAggregator {
    /// 总帧数
    pub total_frames: u64,

    /// 降级帧数 (存在 clone 失败)
    pub degraded_frames: u64,

    /// 转移 (零拷贝) 的 metadata 数量
    pub total_transferred: u64,

    /// 克隆的 metadata 数量
    pub total_cloned: u64,

    /// 丢弃的 metadata 数量
    pub total_dropped: u64,

    /// clone 失败次数
    pub total_clone_failures: u64,

    /// 每帧活跃端口数统计
    pub active_port_stats: RunningStats,

    /// 各端口每帧字节数统计 (port_id -> stats)
    pub port_bytes: BTreeMap<u32, RunningStats>,

    /// 各端口收到的 metadata 数量
    pub port_metadata: BTreeMap<u32, u64>,
}

impl FrameMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, report: &FrameReport) {
        self.total_frames += 1;
        if report.status() == FrameStatus::Degraded {
            self.degraded_frames += 1;
        }

        self.total_transferred += report.metadata_transferred as u64;
        self.total_cloned += report.metadata_cloned as u64;
        self.total_dropped += report.metadata_dropped as u64;
        self.total_clone_failures += report.clone_failures.len() as u64;

        self.active_port_stats.push(report.deliveries.len() as f64);

        for delivery in &report.deliveries {
            self.port_bytes
                .entry(delivery.port_id.0)
                .or_default()
                .push(delivery.bytes as f64);
            *self.port_metadata.entry(delivery.port_id.0).or_insert(0) +=
                delivery.metadata_events as u64;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            degraded_frames: self.degraded_frames,
            total_transferred: self.total_transferred,
            total_cloned: self.total_cloned,
            total_dropped: self.total_dropped,
            total_clone_failures: self.total_clone_failures,
            degraded_rate: if self.total_frames > 0 {
                self.degraded_frames as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            active_ports: StatsSummary::from(&self.active_port_stats),
            port_bytes: self
                .port_bytes
                .iter()
                .map(|(port, stats)| (*port, StatsSummary::from(stats)))
                .collect(),
            port_metadata: self.port_metadata.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub degraded_frames: u64,
    pub total_transferred: u64,
    pub total_cloned: u64,
    pub total_dropped: u64,
    pub total_clone_failures: u64,
    pub degraded_rate: f64,
    pub active_ports: StatsSummary,
    pub port_bytes: BTreeMap<u32, StatsSummary>,
    pub port_metadata: BTreeMap<u32, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Splitter Metrics Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Degraded frames: {} ({:.2}%)",
            self.degraded_frames, self.degraded_rate
        )?;
        writeln!(
            f,
            "Metadata: transferred={}, cloned={}, dropped={}, clone failures={}",
            self.total_transferred, self.total_cloned, self.total_dropped, self.total_clone_failures
        )?;
        writeln!(f, "Active ports: {}", self.active_ports)?;

        if !self.port_bytes.is_empty() {
            writeln!(f, "Bytes per frame:")?;
            for (port, stats) in &self.port_bytes {
                writeln!(f, "  port {}: {}", port, stats)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
