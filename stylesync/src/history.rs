//! Bounded history buffers for charts.

use std::collections::VecDeque;

/// Points kept in the CPU chart.
pub const CPU_HISTORY_POINTS: usize = 20;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// CPU% readings paired with their clock labels, oldest first.
#[derive(Debug, Clone)]
pub struct CpuHistory {
    points: VecDeque<(String, f64)>,
    cap: usize,
}

impl CpuHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(cap),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, label: String, cpu_percent: f32) {
        let v = f64::from(cpu_percent).clamp(0.0, 100.0);
        push_capped(&mut self.points, (label, v), self.cap);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(x, y)` pairs for a ratatui `Dataset`, x being the point index.
    pub fn chart_points(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, (_, v))| (i as f64, *v))
            .collect()
    }

    pub fn first_label(&self) -> Option<&str> {
        self.points.front().map(|(l, _)| l.as_str())
    }

    pub fn last_label(&self) -> Option<&str> {
        self.points.back().map(|(l, _)| l.as_str())
    }

    pub fn latest(&self) -> Option<f64> {
        self.points.back().map(|(_, v)| *v)
    }
}

impl Default for CpuHistory {
    fn default() -> Self {
        Self::new(CPU_HISTORY_POINTS)
    }
}
