use std::collections::VecDeque;

pub const DEFAULT_METRICS_WINDOW: usize = 120;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderMetricsSnapshot {
    pub frames_rendered: u64,
    pub frames_failed: u64,
    pub avg_frame_ms: f64,
    pub worst_frame_ms: f64,
    pub p95_frame_ms: f64,
    pub pixels_blended_last: u64,
    pub frame_samples: usize,
}

/// Rolling frame timings for the debug metrics call.
#[derive(Debug, Clone)]
pub struct RenderMetrics {
    window_size: usize,
    frame_ms_window: VecDeque<f64>,
    frames_rendered: u64,
    frames_failed: u64,
    pixels_blended_last: u64,
}

impl Default for RenderMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS_WINDOW)
    }
}

impl RenderMetrics {
    pub fn new(rolling_window: usize) -> Self {
        Self {
            window_size: rolling_window.max(1),
            frame_ms_window: VecDeque::with_capacity(rolling_window.max(1)),
            frames_rendered: 0,
            frames_failed: 0,
            pixels_blended_last: 0,
        }
    }

    pub fn record_frame(&mut self, frame_ms: f64, pixels_blended: u64) {
        self.frames_rendered += 1;
        self.pixels_blended_last = pixels_blended;
        self.frame_ms_window.push_back(frame_ms);
        while self.frame_ms_window.len() > self.window_size {
            let _ = self.frame_ms_window.pop_front();
        }
    }

    pub fn record_failure(&mut self) {
        self.frames_failed += 1;
    }

    pub fn snapshot(&self) -> RenderMetricsSnapshot {
        RenderMetricsSnapshot {
            frames_rendered: self.frames_rendered,
            frames_failed: self.frames_failed,
            avg_frame_ms: avg(&self.frame_ms_window),
            worst_frame_ms: max(&self.frame_ms_window),
            p95_frame_ms: p95(&self.frame_ms_window),
            pixels_blended_last: self.pixels_blended_last,
            frame_samples: self.frame_ms_window.len(),
        }
    }
}

fn avg(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

fn max(window: &VecDeque<f64>) -> f64 {
    window.iter().copied().fold(0.0, f64::max)
}

fn p95(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let mut values: Vec<f64> = window.iter().copied().collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((values.len() as f64 * 0.95).ceil() as usize).saturating_sub(1);
    values[idx.min(values.len() - 1)]
}
