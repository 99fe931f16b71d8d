use crate::meta::MetaInfo;

/// Frame-rate summary that selects the encoder strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStats {
    /// `1000 / mean(delay_ms)`.
    pub avg_fps: f64,
    /// Every delay equals the first frame's delay.
    pub is_constant: bool,
    /// `1000 / first delay` when constant, else 0.
    pub const_fps: f64,
}

impl FrameStats {
    /// Analyze the delay table.
    ///
    /// Constancy is judged against the first frame only, so one outlier at index 0
    /// makes the whole sequence variable. All-zero delays yield infinite rates.
    pub fn analyze(meta: &MetaInfo) -> Self {
        let Some(first) = meta.frames.first() else {
            return Self {
                avg_fps: 0.0,
                is_constant: false,
                const_fps: 0.0,
            };
        };

        let first_delay = first.delay_ms;
        let is_constant = meta.frames.iter().all(|f| f.delay_ms == first_delay);
        let sum: u64 = meta.frames.iter().map(|f| u64::from(f.delay_ms)).sum();
        let mean = sum as f64 / meta.frames.len() as f64;

        Self {
            avg_fps: 1000.0 / mean,
            is_constant,
            const_fps: if is_constant {
                1000.0 / f64::from(first_delay)
            } else {
                0.0
            },
        }
    }
}
