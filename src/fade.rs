pub const DEFAULT_FADE_DURATION_MS: u64 = 100;
pub const ALPHA_MAX: u8 = 255;
pub const ALPHA_MIN: u8 = 0;

/// Smoothstep eased alpha for `elapsed_ms` into a fade of `duration_ms`.
///
/// A zero duration is a fade that has already finished.
pub fn calculate_alpha(elapsed_ms: u64, duration_ms: u64, max_alpha: u8) -> u8 {
    if duration_ms == 0 || elapsed_ms >= duration_ms {
        return max_alpha;
    }

    let t = elapsed_ms as f32 / duration_ms as f32;
    let eased = t * t * (3.0 - 2.0 * t);
    (eased * f32::from(max_alpha)).round().clamp(0.0, f32::from(max_alpha)) as u8
}

/// Fade-in progress for the displayed thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadeState {
    start_ms: Option<u64>,
    alpha: u8,
    duration_ms: u64,
}

impl Default for FadeState {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_DURATION_MS)
    }
}

impl FadeState {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            start_ms: None,
            alpha: ALPHA_MAX,
            duration_ms,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        self.start_ms = Some(now_ms);
        self.alpha = ALPHA_MIN;
    }

    /// Jumps straight to fully opaque. Used on hard cuts and on surfaces
    /// that cannot modulate opacity.
    pub fn reset(&mut self) {
        self.start_ms = None;
        self.alpha = ALPHA_MAX;
    }

    /// Advances the animation. Returns true whenever alpha may have changed,
    /// including the final frame that lands on full opacity.
    pub fn update(&mut self, now_ms: u64) -> bool {
        let Some(start_ms) = self.start_ms else {
            return false;
        };

        let elapsed = now_ms.saturating_sub(start_ms);
        if elapsed >= self.duration_ms {
            self.reset();
            return true;
        }

        self.alpha = calculate_alpha(elapsed, self.duration_ms, ALPHA_MAX);
        true
    }

    pub fn is_active(&self) -> bool {
        self.start_ms.is_some()
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}
