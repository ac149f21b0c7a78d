use parking_lot::Mutex;
use rescue_core::hal::{AnimationFrame, Indicator, IndicatorMode};
use rescue_core::{Node, NodeConfig, NodeInfo};
use std::sync::Arc;

/// Radar sweep shown while scanning
pub const SCANNING_FRAMES: [AnimationFrame; 3] = [
    AnimationFrame([0b00000, 0b00100, 0b01010, 0b00000, 0b00000]),
    AnimationFrame([0b00000, 0b00000, 0b00100, 0b00000, 0b00000]),
    AnimationFrame([0b00000, 0b00000, 0b01010, 0b00100, 0b00000]),
];

#[derive(Debug, Default)]
struct Animation {
    running: bool,
    next_frame: usize,
}

/// Owns what the lights and display show
///
/// Calm and distress cancel the scanning animation; scanning starts it. The
/// animation itself is advanced by [`IndicatorNode`]. Mode changes and frame
/// updates hold the same lock, so a late frame can never overwrite a calm or
/// distress face.
pub struct IndicatorController {
    indicator: Arc<dyn Indicator>,
    animation: Mutex<Animation>,
}

impl IndicatorController {
    pub fn new(indicator: Arc<dyn Indicator>) -> Self {
        Self {
            indicator,
            animation: Mutex::new(Animation::default()),
        }
    }

    /// Green lights, happy face
    pub fn calm(&self) {
        self.settle(IndicatorMode::Calm);
    }

    /// Red lights, sad face
    pub fn distress(&self) {
        self.settle(IndicatorMode::Distress);
    }

    /// Yellow lights plus the sweep animation
    pub fn scanning(&self) {
        let mut animation = self.animation.lock();
        self.indicator.set_mode(IndicatorMode::Scanning);
        if !animation.running {
            animation.running = true;
            animation.next_frame = 0;
        }
    }

    pub fn play_distress_sound(&self) {
        self.indicator.play_distress_sound();
    }

    /// Show the next sweep frame; false when no animation is running
    pub fn advance_animation(&self) -> bool {
        let mut animation = self.animation.lock();
        if !animation.running {
            return false;
        }
        let frame = &SCANNING_FRAMES[animation.next_frame];
        self.indicator.show_frame(frame);
        animation.next_frame = (animation.next_frame + 1) % SCANNING_FRAMES.len();
        true
    }

    pub fn is_animating(&self) -> bool {
        self.animation.lock().running
    }

    fn settle(&self, mode: IndicatorMode) {
        let mut animation = self.animation.lock();
        if animation.running {
            animation.running = false;
            self.indicator.clear_display();
        }
        self.indicator.set_mode(mode);
    }
}

/// Advances the scanning animation once per frame period
pub struct IndicatorNode {
    name: String,
    indicators: Arc<IndicatorController>,
    frame_ms: u64,
}

impl IndicatorNode {
    pub fn new(name: impl Into<String>, indicators: Arc<IndicatorController>, frame_ms: u64) -> Self {
        Self {
            name: name.into(),
            indicators,
            frame_ms,
        }
    }
}

impl Node for IndicatorNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, _ctx: Option<&mut NodeInfo>) {
        self.indicators.advance_animation();
    }

    fn get_config(&self) -> NodeConfig {
        NodeConfig {
            rate_hz: Some(1000.0 / self.frame_ms.max(1) as f64),
            ..Default::default()
        }
    }
}
