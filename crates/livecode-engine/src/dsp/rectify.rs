use super::effect::Effect;

/// Full-wave rectification rescaled back onto [-1, 1]: `|s| * 2 - 1`.
#[inline]
pub fn rectify(sample: f32) -> f32 {
    sample.abs() * 2.0 - 1.0
}

/// Rectify one frame in place. Only this frame's samples are touched.
#[inline]
pub fn rectify_frame(frame: &mut [f32]) {
    for s in frame.iter_mut() {
        *s = rectify(*s);
    }
}

/// Absolute-value distortion applied frame by frame.
pub struct Rectify {
    channels: usize,
}

impl Rectify {
    pub fn new() -> Self {
        Self { channels: 1 }
    }
}

impl Default for Rectify {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Rectify {
    fn name(&self) -> &str {
        "rectify"
    }
    fn prepare(&mut self, channels: usize) {
        self.channels = channels.max(1);
    }
    fn process(&mut self, block: &mut [f32]) {
        for frame in block.chunks_exact_mut(self.channels) {
            rectify_frame(frame);
        }
    }
}
