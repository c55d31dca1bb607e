/// Real-time safe effect interface.
/// - process() must not allocate or lock on the hot path.
/// - `block` is interleaved f32 samples, a whole number of frames long.
pub trait Effect: Send {
    fn name(&self) -> &str;
    fn prepare(&mut self, _channels: usize) {}
    fn process(&mut self, block: &mut [f32]);
}
