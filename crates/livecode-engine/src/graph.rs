use crate::dsp::effect::Effect;

/// A serial chain of effects. Owns the effects.
pub struct Chain {
    effects: Vec<Box<dyn Effect>>,
    channels: usize,
}

impl Chain {
    pub fn new(channels: usize) -> Self {
        Self { effects: Vec::new(), channels }
    }
    pub fn push(&mut self, mut fx: Box<dyn Effect>) {
        fx.prepare(self.channels);
        self.effects.push(fx);
    }
    pub fn with(mut self, fx: Box<dyn Effect>) -> Self {
        self.push(fx);
        self
    }
    pub fn channels(&self) -> usize {
        self.channels
    }
    pub fn len(&self) -> usize {
        self.effects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.iter().map(|fx| fx.name())
    }
    /// Process one interleaved block in-place.
    pub fn process(&mut self, block: &mut [f32]) {
        for fx in self.effects.iter_mut() {
            fx.process(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::rectify::Rectify;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Offset(f32);

    impl Effect for Offset {
        fn name(&self) -> &str {
            "offset"
        }
        fn process(&mut self, block: &mut [f32]) {
            for s in block.iter_mut() {
                *s += self.0;
            }
        }
    }

    struct Channels(Arc<AtomicUsize>);

    impl Effect for Channels {
        fn name(&self) -> &str {
            "channels"
        }
        fn prepare(&mut self, channels: usize) {
            self.0.store(channels, Ordering::Relaxed);
        }
        fn process(&mut self, _block: &mut [f32]) {}
    }

    #[test]
    fn empty_chain_passes_block_through() {
        let mut chain = Chain::new(2);
        let mut block = vec![0.1, 0.2, 0.3, 0.4];
        chain.process(&mut block);
        assert_eq!(block, vec![0.1, 0.2, 0.3, 0.4]);
        assert!(chain.is_empty());
    }

    #[test]
    fn effects_run_in_insertion_order() {
        let mut chain = Chain::new(1)
            .with(Box::new(Offset(0.5)))
            .with(Box::new(Rectify::new()));
        let mut block = vec![-0.5];
        chain.process(&mut block);
        // (-0.5 + 0.5) -> 0.0 -> -1.0; the other order would give 0.5
        assert_eq!(block, vec![-1.0]);
        assert_eq!(chain.names().collect::<Vec<_>>(), vec!["offset", "rectify"]);
    }

    #[test]
    fn push_prepares_effect_for_chain_channels() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut chain = Chain::new(6);
        chain.push(Box::new(Channels(seen.clone())));
        assert_eq!(chain.len(), 1);
        assert_eq!(seen.load(Ordering::Relaxed), 6);
    }
}
