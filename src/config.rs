use burn::optim::AdamConfig;
use burn::prelude::*;

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub optimizer: AdamConfig,
    #[config(default = 10)]
    pub num_epochs: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 1e-3)]
    pub lr: f64,

    /// Leading rows of the train archive used for training; the remainder
    /// becomes the validation split.
    #[config(default = 40000)]
    pub train_size: usize,

    #[config(default = 1)]
    pub num_workers: usize,
    #[config(default = 0)]
    pub seed: u64,
}

impl TrainingConfig {
    /// Batches in one full pass over the training split.
    pub fn epoch_size(&self) -> usize {
        (self.train_size / self.batch_size).max(1)
    }

    /// Step cadence at which one validation step is interleaved.
    pub fn half_epoch_size(&self) -> usize {
        (self.epoch_size() / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cadence_matches_the_standard_run() {
        let config = TrainingConfig::new(AdamConfig::new());
        assert_eq!(config.epoch_size(), 625);
        assert_eq!(config.half_epoch_size(), 312);
    }

    #[test]
    fn cadence_never_drops_to_zero() {
        let config = TrainingConfig::new(AdamConfig::new())
            .with_train_size(10)
            .with_batch_size(64);
        assert_eq!(config.epoch_size(), 1);
        assert_eq!(config.half_epoch_size(), 1);
    }
}
