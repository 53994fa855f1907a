//! K-fold cross-validated training.
//!
//! The dataset is split into `K` contiguous folds and the starting network is copied
//! once per fold. Every epoch rotates through the folds in order: fold `f`'s copy runs
//! one iteration on each of the other `K - 1` folds, then its error is measured on fold
//! `f`, which that copy never trains on. The epoch error is the mean of the `K`
//! validation errors. The loop runs for exactly `epochs` epochs, after which the last
//! fold's copy becomes the trained network.

use std::ops::Range;
use std::path::PathBuf;

use tracing::info;

use crate::metrics::ceil_to;
use crate::optim::GradientMethod;
use crate::train::{self, Outcome, Pass, Session, TrainReport, Trainer};
use crate::{Dataset, Error, Mlp, Result};

/// Default number of folds.
pub const DEFAULT_FOLD_COUNT: usize = 5;

/// Default artifact written by the cross-validation trainer.
pub const DEFAULT_KFOLD_ARTIFACT: &str = "kfold.json";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Contiguous partition of `len` samples into `k` folds.
///
/// The first `len % k` folds hold one extra sample.
pub struct Folds {
    bounds: Vec<Range<usize>>,
}

impl Folds {
    pub fn new(len: usize, k: usize) -> Result<Self> {
        if k < 2 {
            return Err(Error::InvalidConfig(format!(
                "fold count must be at least 2, got {k}"
            )));
        }
        if len < k {
            return Err(Error::InvalidData(format!(
                "dataset has {len} samples, fewer than the {k} folds requested"
            )));
        }

        let base = len / k;
        let remainder = len % k;
        let mut bounds = Vec::with_capacity(k);
        let mut start = 0;
        for i in 0..k {
            let size = if i < remainder { base + 1 } else { base };
            bounds.push(start..start + size);
            start += size;
        }
        debug_assert_eq!(start, len);

        Ok(Self { bounds })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Sample range of fold `idx`.
    #[inline]
    pub fn fold(&self, idx: usize) -> Range<usize> {
        self.bounds[idx].clone()
    }

    /// Indices of every fold other than `idx`, in order.
    pub fn others(&self, idx: usize) -> impl Iterator<Item = usize> {
        (0..self.bounds.len()).filter(move |&i| i != idx)
    }
}

#[derive(Debug, Clone)]
/// Trains for a fixed number of epochs with K-fold rotation.
pub struct CrossValidationTrainer {
    pub epochs: usize,
    pub fold_count: usize,
    pub method: GradientMethod,
    pub artifact: PathBuf,
}

impl CrossValidationTrainer {
    pub fn new(epochs: usize, fold_count: usize, artifact: impl Into<PathBuf>) -> Self {
        Self {
            epochs,
            fold_count,
            method: GradientMethod::default(),
            artifact: artifact.into(),
        }
    }

    pub fn with_method(mut self, method: GradientMethod) -> Self {
        self.method = method;
        self
    }
}

impl Trainer for CrossValidationTrainer {
    fn train(&self, mlp: &mut Mlp, data: &Dataset) -> Result<TrainReport> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        train::check_compatible(mlp, data)?;
        let folds = Folds::new(data.len(), self.fold_count)?;

        // Fold index lists and per-fold networks live for the session only.
        let fold_indices: Vec<Vec<usize>> =
            (0..folds.len()).map(|f| folds.fold(f).collect()).collect();
        let mut replicas = (0..folds.len())
            .map(|_| -> Result<(Mlp, Pass)> {
                let net = mlp.clone();
                let pass = Pass::new(&net, self.method)?;
                Ok((net, pass))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut session = Session::new();

        info!(
            epochs = self.epochs,
            folds = folds.len(),
            samples = data.len(),
            "starting cross-validation training"
        );

        while session.epoch() < self.epochs {
            let mut validation_total = 0.0_f32;
            for (f, (net, pass)) in replicas.iter_mut().enumerate() {
                for g in folds.others(f) {
                    pass.run(net, data, &fold_indices[g]);
                }
                validation_total += train::mean_error(net, data, folds.fold(f));
            }

            let error = validation_total / folds.len() as f32;
            session.record(error)?;
            info!(
                epoch = session.epoch(),
                error = ceil_to(f64::from(error), 6),
                "epoch complete"
            );
        }

        drop(fold_indices);
        if let Some((last, _)) = replicas.pop() {
            *mlp = last;
        }
        drop(replicas);
        session.finish(mlp, Outcome::MaxEpochReached, &self.artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::NetworkConfig;

    #[test]
    fn folds_cover_the_dataset_in_order() {
        let folds = Folds::new(12, 5).unwrap();
        assert_eq!(folds.len(), 5);

        let sizes: Vec<usize> = (0..5).map(|i| folds.fold(i).len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2, 2]);
        assert_eq!(folds.fold(0), 0..3);
        assert_eq!(folds.fold(4), 10..12);
    }

    #[test]
    fn others_skip_the_held_out_fold() {
        let folds = Folds::new(6, 3).unwrap();
        assert_eq!(folds.others(1).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(folds.others(2).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn fold_count_and_size_are_validated() {
        assert!(matches!(Folds::new(10, 1), Err(Error::InvalidConfig(_))));
        assert!(matches!(Folds::new(3, 5), Err(Error::InvalidData(_))));
    }

    #[test]
    fn held_out_fold_never_trains_its_own_network() {
        // Identical inputs with opposite labels: fold 0 is all class 0, fold 1 all class 1.
        let xs = vec![vec![0.5_f32, 0.2, 0.8]; 4];
        let ys = [
            vec![1.0_f32, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ];
        let data = Dataset::from_rows(&xs, &ys).unwrap();
        let start = NetworkConfig::new(3, 2, 4).with_seed(11).build().unwrap();

        let artifact = std::env::temp_dir().join(format!(
            "langnet-{}-kfold-isolated.json",
            std::process::id()
        ));
        let mut mlp = start.clone();
        let report = CrossValidationTrainer::new(3, 2, &artifact)
            .train(&mut mlp, &data)
            .unwrap();
        std::fs::remove_file(&artifact).unwrap();

        // Train each fold's copy on its own, seeing only the other fold.
        let folds = Folds::new(data.len(), 2).unwrap();
        let mut nets = vec![start.clone(), start];
        let mut passes: Vec<Pass> = nets
            .iter()
            .map(|n| Pass::new(n, GradientMethod::default()).unwrap())
            .collect();
        assert_eq!(report.epochs.len(), 3);
        for epoch in &report.epochs {
            let mut total = 0.0_f32;
            for f in 0..2 {
                let other: Vec<usize> = folds.fold(1 - f).collect();
                passes[f].run(&mut nets[f], &data, &other);
                total += train::mean_error(&nets[f], &data, folds.fold(f));
            }
            assert_eq!(epoch.error, total / 2.0, "epoch {}", epoch.epoch);
        }

        assert_eq!(
            mlp.to_json_string().unwrap(),
            nets[1].to_json_string().unwrap()
        );
    }
}
