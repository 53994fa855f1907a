//! Train-to-error with resilient propagation.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::optim::{GradientMethod, RpropParams};
use crate::train::{self, Outcome, Pass, Session, TrainReport, Trainer};
use crate::{Dataset, Error, Mlp, Result};

/// Default artifact written by the resilient trainer.
pub const DEFAULT_RESILIENT_ARTIFACT: &str = "resilient.json";

#[derive(Debug, Clone, Copy, PartialEq)]
/// Stop training when the error fails to improve enough for `cycles` iterations in a row.
pub struct RequiredImprovement {
    pub cycles: usize,
    /// Minimum relative improvement over the best error so far, e.g. `0.01` for 1%.
    pub min_improvement: f32,
}

impl Default for RequiredImprovement {
    fn default() -> Self {
        Self {
            cycles: 5,
            min_improvement: 0.01,
        }
    }
}

impl RequiredImprovement {
    pub fn new(cycles: usize) -> Self {
        Self {
            cycles,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.cycles == 0 {
            return Err(Error::InvalidConfig(
                "required improvement cycles must be > 0".to_owned(),
            ));
        }
        if !(self.min_improvement.is_finite() && self.min_improvement >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_improvement must be finite and >= 0, got {}",
                self.min_improvement
            )));
        }
        Ok(())
    }
}

/// Tracks the best error and consecutive iterations without sufficient improvement.
#[derive(Debug, Clone)]
struct ImprovementTracker {
    rule: RequiredImprovement,
    best: Option<f32>,
    bad_cycles: usize,
}

impl ImprovementTracker {
    fn new(rule: RequiredImprovement) -> Self {
        Self {
            rule,
            best: None,
            bad_cycles: 0,
        }
    }

    /// Feed the latest error. Returns true once training has stalled.
    fn observe(&mut self, error: f32) -> bool {
        match self.best {
            None => self.best = Some(error),
            Some(best) => {
                let improvement = if best > 0.0 { (best - error) / best } else { 0.0 };
                if improvement < self.rule.min_improvement {
                    self.bad_cycles += 1;
                } else {
                    self.best = Some(error);
                    self.bad_cycles = 0;
                }
            }
        }
        self.bad_cycles >= self.rule.cycles
    }
}

#[derive(Debug, Clone)]
/// Trains with RPROP+ until the error reaches `target_error` or stops improving.
pub struct ResilientTrainer {
    pub target_error: f32,
    pub params: RpropParams,
    /// `None` disables the stall check.
    pub improvement: Option<RequiredImprovement>,
    /// Hard cap on iterations; `None` means unbounded.
    pub max_iterations: Option<usize>,
    pub artifact: PathBuf,
}

impl ResilientTrainer {
    pub fn new(target_error: f32, artifact: impl Into<PathBuf>) -> Self {
        Self {
            target_error,
            params: RpropParams::default(),
            improvement: Some(RequiredImprovement::default()),
            max_iterations: None,
            artifact: artifact.into(),
        }
    }

    pub fn with_params(mut self, params: RpropParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_required_improvement(mut self, rule: Option<RequiredImprovement>) -> Self {
        self.improvement = rule;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.target_error.is_finite() && self.target_error > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "target error must be finite and > 0, got {}",
                self.target_error
            )));
        }
        self.params.validate()?;
        if let Some(rule) = &self.improvement {
            rule.validate()?;
        }
        if self.max_iterations == Some(0) {
            return Err(Error::InvalidConfig("max_iterations must be > 0".to_owned()));
        }
        Ok(())
    }
}

impl Trainer for ResilientTrainer {
    fn train(&self, mlp: &mut Mlp, data: &Dataset) -> Result<TrainReport> {
        self.validate()?;
        train::check_compatible(mlp, data)?;

        let all: Vec<usize> = (0..data.len()).collect();
        let mut pass = Pass::new(mlp, GradientMethod::Resilient(self.params))?;
        let mut tracker = self.improvement.map(ImprovementTracker::new);
        let mut session = Session::new();

        info!(
            target_error = self.target_error,
            samples = data.len(),
            "starting resilient training"
        );

        let outcome = loop {
            let error = pass.run(mlp, data, &all);
            session.record(error)?;
            debug!(iteration = session.epoch(), error, "iteration complete");

            if error <= self.target_error {
                break Outcome::Converged;
            }
            if tracker.as_mut().is_some_and(|t| t.observe(error)) {
                warn!(
                    iteration = session.epoch(),
                    error, "error stopped improving, ending training early"
                );
                break Outcome::StalledNoImprovement;
            }
            if self.max_iterations.is_some_and(|max| session.epoch() >= max) {
                break Outcome::MaxEpochReached;
            }
        };

        session.finish(mlp, outcome, &self.artifact)
    }
}
