//! Gradient methods.
//!
//! This module provides allocation-free-per-step update rules that modify an `Mlp`
//! given a set of averaged `Gradients`.
//!
//! Design notes:
//! - Method *state* (momentum velocities, RPROP step sizes) lives outside the model.
//! - The trainer owns the state and reuses it across iterations, folds and epochs.

use crate::{Error, Gradients, Mlp, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Resilient propagation (RPROP+) hyper-parameters.
pub struct RpropParams {
    /// Step size every parameter starts with.
    pub initial_step: f32,
    /// Growth factor when consecutive gradient signs agree.
    pub increase: f32,
    /// Shrink factor when consecutive gradient signs disagree.
    pub decrease: f32,
    pub max_step: f32,
    pub min_step: f32,
    /// Gradients with magnitude below this are treated as zero.
    pub zero_tolerance: f32,
}

impl Default for RpropParams {
    fn default() -> Self {
        Self {
            initial_step: 0.1,
            increase: 1.2,
            decrease: 0.5,
            max_step: 50.0,
            min_step: 1e-6,
            zero_tolerance: 1e-17,
        }
    }
}

impl RpropParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.increase.is_finite() && self.increase > 1.0) {
            return Err(Error::InvalidConfig(format!(
                "rprop increase factor must be finite and > 1, got {}",
                self.increase
            )));
        }
        if !(self.decrease.is_finite() && self.decrease > 0.0 && self.decrease < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "rprop decrease factor must be in (0,1), got {}",
                self.decrease
            )));
        }
        if !(self.min_step.is_finite() && self.min_step > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "rprop min_step must be finite and > 0, got {}",
                self.min_step
            )));
        }
        if !(self.max_step.is_finite() && self.max_step >= self.min_step) {
            return Err(Error::InvalidConfig(format!(
                "rprop max_step must be finite and >= min_step, got {}",
                self.max_step
            )));
        }
        if !(self.initial_step >= self.min_step && self.initial_step <= self.max_step) {
            return Err(Error::InvalidConfig(format!(
                "rprop initial_step must lie in [min_step, max_step], got {}",
                self.initial_step
            )));
        }
        if !(self.zero_tolerance.is_finite() && self.zero_tolerance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "rprop zero_tolerance must be finite and >= 0, got {}",
                self.zero_tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Gradient method used for each training iteration.
pub enum GradientMethod {
    /// Gradient descent with classical momentum.
    ///
    /// `batch_size == 0` means one update per pass over the training samples.
    Backprop {
        learning_rate: f32,
        momentum: f32,
        batch_size: usize,
    },
    /// Resilient propagation with per-parameter adaptive steps. Always full batch.
    Resilient(RpropParams),
}

impl Default for GradientMethod {
    fn default() -> Self {
        GradientMethod::Backprop {
            learning_rate: 0.7,
            momentum: 0.3,
            batch_size: 0,
        }
    }
}

impl GradientMethod {
    /// Validate method hyper-parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            GradientMethod::Backprop {
                learning_rate,
                momentum,
                ..
            } => {
                if !(learning_rate.is_finite() && learning_rate > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "learning rate must be finite and > 0, got {learning_rate}"
                    )));
                }
                if !(momentum.is_finite() && (0.0..1.0).contains(&momentum)) {
                    return Err(Error::InvalidConfig(format!(
                        "momentum must be finite and in [0,1), got {momentum}"
                    )));
                }
                Ok(())
            }
            GradientMethod::Resilient(params) => params.validate(),
        }
    }

    /// Number of samples per update for a pass over `len` samples.
    #[inline]
    pub(crate) fn batch_len(self, len: usize) -> usize {
        let n = match self {
            GradientMethod::Backprop { batch_size, .. } if batch_size > 0 => batch_size.min(len),
            _ => len,
        };
        n.max(1)
    }

    /// Allocate method state for `model`.
    pub fn state(self, model: &Mlp) -> Result<MethodState> {
        self.validate()?;

        match self {
            GradientMethod::Backprop {
                learning_rate,
                momentum,
                ..
            } => Ok(MethodState::Backprop {
                learning_rate,
                momentum,
                velocity: ParamBuffers::filled(model, 0.0),
            }),
            GradientMethod::Resilient(params) => Ok(MethodState::Resilient {
                steps: ParamBuffers::filled(model, params.initial_step),
                last_grads: ParamBuffers::filled(model, 0.0),
                last_changes: ParamBuffers::filled(model, 0.0),
                params,
            }),
        }
    }
}

/// One buffer per weight matrix and one per bias vector, shaped like the model.
#[derive(Debug, Clone)]
pub struct ParamBuffers {
    weights: Vec<Vec<f32>>,
    biases: Vec<Vec<f32>>,
}

impl ParamBuffers {
    fn filled(model: &Mlp, value: f32) -> Self {
        let layers = model.layers();
        Self {
            weights: layers.iter().map(|l| vec![value; l.weights().len()]).collect(),
            biases: layers.iter().map(|l| vec![value; l.biases().len()]).collect(),
        }
    }
}

#[derive(Debug, Clone)]
/// Owned gradient method state.
pub enum MethodState {
    Backprop {
        learning_rate: f32,
        momentum: f32,
        velocity: ParamBuffers,
    },
    Resilient {
        params: RpropParams,
        steps: ParamBuffers,
        last_grads: ParamBuffers,
        last_changes: ParamBuffers,
    },
}

impl MethodState {
    /// Apply one update using averaged gradients.
    pub fn step(&mut self, model: &mut Mlp, grads: &Gradients) {
        match self {
            MethodState::Backprop {
                learning_rate,
                momentum,
                velocity,
            } => {
                debug_assert_eq!(velocity.weights.len(), model.num_layers());

                for (layer_idx, layer) in model.layers_mut().iter_mut().enumerate() {
                    let (w, b) = layer.params_mut();

                    momentum_update(
                        w,
                        grads.d_weights(layer_idx),
                        &mut velocity.weights[layer_idx],
                        *learning_rate,
                        *momentum,
                    );
                    momentum_update(
                        b,
                        grads.d_biases(layer_idx),
                        &mut velocity.biases[layer_idx],
                        *learning_rate,
                        *momentum,
                    );
                }
            }
            MethodState::Resilient {
                params,
                steps,
                last_grads,
                last_changes,
            } => {
                for (layer_idx, layer) in model.layers_mut().iter_mut().enumerate() {
                    let (w, b) = layer.params_mut();

                    for (p, g, step, last_g, last_c) in [
                        (
                            w,
                            grads.d_weights(layer_idx),
                            &mut steps.weights[layer_idx],
                            &mut last_grads.weights[layer_idx],
                            &mut last_changes.weights[layer_idx],
                        ),
                        (
                            b,
                            grads.d_biases(layer_idx),
                            &mut steps.biases[layer_idx],
                            &mut last_grads.biases[layer_idx],
                            &mut last_changes.biases[layer_idx],
                        ),
                    ] {
                        debug_assert_eq!(p.len(), g.len());
                        for i in 0..p.len() {
                            p[i] += rprop_change(
                                params,
                                g[i],
                                &mut step[i],
                                &mut last_g[i],
                                &mut last_c[i],
                            );
                        }
                    }
                }
            }
        }
    }
}

#[inline]
fn momentum_update(
    params: &mut [f32],
    grads: &[f32],
    velocity: &mut [f32],
    lr: f32,
    momentum: f32,
) {
    debug_assert_eq!(params.len(), grads.len());
    debug_assert_eq!(params.len(), velocity.len());

    for i in 0..params.len() {
        velocity[i] = momentum.mul_add(velocity[i], grads[i]);
        params[i] -= lr * velocity[i];
    }
}

#[inline]
fn sign(x: f32, zero_tolerance: f32) -> f32 {
    if x.abs() <= zero_tolerance {
        0.0
    } else if x > 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// RPROP+ update for a single parameter. Returns the change to add to the parameter.
#[inline]
fn rprop_change(
    params: &RpropParams,
    grad: f32,
    step: &mut f32,
    last_grad: &mut f32,
    last_change: &mut f32,
) -> f32 {
    let agreement = sign(grad * *last_grad, params.zero_tolerance);

    let change = if agreement > 0.0 {
        *step = (*step * params.increase).min(params.max_step);
        *last_grad = grad;
        -sign(grad, params.zero_tolerance) * *step
    } else if agreement < 0.0 {
        // Overshot a minimum: shrink the step and undo the previous change.
        *step = (*step * params.decrease).max(params.min_step);
        *last_grad = 0.0;
        -*last_change
    } else {
        *last_grad = grad;
        -sign(grad, params.zero_tolerance) * *step
    };

    *last_change = change;
    change
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, MlpBuilder};

    fn linear_mlp() -> Mlp {
        let mut mlp = MlpBuilder::new()
            .add_layer(Activation::Identity, 1, true)
            .unwrap()
            .add_layer(Activation::Identity, 1, false)
            .unwrap()
            .build_with_seed(0)
            .unwrap();

        // Force parameters to known values.
        let layer = mlp.layer_mut(0).unwrap();
        layer.weights_mut()[0] = 1.0;
        layer.biases_mut()[0] = 2.0;
        mlp
    }

    #[test]
    fn backprop_validation_rejects_bad_hyperparams() {
        let bad_lr = GradientMethod::Backprop {
            learning_rate: 0.0,
            momentum: 0.3,
            batch_size: 0,
        };
        let bad_momentum = GradientMethod::Backprop {
            learning_rate: 0.1,
            momentum: 1.0,
            batch_size: 0,
        };
        assert!(bad_lr.validate().is_err());
        assert!(bad_momentum.validate().is_err());
        assert!(GradientMethod::default().validate().is_ok());
    }

    #[test]
    fn rprop_validation_rejects_bad_hyperparams() {
        let mut p = RpropParams::default();
        assert!(p.validate().is_ok());

        p.increase = 0.9;
        assert!(p.validate().is_err());

        let p = RpropParams {
            decrease: 1.5,
            ..RpropParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn momentum_updates_like_sgd_on_first_step() {
        let mut mlp = linear_mlp();
        let mut grads = mlp.gradients();
        grads.d_weights_mut(0)[0] = 3.0;
        grads.d_biases_mut(0)[0] = 4.0;

        let mut state = GradientMethod::Backprop {
            learning_rate: 0.1,
            momentum: 0.9,
            batch_size: 0,
        }
        .state(&mlp)
        .unwrap();
        state.step(&mut mlp, &grads);

        let layer = mlp.layer(0).unwrap();
        assert!((layer.weights()[0] - (1.0 - 0.1 * 3.0)).abs() < 1e-6);
        assert!((layer.biases()[0] - (2.0 - 0.1 * 4.0)).abs() < 1e-6);
    }

    #[test]
    fn rprop_grows_step_when_signs_agree() {
        let mut mlp = linear_mlp();
        let mut grads = mlp.gradients();
        grads.d_weights_mut(0)[0] = 0.5;
        grads.d_biases_mut(0)[0] = -0.25;

        let mut state = GradientMethod::Resilient(RpropParams::default())
            .state(&mlp)
            .unwrap();

        // First step moves by the initial step against the gradient sign,
        // regardless of gradient magnitude.
        state.step(&mut mlp, &grads);
        let w1 = mlp.layer(0).unwrap().weights()[0];
        let b1 = mlp.layer(0).unwrap().biases()[0];
        assert!((w1 - 0.9).abs() < 1e-6);
        assert!((b1 - 2.1).abs() < 1e-6);

        // Same signs: step grows by 1.2.
        state.step(&mut mlp, &grads);
        let w2 = mlp.layer(0).unwrap().weights()[0];
        assert!((w2 - (0.9 - 0.12)).abs() < 1e-6);
    }

    #[test]
    fn rprop_backtracks_and_shrinks_on_sign_flip() {
        let mut mlp = linear_mlp();
        let mut grads = mlp.gradients();
        let mut state = GradientMethod::Resilient(RpropParams::default())
            .state(&mlp)
            .unwrap();

        grads.d_weights_mut(0)[0] = 1.0;
        state.step(&mut mlp, &grads);
        assert!((mlp.layer(0).unwrap().weights()[0] - 0.9).abs() < 1e-6);

        // Sign flip: the previous change is reverted.
        grads.d_weights_mut(0)[0] = -1.0;
        state.step(&mut mlp, &grads);
        assert!((mlp.layer(0).unwrap().weights()[0] - 1.0).abs() < 1e-6);

        // Remembered gradient was reset, so the next step uses the shrunken size (0.05).
        state.step(&mut mlp, &grads);
        assert!((mlp.layer(0).unwrap().weights()[0] - 1.05).abs() < 1e-6);
    }

    #[test]
    fn batch_len_defaults_to_full_pass() {
        assert_eq!(GradientMethod::default().batch_len(10), 10);
        let mini = GradientMethod::Backprop {
            learning_rate: 0.1,
            momentum: 0.0,
            batch_size: 4,
        };
        assert_eq!(mini.batch_len(10), 4);
        assert_eq!(mini.batch_len(2), 2);
        assert_eq!(GradientMethod::Resilient(RpropParams::default()).batch_len(7), 7);
    }
}
