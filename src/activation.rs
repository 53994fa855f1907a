//! Activation functions.
//!
//! A dense connection computes a pre-activation value `z = W x + b` and then applies an
//! activation: `y = activation(z)`. All activations are element-wise except `Softmax`,
//! which normalizes over the whole layer.
//!
//! We cache the *post-activation* outputs `y` in `Scratch`. During backprop we compute
//! `dL/dz` from `dL/dy` using `y`, so no separate `z` buffer is needed.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Activation function attached to a layer.
pub enum Activation {
    Tanh,
    ReLU,
    LeakyReLU { alpha: f32 },
    Sigmoid,
    Identity,
    /// Normalized exponential over the layer; outputs sum to 1.
    Softmax,
}

impl Activation {
    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::LeakyReLU { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "leaky ReLU alpha must be finite and >= 0, got {alpha}"
                    )));
                }
            }
            Activation::Tanh
            | Activation::ReLU
            | Activation::Sigmoid
            | Activation::Identity
            | Activation::Softmax => {}
        }

        Ok(())
    }

    /// Returns true for activations in the rectifier family.
    #[inline]
    pub fn is_rectifier(self) -> bool {
        matches!(self, Activation::ReLU | Activation::LeakyReLU { .. })
    }

    /// Scalar activation. `Softmax` is the identity here; normalization happens in
    /// [`Activation::apply`].
    #[inline]
    pub(crate) fn forward(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Sigmoid => sigmoid(x),
            Activation::Identity | Activation::Softmax => x,
        }
    }

    /// Apply the activation in place over a layer's pre-activations.
    #[inline]
    pub(crate) fn apply(self, values: &mut [f32]) {
        match self {
            Activation::Softmax => softmax_in_place(values),
            act => {
                for v in values.iter_mut() {
                    *v = act.forward(*v);
                }
            }
        }
    }

    /// Derivative of the activation with respect to its input, expressed in terms
    /// of the cached post-activation output `y`.
    ///
    /// For `Softmax` this is only the diagonal of the Jacobian; use
    /// [`Activation::backward`] for the full product.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f32) -> f32 {
        match self {
            Activation::Tanh => 1.0 - y * y,
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if y > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Sigmoid | Activation::Softmax => y * (1.0 - y),
            Activation::Identity => 1.0,
        }
    }

    /// Computes `dL/dz` from the cached outputs `y` and the upstream `dL/dy`.
    ///
    /// Shape contract: all three slices have the layer's width.
    #[inline]
    pub(crate) fn backward(self, outputs: &[f32], d_outputs: &[f32], d_pre: &mut [f32]) {
        debug_assert_eq!(outputs.len(), d_outputs.len());
        debug_assert_eq!(outputs.len(), d_pre.len());

        match self {
            Activation::Softmax => {
                // dz_i = y_i * (dy_i - sum_j dy_j * y_j)
                let mut dot = 0.0_f32;
                for (&y, &dy) in outputs.iter().zip(d_outputs) {
                    dot = y.mul_add(dy, dot);
                }
                for i in 0..outputs.len() {
                    d_pre[i] = outputs[i] * (d_outputs[i] - dot);
                }
            }
            act => {
                for i in 0..outputs.len() {
                    d_pre[i] = d_outputs[i] * act.grad_from_output(outputs[i]);
                }
            }
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[inline]
fn softmax_in_place(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }

    let mut max_v = values[0];
    for &v in values.iter().skip(1) {
        if v > max_v {
            max_v = v;
        }
    }

    let mut sum_exp = 0.0_f32;
    for v in values.iter_mut() {
        *v = (*v - max_v).exp();
        sum_exp += *v;
    }

    let inv_sum = 1.0 / sum_exp;
    for v in values.iter_mut() {
        *v *= inv_sum;
    }
}
