//! Model builder.
//!
//! `MlpBuilder` makes model structure explicit (per-layer width, activation and bias
//! unit) and chooses a default weight initializer for each connection based on the
//! activation of the layer it feeds:
//!
//! - `tanh` / `sigmoid` / `identity` / `softmax`: Xavier/Glorot
//! - `relu` / `leaky relu`: He/Kaiming
//!
//! The first layer added is the input layer. Its activation is recorded in the
//! topology; input values pass through unchanged.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::topology::{LayerSpec, Topology};
use crate::{Activation, Error, Init, Layer, Mlp, Result};

#[derive(Debug, Clone, Default)]
/// Builder for an `Mlp`.
///
/// Example:
///
/// ```rust
/// use langnet::{Activation, MlpBuilder};
///
/// # fn main() -> langnet::Result<()> {
/// let mlp = MlpBuilder::new()
///     .add_layer(Activation::ReLU, 4, true)?
///     .add_layer(Activation::Tanh, 2, true)?
///     .add_layer(Activation::Softmax, 3, false)?
///     .build_with_seed(0)?;
/// assert_eq!(mlp.input_dim(), 4);
/// assert_eq!(mlp.output_dim(), 3);
/// # Ok(())
/// # }
/// ```
pub struct MlpBuilder {
    layers: Vec<LayerSpec>,
}

impl MlpBuilder {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Start from an already validated topology.
    pub fn from_topology(topology: Topology) -> Self {
        Self {
            layers: topology.layers().to_vec(),
        }
    }

    /// Append a layer with `neurons` units.
    pub fn add_layer(
        mut self,
        activation: Activation,
        neurons: usize,
        has_bias: bool,
    ) -> Result<Self> {
        if neurons == 0 {
            return Err(Error::InvalidConfig(
                "layer must have at least one neuron".to_owned(),
            ));
        }
        activation.validate()?;

        self.layers.push(LayerSpec::new(activation, neurons, has_bias));
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Mlp> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Mlp> {
        let topology = Topology::new(self.layers)?;

        let mut layers = Vec::with_capacity(topology.num_connections());
        for pair in topology.layers().windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let init = default_init_for_activation(to.activation);
            layers.push(Layer::new_with_rng(
                from.neurons,
                to.neurons,
                init,
                to.activation,
                from.has_bias,
                rng,
            )?);
        }

        Mlp::from_parts(topology, layers)
    }
}

#[inline]
fn default_init_for_activation(act: Activation) -> Init {
    if act.is_rectifier() {
        Init::He
    } else {
        Init::Xavier
    }
}
