//! Network topology.
//!
//! A topology is an ordered list of layer descriptors. The first descriptor is the
//! input layer and the last is the output layer. A descriptor's `has_bias` means the
//! layer feeds a bias unit into the *next* connection, so the output layer's flag has
//! no weights attached.
//!
//! [`NetworkConfig`] assembles the fixed three-layer topology used for language
//! identification: input, one hidden layer sized from the input width, and a softmax
//! output over the language classes.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{Activation, Error, Mlp, MlpBuilder, Result};

/// Default divisor applied to the input width to size the hidden layer.
pub const DEFAULT_HIDDEN_DIVISOR: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
/// One layer of a topology.
pub struct LayerSpec {
    pub activation: Activation,
    pub neurons: usize,
    pub has_bias: bool,
}

impl LayerSpec {
    pub fn new(activation: Activation, neurons: usize, has_bias: bool) -> Self {
        Self {
            activation,
            neurons,
            has_bias,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Validated, finalized list of layer descriptors.
pub struct Topology {
    layers: Vec<LayerSpec>,
}

impl Topology {
    pub fn new(layers: Vec<LayerSpec>) -> Result<Self> {
        if layers.len() < 2 {
            return Err(Error::InvalidConfig(
                "topology must include input and output layers".to_owned(),
            ));
        }
        for (i, spec) in layers.iter().enumerate() {
            if spec.neurons == 0 {
                return Err(Error::InvalidConfig(format!(
                    "layer {i} must have at least one neuron"
                )));
            }
            spec.activation.validate()?;
        }
        Ok(Self { layers })
    }

    #[inline]
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    #[inline]
    pub fn input(&self) -> &LayerSpec {
        &self.layers[0]
    }

    #[inline]
    pub fn output(&self) -> &LayerSpec {
        &self.layers[self.layers.len() - 1]
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input().neurons
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.output().neurons
    }

    /// Number of weight matrices (connections) in the network.
    #[inline]
    pub fn num_connections(&self) -> usize {
        self.layers.len() - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Activations for the input, hidden and output layers.
pub struct ActivationSet {
    pub input: Activation,
    pub hidden: Activation,
    pub output: Activation,
}

impl ActivationSet {
    /// Rectified-linear input and hidden layers, softmax output.
    pub fn relu() -> Self {
        Self {
            input: Activation::ReLU,
            hidden: Activation::ReLU,
            output: Activation::Softmax,
        }
    }

    /// Rectified-linear input, hyperbolic-tangent hidden layer, softmax output.
    pub fn tanh() -> Self {
        Self {
            input: Activation::ReLU,
            hidden: Activation::Tanh,
            output: Activation::Softmax,
        }
    }
}

impl Default for ActivationSet {
    fn default() -> Self {
        Self::relu()
    }
}

/// Hidden layer width for a given input width: `max(1, input_size / divisor)`.
pub fn hidden_width(input_size: usize, divisor: usize) -> Result<usize> {
    if divisor == 0 {
        return Err(Error::InvalidConfig("hidden divisor must be > 0".to_owned()));
    }
    Ok((input_size / divisor).max(1))
}

#[derive(Debug, Clone)]
/// Configuration of the three-layer language identification network.
pub struct NetworkConfig {
    pub input_size: usize,
    pub outputs: usize,
    pub hidden_width: usize,
    pub activations: ActivationSet,
    pub input_bias: bool,
    /// Seed for weight initialization; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl NetworkConfig {
    pub fn new(input_size: usize, outputs: usize, hidden_width: usize) -> Self {
        Self {
            input_size,
            outputs,
            hidden_width,
            activations: ActivationSet::default(),
            input_bias: true,
            seed: None,
        }
    }

    pub fn with_activations(mut self, activations: ActivationSet) -> Self {
        self.activations = activations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_input_bias(mut self, input_bias: bool) -> Self {
        self.input_bias = input_bias;
        self
    }

    /// Descriptor list for this configuration.
    pub fn topology(&self) -> Result<Topology> {
        for (name, v) in [
            ("input_size", self.input_size),
            ("outputs", self.outputs),
            ("hidden_width", self.hidden_width),
        ] {
            if v == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be > 0")));
            }
        }

        Topology::new(vec![
            LayerSpec::new(self.activations.input, self.input_size, self.input_bias),
            LayerSpec::new(self.activations.hidden, self.hidden_width, true),
            LayerSpec::new(self.activations.output, self.outputs, false),
        ])
    }

    /// Build the network with freshly initialized weights.
    pub fn build(&self) -> Result<Mlp> {
        let builder = MlpBuilder::from_topology(self.topology()?);
        match self.seed {
            Some(seed) => builder.build_with_seed(seed),
            None => builder.build_with_rng(&mut StdRng::from_entropy()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_width_uses_divisor_and_floor_of_one() {
        assert_eq!(hidden_width(510, 4).unwrap(), 127);
        assert_eq!(hidden_width(3, 4).unwrap(), 1);
        assert!(hidden_width(10, 0).is_err());
    }

    #[test]
    fn network_config_rejects_zero_dimensions() {
        assert!(NetworkConfig::new(0, 2, 1).topology().is_err());
        assert!(NetworkConfig::new(3, 0, 1).topology().is_err());
        assert!(NetworkConfig::new(3, 2, 0).topology().is_err());
    }

    #[test]
    fn language_topology_has_three_layers_and_no_output_bias() {
        let topo = NetworkConfig::new(12, 5, 3).topology().unwrap();
        let layers = topo.layers();

        assert_eq!(layers.len(), 3);
        assert_eq!(topo.input_dim(), 12);
        assert_eq!(layers[1].neurons, 3);
        assert_eq!(topo.output_dim(), 5);
        assert_eq!(layers[2].activation, Activation::Softmax);
        assert!(layers[0].has_bias && layers[1].has_bias);
        assert!(!layers[2].has_bias);
    }

    #[test]
    fn tanh_preset_only_changes_hidden_activation() {
        let topo = NetworkConfig::new(4, 2, 2)
            .with_activations(ActivationSet::tanh())
            .topology()
            .unwrap();
        assert_eq!(topo.input().activation, Activation::ReLU);
        assert_eq!(topo.layers()[1].activation, Activation::Tanh);
        assert_eq!(topo.output().activation, Activation::Softmax);
    }
}
