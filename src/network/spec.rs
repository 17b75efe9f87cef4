use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::activation::ActivationKind;
use crate::error::{NnError, Result};
use crate::layers::Layer;
use crate::math::WeightStorage;
use crate::network::model::WeightInit;
use crate::network::network::{check_topology, DeepNetwork};
use crate::network::shallow::ShallowNetwork;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `inputs`:  width of the vector fed into the layer (the previous
///               layer's `outputs`, or the raw input width for the first layer)
/// - `hidden`:  number of hidden nodes
/// - `outputs`: width of the vector the layer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub inputs: usize,
    pub hidden: usize,
    pub outputs: usize,
}

impl LayerSpec {
    pub fn new(inputs: usize, hidden: usize, outputs: usize) -> LayerSpec {
        LayerSpec { inputs, hidden, outputs }
    }

    /// The shape of an existing layer.
    pub fn of<M: WeightStorage>(layer: &Layer<M>) -> LayerSpec {
        LayerSpec::new(layer.input_size(), layer.hidden_size(), layer.output_size())
    }
}

/// A fully serializable description of a network: its layers plus the
/// settings that decide its initial weights.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of any
/// trained weights, so a search can be configured before it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name, quoted in build errors.
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    pub seed: i32,
    pub learning_rate: f64,
    #[serde(default)]
    pub activation: ActivationKind,
    #[serde(default)]
    pub weight_init: WeightInit,
}

impl NetworkSpec {
    /// Serializes the description to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Builds the layer-chain variant.
    pub fn build_deep<M: WeightStorage>(&self) -> Result<DeepNetwork<M>> {
        DeepNetwork::new(&self.layers, self.seed, self.learning_rate, self.activation)?
            .with_weight_init(self.weight_init)
    }

    /// Builds the fixed-topology variant from a single-layer description.
    pub fn build_shallow<M: WeightStorage>(&self) -> Result<ShallowNetwork<M>> {
        check_topology(&self.layers)?;
        let [layer] = self.layers.as_slice() else {
            return Err(NnError::InvalidConfig(format!(
                "a shallow network has one layer, `{}` describes {}",
                self.name,
                self.layers.len()
            )));
        };
        ShallowNetwork::new(
            layer.inputs,
            layer.hidden,
            layer.outputs,
            self.seed,
            self.learning_rate,
            self.activation,
        )?
        .with_weight_init(self.weight_init)
    }
}
