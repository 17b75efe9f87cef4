use std::io::{Read, Write};

use rand_chacha::ChaCha8Rng;

use crate::activation::ActivationKind;
use crate::error::{NnError, Result};
use crate::layers::Layer;
use crate::math::{Matrix, MatrixStore, WeightStorage};
use crate::network::model::{seeded_rng, Model, WeightInit};
use crate::network::model_file::{read_model, write_model, ModelHeader};
use crate::network::spec::LayerSpec;

/// A linear chain of layers, each with its own hidden vector.
///
/// Training is per layer: every layer is corrected against the leading
/// `output_size()` entries of the network target, so no layer may be wider
/// than the target.
#[derive(Debug)]
pub struct DeepNetwork<M: WeightStorage = Matrix> {
    seed: i32,
    learning_rate: f64,
    activation: ActivationKind,
    weight_init: WeightInit,
    layers: Vec<Layer<M>>,
    output: Vec<f64>,
    rng: ChaCha8Rng,
}

/// Deep network whose weights are paged to disk.
pub type BigDeepNetwork = DeepNetwork<MatrixStore>;

impl<M: WeightStorage> DeepNetwork<M> {
    /// Builds the chain described by `topology` with uniform weights drawn
    /// from `seed`.
    pub fn new(
        topology: &[LayerSpec],
        seed: i32,
        learning_rate: f64,
        activation: ActivationKind,
    ) -> Result<DeepNetwork<M>> {
        check_topology(topology)?;
        let layers = topology
            .iter()
            .map(|s| Layer::new(s.inputs, s.hidden, s.outputs))
            .collect::<Result<Vec<_>>>()?;
        DeepNetwork::seeded(layers, seed, learning_rate, activation, WeightInit::default())
    }

    /// Wraps existing layers without touching their weights.
    pub fn from_layers(
        layers: Vec<Layer<M>>,
        seed: i32,
        learning_rate: f64,
        activation: ActivationKind,
    ) -> Result<DeepNetwork<M>> {
        let topology: Vec<LayerSpec> = layers.iter().map(LayerSpec::of).collect();
        check_topology(&topology)?;
        Ok(DeepNetwork::assemble(layers, seed, learning_rate, activation, WeightInit::default()))
    }

    /// Redraws the weights from the network's seed with `init`, which later
    /// reseeds also use.
    pub fn with_weight_init(mut self, init: WeightInit) -> Result<DeepNetwork<M>> {
        self.weight_init = init;
        self.rng = seeded_rng(self.seed);
        self.reset_weights(init.is_pink())?;
        Ok(self)
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> DeepNetwork<M> {
        self.learning_rate = learning_rate;
        self
    }

    pub fn weight_init(&self) -> WeightInit {
        self.weight_init
    }

    pub fn layers(&self) -> &[Layer<M>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer<M>] {
        &mut self.layers
    }

    /// Output of the last forward pass.
    pub fn output(&self) -> &[f64] {
        &self.output
    }

    fn assemble(
        layers: Vec<Layer<M>>,
        seed: i32,
        learning_rate: f64,
        activation: ActivationKind,
        weight_init: WeightInit,
    ) -> DeepNetwork<M> {
        let width = layers.last().map_or(0, Layer::output_size);
        DeepNetwork {
            seed,
            learning_rate,
            activation,
            weight_init,
            layers,
            output: vec![0.0; width],
            rng: seeded_rng(seed),
        }
    }

    fn seeded(
        layers: Vec<Layer<M>>,
        seed: i32,
        learning_rate: f64,
        activation: ActivationKind,
        weight_init: WeightInit,
    ) -> Result<DeepNetwork<M>> {
        let mut network = DeepNetwork::assemble(layers, seed, learning_rate, activation, weight_init);
        network.reset_weights(weight_init.is_pink())?;
        Ok(network)
    }
}

impl<M: WeightStorage> Model for DeepNetwork<M> {
    fn seed(&self) -> i32 {
        self.seed
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn activation(&self) -> ActivationKind {
        self.activation
    }

    fn set_activation(&mut self, kind: ActivationKind) {
        self.activation = kind;
    }

    fn reseeded(&self, seed: i32) -> Result<Self> {
        let layers = self
            .layers
            .iter()
            .map(Layer::with_shape_of)
            .collect::<Result<Vec<_>>>()?;
        DeepNetwork::seeded(layers, seed, self.learning_rate, self.activation, self.weight_init)
    }

    fn reset_weights(&mut self, pink: bool) -> Result<()> {
        for layer in &mut self.layers {
            layer.reset(&mut self.rng, pink)?;
        }
        Ok(())
    }

    fn forward(&mut self, input: &[f64]) -> Result<&[f64]> {
        let activation = self.activation.activation();
        let Some((last, rest)) = self.layers.split_last_mut() else {
            return Err(NnError::InvalidTopology("network has no layers".into()));
        };
        let mut current = input.to_vec();
        for layer in rest {
            let mut next = vec![0.0; layer.output_size()];
            layer.pass(&current, &mut next, activation)?;
            current = next;
        }
        last.pass(&current, &mut self.output, activation)?;
        Ok(&self.output)
    }

    fn train(&mut self, input: &[f64], target: &[f64], epochs: usize) -> Result<()> {
        let Some(first) = self.layers.first() else {
            return Err(NnError::InvalidTopology("network has no layers".into()));
        };
        if input.len() != first.input_size() {
            return Err(NnError::shape("training input", first.input_size(), input.len()));
        }
        if let Some(layer) = self.layers.iter().find(|l| l.output_size() > target.len()) {
            return Err(NnError::shape("layer output vs target", layer.output_size(), target.len()));
        }

        let activation = self.activation.activation();
        let derivative = self.activation.derivative();
        for _ in 0..epochs {
            let mut current = input.to_vec();
            for layer in &mut self.layers {
                let mut out = vec![0.0; layer.output_size()];
                layer.pass(&current, &mut out, activation)?;
                let deltas: Vec<f64> = out
                    .iter()
                    .zip(target)
                    .map(|(&o, &t)| (t - o) * derivative.apply(o))
                    .collect();
                layer.update_weights(&current, &deltas, derivative, self.learning_rate)?;
                current = out;
            }
            self.output.copy_from_slice(&current);
        }
        Ok(())
    }

    fn save<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        let header = ModelHeader {
            seed: self.seed,
            learning_rate: self.learning_rate,
            activation: self.activation,
            output: self.output.clone(),
        };
        write_model(writer, &header, &mut self.layers)
    }

    fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let (header, layers) = read_model(reader)?;
        let mut network = DeepNetwork::assemble(
            layers,
            header.seed,
            header.learning_rate,
            header.activation,
            WeightInit::default(),
        );
        network.output = header.output;
        Ok(network)
    }
}

/// Rejects empty chains, empty dimensions and layers that do not chain.
pub(crate) fn check_topology(topology: &[LayerSpec]) -> Result<()> {
    if topology.is_empty() {
        return Err(NnError::InvalidTopology("at least one layer is required".into()));
    }
    for (i, pair) in topology.windows(2).enumerate() {
        if pair[0].outputs != pair[1].inputs {
            return Err(NnError::InvalidTopology(format!(
                "layer {i} outputs {} values but layer {} takes {}",
                pair[0].outputs,
                i + 1,
                pair[1].inputs
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(widths: &[usize]) -> Vec<LayerSpec> {
        widths.windows(2).map(|w| LayerSpec::new(w[0], 3, w[1])).collect()
    }

    #[test]
    fn same_seed_same_output() {
        let topology = chain(&[2, 4, 1]);
        let mut a: DeepNetwork = DeepNetwork::new(&topology, 7, 0.1, ActivationKind::Sigmoid).unwrap();
        let mut b: DeepNetwork = DeepNetwork::new(&topology, 7, 0.1, ActivationKind::Sigmoid).unwrap();
        let mut c: DeepNetwork = DeepNetwork::new(&topology, 8, 0.1, ActivationKind::Sigmoid).unwrap();
        let input = [0.3, -0.9];
        let out_a = a.forward(&input).unwrap().to_vec();
        assert_eq!(out_a, b.forward(&input).unwrap());
        assert_eq!(out_a, a.forward(&input).unwrap());
        assert_ne!(out_a, c.forward(&input).unwrap());
    }

    #[test]
    fn reseeding_matches_a_fresh_network() {
        let topology = chain(&[3, 2, 2]);
        let proto: DeepNetwork = DeepNetwork::new(&topology, 1, 0.5, ActivationKind::Tanh).unwrap();
        let reseeded = proto.reseeded(-40).unwrap();
        let fresh: DeepNetwork = DeepNetwork::new(&topology, -40, 0.5, ActivationKind::Tanh).unwrap();
        assert_eq!(reseeded.seed(), -40);
        for (a, b) in reseeded.layers().iter().zip(fresh.layers()) {
            assert_eq!(a.weights_in(), b.weights_in());
            assert_eq!(a.weights_out(), b.weights_out());
        }
    }

    #[test]
    fn broken_chains_are_rejected() {
        let topology = vec![LayerSpec::new(2, 3, 2), LayerSpec::new(3, 3, 1)];
        let err = DeepNetwork::<Matrix>::new(&topology, 0, 0.1, ActivationKind::ReLU).unwrap_err();
        assert!(matches!(err, NnError::InvalidTopology(_)));
        assert!(DeepNetwork::<Matrix>::new(&[], 0, 0.1, ActivationKind::ReLU).is_err());
        assert!(DeepNetwork::<Matrix>::new(&[LayerSpec::new(2, 0, 1)], 0, 0.1, ActivationKind::ReLU).is_err());
    }

    #[test]
    fn layer_wider_than_target_fails_training_untouched() {
        let topology = chain(&[2, 2, 1]);
        let mut network: DeepNetwork = DeepNetwork::new(&topology, 3, 0.1, ActivationKind::Sigmoid).unwrap();
        let before = network.layers()[0].weights_in().clone();
        let err = network.train(&[1.0, 0.0], &[1.0], 5).unwrap_err();
        assert!(matches!(err, NnError::ShapeMismatch { expected: 2, actual: 1, .. }));
        assert_eq!(network.layers()[0].weights_in(), &before);
    }

    #[test]
    fn narrow_layers_train_on_the_target_prefix() {
        let topology = vec![LayerSpec::new(2, 3, 1), LayerSpec::new(1, 3, 2)];
        let mut network: DeepNetwork = DeepNetwork::new(&topology, 4, 0.2, ActivationKind::Sigmoid).unwrap();
        let before = network.layers()[0].weights_out().clone();
        network.train(&[1.0, 0.0], &[1.0, 0.0], 5).unwrap();
        assert_ne!(network.layers()[0].weights_out(), &before);
        assert_eq!(network.output().len(), 2);

        // The first layer only ever sees target[0]; a network of that layer
        // alone trained on [1.0] ends with the same weights.
        let mut alone: DeepNetwork = DeepNetwork::new(&topology[..1], 4, 0.2, ActivationKind::Sigmoid).unwrap();
        alone.train(&[1.0, 0.0], &[1.0], 5).unwrap();
        assert_eq!(alone.layers()[0].weights_out(), network.layers()[0].weights_out());
    }

    #[test]
    fn training_reduces_error_on_one_sample() {
        let mut network: DeepNetwork =
            DeepNetwork::new(&chain(&[2, 1]), 11, 0.5, ActivationKind::Sigmoid).unwrap();
        let before = network.test(&[1.0, 1.0], &[1.0]).unwrap();
        network.train(&[1.0, 1.0], &[1.0], 200).unwrap();
        assert!(network.test(&[1.0, 1.0], &[1.0]).unwrap() < before);
    }

    #[test]
    fn empty_batch_scores_infinity() {
        let mut network: DeepNetwork =
            DeepNetwork::new(&chain(&[2, 1]), 0, 0.1, ActivationKind::Sigmoid).unwrap();
        assert_eq!(network.test_batch(&[], &[]).unwrap(), f64::INFINITY);
    }

    #[test]
    fn save_load_round_trip_for_one_to_five_layers() {
        let widths = [3, 5, 2, 4, 1, 2];
        let input = [0.25, -0.5, 0.75];
        for depth in 1..=5 {
            let topology = chain(&widths[..=depth]);
            let mut network: DeepNetwork =
                DeepNetwork::new(&topology, depth as i32, 0.2, ActivationKind::Gelu).unwrap();
            let expected = network.forward(&input).unwrap().to_vec();

            let mut bytes = Vec::new();
            network.save(&mut bytes).unwrap();
            let mut loaded = DeepNetwork::<Matrix>::load(&mut bytes.as_slice()).unwrap();

            assert_eq!(loaded.seed(), depth as i32);
            assert_eq!(loaded.learning_rate(), 0.2);
            assert_eq!(loaded.activation(), ActivationKind::Gelu);
            assert_eq!(loaded.output(), expected.as_slice());
            assert_eq!(loaded.forward(&input).unwrap(), expected.as_slice());
        }
    }

    #[test]
    fn big_network_matches_in_memory_network() {
        let topology = chain(&[2, 1]);
        let mut small: DeepNetwork = DeepNetwork::new(&topology, 5, 0.3, ActivationKind::Swish).unwrap();
        let mut big: BigDeepNetwork = DeepNetwork::new(&topology, 5, 0.3, ActivationKind::Swish).unwrap();
        small.train(&[0.5, 1.0], &[0.2], 10).unwrap();
        big.train(&[0.5, 1.0], &[0.2], 10).unwrap();
        assert_eq!(small.forward(&[1.0, 0.0]).unwrap(), big.forward(&[1.0, 0.0]).unwrap());
    }
}
