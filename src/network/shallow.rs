use std::io::{Read, Write};

use rand_chacha::ChaCha8Rng;

use crate::activation::ActivationKind;
use crate::error::{NnError, Result};
use crate::layers::Layer;
use crate::math::{Matrix, MatrixStore, WeightStorage};
use crate::network::model::{seeded_rng, Model, WeightInit};
use crate::network::model_file::{read_model, write_model, ModelHeader};

/// Fixed input → hidden → output network: one layer, trained with full
/// backpropagation through both of its matrices.
///
/// Weights start as pink noise unless another [`WeightInit`] is chosen.
#[derive(Debug)]
pub struct ShallowNetwork<M: WeightStorage = Matrix> {
    seed: i32,
    learning_rate: f64,
    activation: ActivationKind,
    weight_init: WeightInit,
    layer: Layer<M>,
    output: Vec<f64>,
    rng: ChaCha8Rng,
}

pub type BigShallowNetwork = ShallowNetwork<MatrixStore>;

impl<M: WeightStorage> ShallowNetwork<M> {
    pub fn new(
        inputs: usize,
        hidden: usize,
        outputs: usize,
        seed: i32,
        learning_rate: f64,
        activation: ActivationKind,
    ) -> Result<ShallowNetwork<M>> {
        let layer = Layer::new(inputs, hidden, outputs)?;
        ShallowNetwork::seeded(layer, seed, learning_rate, activation, WeightInit::PinkNoise)
    }

    pub fn with_weight_init(mut self, init: WeightInit) -> Result<ShallowNetwork<M>> {
        self.weight_init = init;
        self.rng = seeded_rng(self.seed);
        self.reset_weights(init.is_pink())?;
        Ok(self)
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> ShallowNetwork<M> {
        self.learning_rate = learning_rate;
        self
    }

    pub fn weight_init(&self) -> WeightInit {
        self.weight_init
    }

    pub fn layer(&self) -> &Layer<M> {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut Layer<M> {
        &mut self.layer
    }

    pub fn output(&self) -> &[f64] {
        &self.output
    }

    fn assemble(
        layer: Layer<M>,
        seed: i32,
        learning_rate: f64,
        activation: ActivationKind,
        weight_init: WeightInit,
    ) -> ShallowNetwork<M> {
        ShallowNetwork {
            seed,
            learning_rate,
            activation,
            weight_init,
            output: vec![0.0; layer.output_size()],
            layer,
            rng: seeded_rng(seed),
        }
    }

    fn seeded(
        layer: Layer<M>,
        seed: i32,
        learning_rate: f64,
        activation: ActivationKind,
        weight_init: WeightInit,
    ) -> Result<ShallowNetwork<M>> {
        let mut network = ShallowNetwork::assemble(layer, seed, learning_rate, activation, weight_init);
        network.reset_weights(weight_init.is_pink())?;
        Ok(network)
    }
}

impl<M: WeightStorage> Model for ShallowNetwork<M> {
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
        let layer = Layer::with_shape_of(&self.layer)?;
        ShallowNetwork::seeded(layer, seed, self.learning_rate, self.activation, self.weight_init)
    }

    fn reset_weights(&mut self, pink: bool) -> Result<()> {
        self.layer.reset(&mut self.rng, pink)
    }

    fn forward(&mut self, input: &[f64]) -> Result<&[f64]> {
        self.layer.pass(input, &mut self.output, self.activation.activation())?;
        Ok(&self.output)
    }

    fn train(&mut self, input: &[f64], target: &[f64], epochs: usize) -> Result<()> {
        if target.len() != self.output.len() {
            return Err(NnError::shape("training target", self.output.len(), target.len()));
        }
        let derivative = self.activation.derivative();
        let mut deltas = vec![0.0; target.len()];
        for _ in 0..epochs {
            self.forward(input)?;
            for ((delta, &o), &t) in deltas.iter_mut().zip(&self.output).zip(target) {
                *delta = (t - o) * derivative.apply(o);
            }
            self.layer.update_weights(input, &deltas, derivative, self.learning_rate)?;
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
        write_model(writer, &header, std::slice::from_mut(&mut self.layer))
    }

    fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let (header, mut layers) = read_model(reader)?;
        let count = layers.len();
        let (Some(layer), 1) = (layers.pop(), count) else {
            return Err(NnError::Corrupt(format!(
                "shallow network expects exactly one layer, found {count}"
            )));
        };
        let mut network = ShallowNetwork::assemble(
            layer,
            header.seed,
            header.learning_rate,
            header.activation,
            WeightInit::PinkNoise,
        );
        network.output = header.output;
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::network::DeepNetwork;
    use crate::network::spec::LayerSpec;

    #[test]
    fn defaults_to_pink_noise() {
        let network: ShallowNetwork = ShallowNetwork::new(30, 30, 30, 2, 0.1, ActivationKind::Sigmoid).unwrap();
        assert_eq!(network.weight_init(), WeightInit::PinkNoise);
        let weights = &network.layer().weights_in().data;
        let mean_sq = weights.iter().flatten().map(|w| w * w).sum::<f64>() / 900.0;
        assert!(mean_sq < 0.05);
    }

    #[test]
    fn learns_a_single_mapping() {
        let mut network: ShallowNetwork = ShallowNetwork::new(2, 4, 2, 9, 0.5, ActivationKind::Sigmoid).unwrap();
        let (input, target) = ([1.0, 0.0], [0.9, 0.1]);
        let before = network.test(&input, &target).unwrap();
        network.train(&input, &target, 500).unwrap();
        let after = network.test(&input, &target).unwrap();
        assert!(after < before && after < 0.1, "{before} -> {after}");
    }

    #[test]
    fn wrong_target_width_is_rejected() {
        let mut network: ShallowNetwork = ShallowNetwork::new(2, 2, 1, 0, 0.1, ActivationKind::ReLU).unwrap();
        assert!(matches!(
            network.train(&[1.0, 1.0], &[1.0, 0.0], 1),
            Err(NnError::ShapeMismatch { expected: 1, actual: 2, .. })
        ));
        assert!(network.forward(&[1.0]).is_err());
    }

    #[test]
    fn save_load_round_trip() {
        let mut network: ShallowNetwork = ShallowNetwork::new(3, 4, 2, -5, 0.25, ActivationKind::Elu).unwrap();
        let expected = network.forward(&[0.1, 0.2, 0.3]).unwrap().to_vec();
        let mut bytes = Vec::new();
        network.save(&mut bytes).unwrap();

        let mut loaded = ShallowNetwork::<Matrix>::load(&mut bytes.as_slice()).unwrap();
        assert_eq!((loaded.seed(), loaded.activation()), (-5, ActivationKind::Elu));
        assert_eq!(loaded.forward(&[0.1, 0.2, 0.3]).unwrap(), expected.as_slice());

        // A single-layer shallow file is also a valid deep network file.
        let mut deep = DeepNetwork::<Matrix>::load(&mut bytes.as_slice()).unwrap();
        assert_eq!(deep.forward(&[0.1, 0.2, 0.3]).unwrap(), expected.as_slice());
    }

    #[test]
    fn multi_layer_files_are_rejected() {
        let topology = [LayerSpec::new(2, 2, 2), LayerSpec::new(2, 2, 1)];
        let mut deep: DeepNetwork = DeepNetwork::new(&topology, 0, 0.1, ActivationKind::Sigmoid).unwrap();
        let mut bytes = Vec::new();
        deep.save(&mut bytes).unwrap();
        assert!(matches!(ShallowNetwork::<Matrix>::load(&mut bytes.as_slice()), Err(NnError::Corrupt(_))));
    }

    #[test]
    fn reseeding_keeps_shape_and_settings() {
        let proto: ShallowNetwork = ShallowNetwork::new(2, 3, 1, 0, 0.7, ActivationKind::Tanh)
            .unwrap()
            .with_weight_init(WeightInit::Uniform)
            .unwrap();
        let clone = proto.reseeded(99).unwrap();
        let fresh: ShallowNetwork = ShallowNetwork::new(2, 3, 1, 99, 0.7, ActivationKind::Tanh)
            .unwrap()
            .with_weight_init(WeightInit::Uniform)
            .unwrap();
        assert_eq!(clone.weight_init(), WeightInit::Uniform);
        assert_eq!(clone.learning_rate(), 0.7);
        assert_eq!(clone.layer().weights_in(), fresh.layer().weights_in());
        assert_eq!(clone.layer().weights_out(), fresh.layer().weights_out());
    }
}
