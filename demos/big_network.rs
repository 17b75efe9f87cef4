// Trains the 3-input logic-gate table with weights paged to disk, then
// reloads the saved model into memory.
use seedsearch_nn::data::gates;
use seedsearch_nn::{ActivationKind, BigDeepNetwork, DeepNetwork, LayerSpec, Model};

fn main() {
    env_logger::init();

    let data = gates::logic_gates();
    let mut network: BigDeepNetwork =
        DeepNetwork::new(&[LayerSpec::new(3, 64, 1)], 7, 0.05, ActivationKind::Tanh).expect("backing files");

    let epochs = 2000;
    for round in 0..5 {
        network.train_dataset(&data, epochs / 5).expect("training");
        let error = network.test_dataset(&data).expect("testing");
        println!("Round {round}: error = {error:.4}");
    }

    let path = std::env::temp_dir().join("logic_gates.model");
    network.save_to_file(&path).expect("save");
    let mut loaded = DeepNetwork::<seedsearch_nn::Matrix>::load_from_file(&path).expect("load");
    println!("reloaded in memory, error = {:.4}", loaded.test_dataset(&data).expect("testing"));
    std::fs::remove_file(&path).ok();
}
