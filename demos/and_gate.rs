use seedsearch_nn::data::gates;
use seedsearch_nn::{Model, ShallowNetwork, Trainer, TrainerConfig, WeightInit};

fn main() {
    env_logger::init();

    let data = gates::and_gate();
    let base: ShallowNetwork = ShallowNetwork::new(2, 2, 1, 0, 0.1, Default::default())
        .and_then(|n| n.with_weight_init(WeightInit::Uniform))
        .expect("valid topology");

    let config = TrainerConfig::new(8, 0.1, 5000).with_max_iterations(16);
    let trainer = Trainer::new(config).expect("valid config");
    let outcome = trainer.train(&base, &data).expect("search failed");

    println!(
        "tried {} seeds in {:.2} min, best error {:.4}",
        outcome.result.total_seeds, outcome.result.total_time_minutes, outcome.result.best_value
    );

    let Some(mut best) = outcome.best else {
        println!("no network beat the baseline");
        return;
    };
    println!("seed {} with {:?}", best.seed(), best.activation());
    best.print_batch(data.inputs(), &mut std::io::stdout()).expect("forward pass");
}
