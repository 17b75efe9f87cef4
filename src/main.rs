// Searches seeds and activations for a network that learns the AND gate.
//
//   seedsearch-nn [trainer-config.json] [model-out]
//
// Type `status` or `stop` on stdin while the search runs.
use std::{env, io, process, thread};

use log::{error, info};

use seedsearch_nn::data::gates;
use seedsearch_nn::train::supervise;
use seedsearch_nn::{DeepNetwork, LayerSpec, Model, NnError, Trainer, TrainerConfig};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{e}");
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), NnError> {
    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => TrainerConfig::load_json(&path)?,
        None => TrainerConfig {
            minutes_to_train: 0.2,
            ..TrainerConfig::default()
        },
    };
    let model_out = args.next();

    let data = gates::and_gate();
    let base: DeepNetwork = DeepNetwork::new(&[LayerSpec::new(2, 2, 1)], 1, 0.1, Default::default())?;

    let trainer = Trainer::new(config)?;
    let monitor = trainer.monitor();
    // Not joined: it may stay blocked on stdin after the search ends.
    thread::spawn(move || {
        if let Err(e) = supervise(&monitor, io::stdin().lock(), io::stdout()) {
            error!("supervisor stopped: {e}");
        }
    });

    let outcome = trainer.train(&base, &data)?;
    println!("{}", outcome.result.to_json()?);

    let Some(mut best) = outcome.best else {
        println!("no network beat the baseline");
        return Ok(());
    };
    info!("best network: seed {}, {:?}", best.seed(), best.activation());
    best.print_batch(data.inputs(), &mut io::stdout().lock())?;
    if let Some(path) = model_out {
        best.save_to_file(&path)?;
        info!("saved best network to {path}");
    }
    Ok(())
}
