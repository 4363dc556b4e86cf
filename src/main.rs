use burn::optim::AdamConfig;
use cifar_lenet::backend::{MainAutoBackend, MainDevice};
use cifar_lenet::cli::AppArgs;
use cifar_lenet::config::TrainingConfig;
use cifar_lenet::model::LeNetConfig;
use cifar_lenet::training;

fn main() {
    let args = AppArgs::parse().unwrap_or_else(|e| panic!("Failed to parse the arguments: {e}"));

    let training_config = args
        .load_training_config()
        .unwrap_or_else(|| TrainingConfig::new(AdamConfig::new()));
    let model_config = LeNetConfig::new();

    let device = MainAutoBackend::main_device();
    training::run::<MainAutoBackend>(
        &training_config,
        &model_config,
        device,
        &args.data_dir,
        &args.log_dir,
    );
}
