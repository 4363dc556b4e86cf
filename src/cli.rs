use crate::config::TrainingConfig;
use burn::prelude::*;
use std::path::PathBuf;

pub const HELP: &str = "\
cifar-lenet

Trains a small convolutional classifier on the CIFAR-100 archives found in the
data directory, writing per-step metrics to a timestamped pair of run logs.

USAGE:
    cifar-lenet [OPTIONS]

FLAGS:
    -h, --help                  Show this help message and exit

OPTIONS:
    -d, --data-dir <PATH>       Directory holding the `train` and `test` archives
                                (default: data)
    -l, --log-dir <PATH>        Directory receiving the run logs (default: logs)
    -c, --training-config <PATH>
                                Load the training configuration from this file
                                instead of using the built-in defaults
";

#[derive(Debug)]
pub struct AppArgs {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub training_config: Option<PathBuf>,
}

impl AppArgs {
    pub fn parse() -> Result<Self, pico_args::Error> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{}", HELP);
            std::process::exit(0);
        }

        let args = AppArgs {
            data_dir: pargs
                .opt_value_from_os_str(["-d", "--data-dir"], parse_path)?
                .unwrap_or_else(|| "data".into()),
            log_dir: pargs
                .opt_value_from_os_str(["-l", "--log-dir"], parse_path)?
                .unwrap_or_else(|| "logs".into()),
            training_config: pargs.opt_value_from_os_str(["-c", "--training-config"], parse_path)?,
        };

        // It's up to the caller what to do with the remaining arguments.
        let remaining = pargs.finish();
        if !remaining.is_empty() {
            panic!("unused arguments: {remaining:?}");
        }

        Ok(args)
    }

    /// Training configuration from `--training-config`, if one was given.
    pub fn load_training_config(&self) -> Option<TrainingConfig> {
        self.training_config.as_ref().map(|path| {
            TrainingConfig::load(path)
                .unwrap_or_else(|e| panic!("Failed to load the training config {path:?}: {e}"))
        })
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<std::path::PathBuf, &'static str> {
    Ok(s.into())
}
