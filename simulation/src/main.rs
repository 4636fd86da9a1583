use anyhow::Context;

use simulation::{ExperimentConfig, experiment};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read '{path}'"))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid experiment config in '{path}'"))?
        }
        None => ExperimentConfig::default(),
    };

    let mut server = experiment::build(&config)?;
    let history = server.run(config.num_rounds)?;
    print!("{history}");

    Ok(())
}
