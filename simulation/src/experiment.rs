use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use serde::Deserialize;

use fedrep::data::{DataLoader, InMemoryDataset};
use fedrep::{ClientConfig, ModelManager, NetSpec, SplitModel, SplitSpec};

use crate::client::Client;
use crate::error::{Result, SimError};
use crate::server::Server;

/// Everything a simulation run needs, loadable from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub num_clients: usize,
    pub num_rounds: usize,
    pub samples_per_client: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub seed: u64,
    pub net: NetSpec,
    pub split: SplitSpec,
    pub client: ClientConfig,
    /// Where client heads persist between rounds. Defaults to a fresh
    /// timestamped directory under `state/`.
    pub state_dir: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            num_clients: 8,
            num_rounds: 10,
            samples_per_client: 200,
            batch_size: 16,
            learning_rate: 0.05,
            seed: 42,
            net: NetSpec {
                input_dim: 16,
                hidden: vec![32],
                num_classes: 4,
            },
            split: SplitSpec::LastLayer,
            client: ClientConfig::default(),
            state_dir: None,
        }
    }
}

/// Builds the server and its clients for one experiment.
///
/// Each client gets a freshly initialized model, a synthetic non-IID dataset
/// and a state path under the run directory. The server's starting body comes
/// from its own fresh model, like the initial parameters a strategy would
/// advertise.
pub fn build(config: &ExperimentConfig) -> Result<Server> {
    if config.num_clients == 0 {
        return Err(SimError::Config {
            detail: "num_clients must be non-zero",
        });
    }
    if config.net.num_classes == 0 {
        return Err(SimError::Config {
            detail: "num_classes must be non-zero",
        });
    }
    if config.samples_per_client == 0 {
        return Err(SimError::Config {
            detail: "samples_per_client must be non-zero",
        });
    }

    let state_dir = match &config.state_dir {
        Some(dir) => dir.clone(),
        None => default_state_dir(),
    };
    fs::create_dir_all(&state_dir)?;

    let splitter = config.split.splitter();
    let mut clients = Vec::with_capacity(config.num_clients);

    for id in 0..config.num_clients {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1 + id as u64));

        let model = config.net.build(&mut rng).map_err(SimError::Model)?;
        let model = SplitModel::new(model, splitter.as_ref()).map_err(SimError::Model)?;

        let (train, test) = client_datasets(&mut rng, &config.net, config.samples_per_client);
        let trainloader = DataLoader::new(train, config.batch_size, true, config.seed ^ id as u64);
        let testloader = DataLoader::new(test, config.batch_size, false, 0);

        let manager = ModelManager::new(
            id,
            &config.client,
            model,
            trainloader,
            testloader,
            Some(state_dir.join(format!("client_{id}.safetensors"))),
            config.learning_rate,
        );
        clients.push(Client::new(id, manager));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let model = config.net.build(&mut rng).map_err(SimError::Model)?;
    let initial = SplitModel::new(model, splitter.as_ref()).map_err(SimError::Model)?;
    let initial_body = initial
        .body_state_dict()
        .into_iter()
        .map(|(_, value)| value)
        .collect();

    Ok(Server::new(clients, initial_body))
}

/// Draws a synthetic classification dataset for one client, split 80/20 into
/// train and test.
///
/// Every class has a shared feature center; each client perturbs the centers
/// with its own jitter. Representations therefore transfer across clients
/// while the best classifier stays client-specific.
fn client_datasets(
    rng: &mut StdRng,
    net: &NetSpec,
    samples: usize,
) -> (InMemoryDataset, InMemoryDataset) {
    let classes = net.num_classes;
    let dims = net.input_dim;

    let jitter: Vec<f32> = (0..classes * dims)
        .map(|_| rng.sample::<f32, _>(StandardNormal) * 0.5)
        .collect();

    let labels: Vec<usize> = (0..samples).map(|i| i % classes).collect();
    let features = Array2::from_shape_fn((samples, dims), |(i, d)| {
        let class = labels[i];
        let center = if d % classes == class { 2.0 } else { 0.0 };
        center + jitter[class * dims + d] + rng.sample::<f32, _>(StandardNormal)
    });

    let train_len = samples - samples / 5;
    let train = InMemoryDataset::new(
        features.slice(ndarray::s![..train_len, ..]).to_owned(),
        labels[..train_len].to_vec(),
    );
    let test = InMemoryDataset::new(
        features.slice(ndarray::s![train_len.., ..]).to_owned(),
        labels[train_len..].to_vec(),
    );
    (train, test)
}

fn default_state_dir() -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from("state").join(format!("run_{stamp}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasets_split_eighty_twenty() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = NetSpec {
            input_dim: 4,
            hidden: vec![8],
            num_classes: 2,
        };
        let (train, test) = client_datasets(&mut rng, &net, 50);
        assert_eq!(train.len(), 40);
        assert_eq!(test.len(), 10);
        assert_eq!(train.num_features(), 4);
        assert!(train.labels().iter().all(|&l| l < 2));
    }

    #[test]
    fn zero_clients_is_rejected() {
        let config = ExperimentConfig {
            num_clients: 0,
            ..Default::default()
        };
        assert!(matches!(build(&config), Err(SimError::Config { .. })));
    }
}
