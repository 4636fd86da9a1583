pub mod dataloader;
pub mod dataset;

pub use dataloader::{Batch, DataLoader};
pub use dataset::InMemoryDataset;
