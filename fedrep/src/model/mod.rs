pub mod net;
pub mod split;

pub use net::{NetSpec, SplitSpec};
pub use split::{HeadLayersSplitter, LastLayerSplitter, SplitModel, Splitter};
