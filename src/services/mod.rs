pub mod bandit;
pub mod context;
pub mod genre;
pub mod nostalgia;

pub use bandit::{BanditSettings, HierarchicalBandit, ModelStore};
pub use nostalgia::NostalgiaRanker;
