mod greedy_agent;
mod random_agent;

pub use coil::{Agent, Strategy};
pub use greedy_agent::GreedyAgent;
pub use random_agent::RandomAgent;
