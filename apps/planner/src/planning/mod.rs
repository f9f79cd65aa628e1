pub mod greedy;
pub mod hybrid;
pub mod knapsack;

pub use greedy::{run_greedy, GreedyResult};
pub use hybrid::{select_plan, select_plan_sync};
pub use knapsack::{run_knapsack, KnapsackResult};
