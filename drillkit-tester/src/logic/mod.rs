pub mod policy;
pub mod reports;
pub mod scenarios;
pub mod seeds;
pub mod tester;

pub use policy::PlayStrategy;
pub use scenarios::build_scenarios;
pub use seeds::{resolve_seed_inputs, split_csv};
pub use tester::*;
