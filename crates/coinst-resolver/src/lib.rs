mod frontier;
mod provides;
mod search;
mod types;
mod universe;

pub use types::{Installability, SolverConfig, UnsatisfiedDep, Verdict, DEFAULT_STEP_BUDGET};
pub use universe::PackageUniverse;

#[cfg(test)]
mod tests;
