pub const DEFAULT_STEP_BUDGET: u64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Installability {
    Installable,
    NotInstallable,
    BudgetExceeded,
}

impl Installability {
    pub fn is_installable(self) -> bool {
        self == Self::Installable
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    Unknown,
    Yes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    pub step_budget: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedDep {
    pub dependency: String,
    pub candidates: Vec<String>,
}
