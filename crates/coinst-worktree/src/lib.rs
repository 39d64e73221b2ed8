mod change;
mod working_copy;

pub use change::{Change, ChangeSpec};
pub use working_copy::{SourceNote, WorkingCopy};
