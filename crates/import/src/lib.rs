pub mod loader;
pub mod research;
pub mod rules;
pub(crate) mod util;

pub use loader::{DataInfo, LoadError, LoadOptions, LoadedSheet, WorkbookLoader};
pub use research::{ResearchNote, ResearchNoteParser};
pub use rules::{
    ClassificationOutcome, ClassificationStats, ClassificationWarning, Classifier,
    PrefixRuleEngine, WarningReason,
};
