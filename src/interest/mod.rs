pub mod recalculation;
pub mod settings;

pub use recalculation::{
    LoanRecalculation, RateRecalculator, RecalculationMode, RecalculationOutcome,
    RecalculationReport, SkipReason,
};
pub use settings::{GlobalSettings, InterestSettings, GLOBAL_SETTINGS_KEY};
