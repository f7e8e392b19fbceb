pub mod counts;
pub mod error;
pub mod ini;
pub mod options;
pub mod reference;
pub mod report;
pub mod runscript;
pub mod sample;
pub mod tabix;
pub mod terminal;
pub mod utils;
pub mod workflow;

pub mod prelude {
    pub use crate::counts::{SequenceErrorCounts, SequenceErrorCountsBuilder};
    pub use crate::error::ConfigureError;
    pub use crate::options::{CountsOptions, InstallLayout, OptionDefaults, RawOptions};
    pub use crate::report::ConfigureReport;
    pub use crate::utils::init_logger;
}
