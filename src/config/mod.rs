pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_all, check_all, ApplicationError, PatchStatus};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    Metadata, OperationSpec, PatchDefinition, SpliceConfig, ValidationError, VerifySpec,
};
