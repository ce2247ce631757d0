pub mod use_cases;

pub use use_cases::column_mapper::{suggest_mapping, ColumnMapper};
pub use use_cases::import_executor::{project_row, ImportExecutor};
pub use use_cases::pipeline_controller::{PipelineController, PipelineState};
pub use use_cases::validation_engine::{validate_rows, ExistingIndex, ValidationEngine};
pub use use_cases::value_coercion::parse_decimal;
