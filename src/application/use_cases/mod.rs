pub mod column_mapper;
pub mod import_executor;
pub mod pipeline_controller;
pub mod validation_engine;
pub mod value_coercion;
