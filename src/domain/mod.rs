pub mod error;
pub mod import;
pub mod lead;
pub mod text_normalization;
