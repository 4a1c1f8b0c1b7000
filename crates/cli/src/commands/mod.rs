pub mod insights;
pub mod predictions;
