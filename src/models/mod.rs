pub mod errors;
pub mod file_record;
