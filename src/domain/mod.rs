pub mod dates;
pub mod records;
pub mod stage;
pub mod treatment;
