pub mod heroes;
pub mod sync;
