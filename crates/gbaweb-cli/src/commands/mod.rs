pub mod digest;
pub mod saves;
