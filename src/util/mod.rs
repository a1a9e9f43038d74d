pub(crate) mod error;
pub mod text;
