pub mod system;
pub mod tokens;
