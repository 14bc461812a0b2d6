pub mod code_generator;
pub mod jwt;
pub mod validation;

pub use code_generator::generate_hex_token;
pub use jwt::*;
pub use validation::*;
