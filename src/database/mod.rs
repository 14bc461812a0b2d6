pub mod connection;

pub use connection::*;

#[cfg(test)]
pub(crate) mod testing;
