pub mod errors;

pub use errors::{AlphaSpError, AlphaSpErrorCategory};
