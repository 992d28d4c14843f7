pub mod error;
pub mod schema;
pub mod state;
pub mod utils;

pub use error::ApiError;
