pub mod error;
pub mod ids;

pub use error::{Error, Result};
pub use ids::{reward_code, short_id};
