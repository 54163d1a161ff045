pub mod error;
pub mod models;
pub mod result;
pub mod traits;

pub use error::*;
pub use models::*;
pub use result::*;
pub use traits::*;
