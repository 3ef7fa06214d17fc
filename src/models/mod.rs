pub mod lead;
pub mod user;

pub use lead::*;
pub use user::*;
