pub mod general;
pub mod owner;

pub use general::{about, help, start};
pub use owner::{broadcast, remove_user, stats};
