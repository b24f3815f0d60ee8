//! Data models

mod invite;
mod member;
mod organization;
mod plan;

pub use invite::*;
pub use member::*;
pub use organization::*;
pub use plan::*;
