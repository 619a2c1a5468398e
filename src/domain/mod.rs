pub mod attachment;
pub mod comment;
pub mod task;
pub mod user;

pub use attachment::*;
pub use comment::*;
pub use task::*;
pub use user::*;
