mod api;
mod book;
mod errors;
mod feed_item;
mod session;
mod storage;
mod user;

pub use api::*;
pub use book::*;
pub use errors::*;
pub use feed_item::*;
pub use session::*;
pub use storage::*;
pub use user::*;
