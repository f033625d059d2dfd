mod composer;
mod feed_pager;
mod session_store;

pub use composer::*;
pub use feed_pager::*;
pub use session_store::*;
