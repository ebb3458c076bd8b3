pub mod event;
pub mod meta;
pub mod payload;
pub mod stream;

pub use event::*;
pub use meta::*;
pub use payload::*;
pub use stream::*;
