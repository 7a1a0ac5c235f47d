pub mod bucket;
pub mod core;
pub mod error;
pub mod merge;
pub mod split;
pub mod workspace;


pub use self::bucket::*;
pub use self::core::*;
pub use self::error::*;
pub use self::merge::*;
pub use self::split::*;
pub use self::workspace::*;
