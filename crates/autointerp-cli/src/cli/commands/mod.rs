pub mod dispatch;
pub mod explain;
pub mod prompt;
pub(crate) mod setup;
pub mod show;

pub use dispatch::dispatch;
