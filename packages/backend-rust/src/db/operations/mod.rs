pub mod messages;
pub mod progress;
pub mod vocabulary;

pub use messages::*;
pub use progress::*;
pub use vocabulary::*;
