pub mod encode;
pub mod probe;
pub mod progress;
