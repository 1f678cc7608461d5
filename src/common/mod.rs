pub mod fs;
pub mod response;
