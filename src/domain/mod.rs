pub mod detection;
pub mod errors;
pub mod frame;
pub mod model;
pub mod record;
pub mod session;
pub mod source;
pub mod stream;
