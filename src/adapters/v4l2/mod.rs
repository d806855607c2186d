#[cfg(feature = "v4l2")]
pub mod capture;
pub mod yuyv;
