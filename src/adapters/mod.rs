pub mod http;
pub mod media;
pub mod onnx;
pub mod storage;
pub mod tracking;
pub mod v4l2;
