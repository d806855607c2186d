pub mod model_catalog;
pub mod nms;
#[cfg(feature = "onnx")]
pub mod yolo_engine;
