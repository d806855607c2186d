pub mod annotator;
pub mod color;
pub mod drivers;
pub mod dto;
pub mod pipeline;
pub mod ports;
pub mod services;

#[cfg(test)]
pub mod testing;
