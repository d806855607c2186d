use image::Rgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Color por clase: se elige al azar la primera vez y se memoriza.
pub struct ColorRegistry {
    colors: HashMap<String, Rgb<u8>>,
    rng: StdRng,
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self { colors: HashMap::new(), rng: StdRng::from_entropy() }
    }

    pub fn color_for(&mut self, class_name: &str) -> Rgb<u8> {
        if let Some(color) = self.colors.get(class_name) {
            return *color;
        }
        let color = Rgb([
            self.rng.gen_range(0..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(0..255),
        ]);
        self.colors.insert(class_name.to_string(), color);
        color
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }
}

impl Default for ColorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
