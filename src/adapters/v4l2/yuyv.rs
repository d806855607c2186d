use image::{Rgb, RgbImage};

fn yuv_to_rgb(y: f32, u: f32, v: f32) -> Rgb<u8> {
    // BT.601
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    Rgb([r, g, b])
}

/// Convierte un buffer YUYV (YUV 4:2:2) a RGB.
/// Cada bloque `[Y0, U, Y1, V]` describe dos píxeles contiguos.
pub fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);
    if w == 0 {
        return out;
    }

    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;

        let pixel_idx = i as u32 * 2;
        let (x, y) = (pixel_idx % w, pixel_idx / w);
        if y >= h {
            break;
        }
        out.put_pixel(x, y, yuv_to_rgb(chunk[0] as f32, u, v));
        if x + 1 < w {
            out.put_pixel(x + 1, y, yuv_to_rgb(chunk[2] as f32, u, v));
        }
    }
    out
}
