//! A slowly fading screen that the beam draws on.

use bresenham::Bresenham;
use vectorgen::screen::{Beam, ScreenConfig};

/// Width and height of the window in pixels.
pub const SIZE: usize = 512;

const GLOW: u32 = 0x40ff40;

pub type Pixel = (isize, isize);

/// Map a beam position to window pixels, origin at the bottom left.
pub fn to_pixel(beam: Beam, config: &ScreenConfig) -> Pixel {
    fn axis(pos: i32, size_pow: u8, centered: bool) -> isize {
        let size = 1i64 << size_pow;
        let offset = if centered { size / 2 } else { 0 };
        ((pos as i64 + offset) * (SIZE as i64 - 1) / size) as isize
    }
    let x = axis(beam.x, config.x_size_pow, config.x_centered);
    let y = axis(beam.y, config.y_size_pow, config.y_centered);
    (x, SIZE as isize - 1 - y)
}

pub struct Phosphor {
    buf: Vec<u32>,
}

impl Phosphor {
    pub fn new() -> Self {
        Self { buf: vec![0; SIZE * SIZE] }
    }

    pub fn buf(&self) -> &[u32] {
        &self.buf
    }

    /// Fade every channel to 3/4 of its brightness.
    pub fn decay(&mut self) {
        for px in &mut self.buf {
            *px = (*px >> 1 & 0x7f7f7f) + (*px >> 2 & 0x3f3f3f);
        }
    }

    pub fn plot(&mut self, (x, y): Pixel) {
        if (0..SIZE as isize).contains(&x) && (0..SIZE as isize).contains(&y) {
            self.buf[y as usize * SIZE + x as usize] = GLOW;
        }
    }

    /// Light up the path of the beam between two positions.
    pub fn trace(&mut self, from: Pixel, to: Pixel) {
        for px in Bresenham::new(from, to) {
            self.plot(px);
        }
        self.plot(to);
    }
}
