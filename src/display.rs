pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

/// Byte sentinels for a lit and unlit cell. Hosts may blend between them;
/// the interpreter only ever asks whether a cell is on.
pub const PIXEL_ON: u8 = 0xFF;
pub const PIXEL_OFF: u8 = 0x00;

pub type Snapshot = [[bool; WIDTH]; HEIGHT];

#[derive(Debug)]
pub struct FrameBuffer {
    bit_buffer: Box<[u8; WIDTH * HEIGHT]>,
    dirty: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            bit_buffer: Box::new([PIXEL_OFF; WIDTH * HEIGHT]),
            dirty: true,
        }
    }

    pub fn clear_buffer(&mut self) {
        self.bit_buffer.fill(PIXEL_OFF);
        self.dirty = true;
    }

    /// Lights every cell.
    pub fn fill(&mut self) {
        self.bit_buffer.fill(PIXEL_ON);
        self.dirty = true;
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.bit_buffer[y * WIDTH + x] == PIXEL_ON
    }

    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.bit_buffer[y * WIDTH + x] = if on { PIXEL_ON } else { PIXEL_OFF };
        self.dirty = true;
    }

    /// XORs `sprite` onto the screen with its top-left corner at `(x, y)`.
    /// Each byte is one row, most significant bit leftmost. Every pixel wraps
    /// around the screen edges on its own. Returns whether any lit pixel was
    /// switched off.
    pub fn paint(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (i, row) in sprite.iter().enumerate() {
            let ny = (y as usize + i) % HEIGHT;
            for j in 0..8 {
                if (row >> (7 - j)) & 1 == 0 {
                    continue;
                }
                let nx = (x as usize + j) % WIDTH;
                let previous = self.get(nx, ny);
                collision |= previous;
                self.set(nx, ny, !previous);
            }
        }
        collision
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = [[false; WIDTH]; HEIGHT];
        for (y, row) in snapshot.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = self.get(x, y);
            }
        }
        snapshot
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Row-major 0RGB buffer for framebuffer-style hosts.
    pub fn to_argb(&self, on: u32, off: u32) -> Vec<u32> {
        self.bit_buffer
            .iter()
            .map(|&cell| if cell == PIXEL_ON { on } else { off })
            .collect()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_SPRITE: [u8; 3] = [0b1110_0000, 0b1010_0000, 0b1110_0000];

    fn lit_cells(fb: &FrameBuffer) -> Vec<(usize, usize)> {
        let mut lit = vec![];
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                if fb.get(x, y) {
                    lit.push((x, y));
                }
            }
        }
        lit
    }

    #[test]
    fn test_clear_after_fill() {
        let mut fb = FrameBuffer::new();
        fb.fill();
        assert!(fb.snapshot().iter().flatten().all(|&on| on));
        fb.clear_buffer();
        assert!(fb.snapshot().iter().flatten().all(|&on| !on));
    }

    #[test]
    fn test_paint_then_erase() {
        let mut fb = FrameBuffer::new();
        assert!(!fb.paint(5, 10, &BOX_SPRITE));
        assert_eq!(
            lit_cells(&fb),
            vec![
                (5, 10),
                (6, 10),
                (7, 10),
                (5, 11),
                (7, 11),
                (5, 12),
                (6, 12),
                (7, 12)
            ]
        );

        assert!(fb.paint(5, 10, &BOX_SPRITE));
        assert!(lit_cells(&fb).is_empty());
    }

    #[test]
    fn test_paint_wraps_per_pixel() {
        let mut fb = FrameBuffer::new();
        fb.paint(62, 31, &[0b1110_0000, 0b1000_0000]);
        assert_eq!(lit_cells(&fb), vec![(62, 0), (0, 31), (62, 31), (63, 31)]);
    }

    #[test]
    fn test_collision_only_when_lit_pixel_turns_off() {
        let mut fb = FrameBuffer::new();
        fb.set(0, 0, true);
        // zero bits never erase
        assert!(!fb.paint(0, 0, &[0b0111_1111]));
        assert!(fb.get(0, 0));
        assert!(fb.paint(0, 0, &[0b1000_0000]));
        assert!(!fb.get(0, 0));
    }

    #[test]
    fn test_dirty_flag_and_argb() {
        let mut fb = FrameBuffer::new();
        assert!(fb.take_dirty());
        assert!(!fb.take_dirty());
        fb.set(1, 0, true);
        assert!(fb.take_dirty());

        let argb = fb.to_argb(0xFFFFFF, 0x000000);
        assert_eq!(argb.len(), WIDTH * HEIGHT);
        assert_eq!(argb[1], 0xFFFFFF);
        assert_eq!(argb[0], 0x000000);
    }
}
