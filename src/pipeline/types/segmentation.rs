/// Per-pixel foreground grid produced by segmentation, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; (width as usize) * (height as usize)],
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![true; (width as usize) * (height as usize)],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize) * (self.width as usize) + (x as usize))
    }

    /// Out-of-bounds coordinates are background.
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.index(x, y).map(|i| self.cells[i]).unwrap_or(false)
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = value;
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    pub fn is_empty(&self) -> bool {
        self.foreground_count() == 0
    }

    /// Fraction of the grid marked as foreground.
    pub fn coverage(&self) -> f32 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.foreground_count() as f32 / self.cells.len() as f32
    }

    /// Nearest-neighbour resample, used when a provider answers at a different resolution
    /// than the input image.
    pub fn resized(&self, width: u32, height: u32) -> Mask {
        if width == self.width && height == self.height {
            return self.clone();
        }
        if self.width == 0 || self.height == 0 {
            return Mask::empty(width, height);
        }
        Mask::from_fn(width, height, |x, y| {
            let src_x = ((x as u64 * self.width as u64) / width as u64) as u32;
            let src_y = ((y as u64 * self.height as u64) / height as u64) as u32;
            self.get(src_x, src_y)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationOutcome {
    pub mask: Mask,
    /// Provider confidence in the mask, in `[0, 1]`.
    pub score: f32,
}

impl SegmentationOutcome {
    pub fn new(mask: Mask, score: f32) -> Self {
        Self { mask, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_fills_row_major() {
        let mask = Mask::from_fn(4, 2, |x, y| x == 3 && y == 1);
        assert!(mask.get(3, 1));
        assert!(!mask.get(1, 3));
        assert_eq!(mask.foreground_count(), 1);
        assert!(!mask.get(10, 10));
    }

    #[test]
    fn coverage_reports_foreground_fraction() {
        let mut mask = Mask::empty(2, 2);
        assert!(mask.is_empty());
        mask.set(0, 0, true);
        assert_eq!(mask.coverage(), 0.25);
        assert_eq!(Mask::full(3, 3).coverage(), 1.0);
    }

    #[test]
    fn resized_keeps_the_foreground_quadrant() {
        // left half foreground
        let mask = Mask::from_fn(4, 4, |x, _| x < 2);
        let scaled = mask.resized(8, 2);
        assert_eq!(scaled.width(), 8);
        assert_eq!(scaled.height(), 2);
        assert!(scaled.get(0, 0));
        assert!(scaled.get(3, 1));
        assert!(!scaled.get(4, 0));
        assert_eq!(scaled.foreground_count(), 8);
    }
}
