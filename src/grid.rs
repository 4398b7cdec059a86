//! 2D simulation grid and field storage.
//!
//! The grid is sized from the viewport by a resolution scale. Every physical
//! quantity lives in a [`Field`] of that size; quantities that are read and
//! written by the same stage are double-buffered in a [`PingPong`].
//!
//! # Coordinates
//!
//! - **Cell**: integer `(x, y)`, row 0 at the top of the display.
//! - **UV**: `(cell + 0.5) * cell_scale`, so the whole grid spans `[0, 1]²`.
//! - **NDC**: `[-1, 1]²` with y up, the space sources are reported in.
//!
//! ```ignore
//! let size = GridSize::from_viewport(UVec2::new(1280, 720), 0.5);
//! assert_eq!((size.width, size.height), (640, 360));
//! let velocity: PingPong<Field<Vec2>> = PingPong::new(Field::new(size), Field::new(size));
//! ```

use std::ops::{Add, Mul, Sub};

use glam::{IVec2, UVec2, Vec2, Vec4};

/// Grid dimensions in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Grid for a viewport: `round(scale * viewport)`, at least one cell per axis.
    pub fn from_viewport(viewport: UVec2, scale: f32) -> Self {
        let width = (viewport.x as f32 * scale).round() as u32;
        let height = (viewport.y as f32 * scale).round() as u32;
        Self::new(width, height)
    }

    #[inline]
    pub fn total_cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    #[inline]
    pub fn as_ivec2(&self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }

    pub fn cell_scale(&self) -> CellScale {
        CellScale(Vec2::ONE / self.as_vec2())
    }

    /// Aspect correction applied to backtraces so flow speed is isotropic in cells.
    pub fn advection_ratio(&self) -> Vec2 {
        let size = self.as_vec2();
        Vec2::splat(size.max_element()) / size
    }
}

/// Reciprocal grid resolution `(1/W, 1/H)`: one cell in UV units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellScale(pub Vec2);

impl CellScale {
    /// One cell in NDC units (twice the UV step).
    #[inline]
    pub fn ndc(&self) -> Vec2 {
        self.0 * 2.0
    }
}

/// Edge treatment shared by every stage.
///
/// `(0, 0)` leaves the whole grid open; a value equal to the cell scale
/// reserves a one-cell solid wall around the domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundarySpace(pub Vec2);

impl BoundarySpace {
    pub const OPEN: BoundarySpace = BoundarySpace(Vec2::ZERO);

    pub fn select(is_bounce: bool, cell_scale: CellScale) -> Self {
        if is_bounce {
            BoundarySpace(cell_scale.0)
        } else {
            Self::OPEN
        }
    }

    #[inline]
    pub fn is_walled(&self) -> bool {
        self.0 != Vec2::ZERO
    }

    /// Wall thickness in cells per axis.
    pub fn inset_cells(&self, cell_scale: CellScale) -> UVec2 {
        (self.0 / cell_scale.0).round().as_uvec2()
    }
}

/// Inclusive cell rectangle that reads are clamped to and face passes cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub lo: IVec2,
    pub hi: IVec2,
}

impl Bounds {
    pub fn full(size: GridSize) -> Self {
        Self {
            lo: IVec2::ZERO,
            hi: size.as_ivec2() - IVec2::ONE,
        }
    }

    /// The grid shrunk by `inset` cells on every side. Degenerate grids
    /// collapse to a single cell rather than inverting.
    pub fn inset(size: GridSize, inset: UVec2) -> Self {
        let lo = inset.as_ivec2();
        let hi = (size.as_ivec2() - IVec2::ONE - lo).max(lo);
        let lo = lo.min(size.as_ivec2() - IVec2::ONE);
        Self { lo, hi: hi.min(size.as_ivec2() - IVec2::ONE) }
    }

    #[inline]
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.cmpge(self.lo).all() && cell.cmple(self.hi).all()
    }

    #[inline]
    pub fn clamp(&self, cell: IVec2) -> IVec2 {
        cell.clamp(self.lo, self.hi)
    }
}

/// A value that can be stored in a field and linearly interpolated.
pub trait Sample:
    Copy + Default + Send + Sync + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    /// Euclidean magnitude, used for norms and diagnostics.
    fn magnitude(self) -> f32;
}

impl Sample for f32 {
    #[inline]
    fn magnitude(self) -> f32 {
        self.abs()
    }
}

impl Sample for Vec2 {
    #[inline]
    fn magnitude(self) -> f32 {
        self.length()
    }
}

impl Sample for Vec4 {
    #[inline]
    fn magnitude(self) -> f32 {
        self.length()
    }
}

/// A 2D array of samples at grid resolution.
#[derive(Clone, Debug)]
pub struct Field<T> {
    size: GridSize,
    data: Vec<T>,
}

impl<T: Sample> Field<T> {
    /// A zero-filled field.
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            data: vec![T::default(); size.total_cells()],
        }
    }

    /// A field initialised from a function of the cell.
    pub fn from_fn(size: GridSize, f: impl Fn(u32, u32) -> T) -> Self {
        let mut data = Vec::with_capacity(size.total_cells());
        for y in 0..size.height {
            for x in 0..size.width {
                data.push(f(x, y));
            }
        }
        Self { size, data }
    }

    #[inline]
    pub fn size(&self) -> GridSize {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Read a cell, clamping the coordinate into `bounds`.
    #[inline]
    pub fn load(&self, cell: IVec2, bounds: Bounds) -> T {
        let c = bounds.clamp(cell);
        self.data[c.y as usize * self.size.width as usize + c.x as usize]
    }

    /// Bilinear sample at a UV position with reads clamped to `bounds`.
    ///
    /// Positions are clamped to one cell past the grid before the integer
    /// conversion, so runaway backtraces read the edge instead of overflowing.
    pub fn sample(&self, uv: Vec2, bounds: Bounds) -> T {
        let p = (uv * self.size.as_vec2() - Vec2::splat(0.5)).clamp(Vec2::splat(-1.0), self.size.as_vec2());
        let base = p.floor();
        let f = p - base;
        let c = base.as_ivec2();

        let a = self.load(c, bounds);
        let b = self.load(c + IVec2::new(1, 0), bounds);
        let d = self.load(c + IVec2::new(0, 1), bounds);
        let e = self.load(c + IVec2::new(1, 1), bounds);

        let top = a + (b - a) * f.x;
        let bottom = d + (e - d) * f.x;
        top + (bottom - top) * f.y
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Largest sample magnitude in the field.
    pub fn max_magnitude(&self) -> f32 {
        self.data.iter().fold(0.0, |m, v| m.max(v.magnitude()))
    }

    /// Root-mean-square magnitude over the cells inside `bounds`.
    pub fn rms_in(&self, bounds: Bounds) -> f32 {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for y in bounds.lo.y..=bounds.hi.y {
            for x in bounds.lo.x..=bounds.hi.x {
                let m = self.get(x as u32, y as u32).magnitude() as f64;
                sum += m * m;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            (sum / count as f64).sqrt() as f32
        }
    }
}

/// Two buffers alternating between read-source and write-destination.
///
/// The read side holds the current value of the quantity. A stage reads it
/// and writes the other buffer, then calls [`swap`](Self::swap) to publish.
#[derive(Debug)]
pub struct PingPong<T> {
    buffers: [T; 2],
    read: usize,
}

impl<T> PingPong<T> {
    pub fn new(a: T, b: T) -> Self {
        Self {
            buffers: [a, b],
            read: 0,
        }
    }

    #[inline]
    pub fn read(&self) -> &T {
        &self.buffers[self.read]
    }

    #[inline]
    pub fn read_mut(&mut self) -> &mut T {
        &mut self.buffers[self.read]
    }

    #[inline]
    pub fn write(&self) -> &T {
        &self.buffers[1 - self.read]
    }

    #[inline]
    pub fn write_mut(&mut self) -> &mut T {
        &mut self.buffers[1 - self.read]
    }

    /// Borrow the read buffer immutably and the write buffer mutably at once.
    ///
    /// The two references always point at different buffers, so a pass can
    /// never sample the target it is writing.
    pub fn split(&mut self) -> (&T, &mut T) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.read == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Publish the write buffer as the new read buffer.
    #[inline]
    pub fn swap(&mut self) {
        self.read = 1 - self.read;
    }

    /// Index of the current read buffer (0 or 1).
    #[inline]
    pub fn read_index(&self) -> usize {
        self.read
    }
}

impl<T: Sample> PingPong<Field<T>> {
    /// A pair of zero-filled fields.
    pub fn zeroed(size: GridSize) -> Self {
        Self::new(Field::new(size), Field::new(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_from_viewport_rounds() {
        let size = GridSize::from_viewport(UVec2::new(1281, 719), 0.5);
        assert_eq!(size.width, 641);
        assert_eq!(size.height, 360);
    }

    #[test]
    fn test_grid_never_empty() {
        let size = GridSize::from_viewport(UVec2::new(1, 1), 0.1);
        assert_eq!((size.width, size.height), (1, 1));
    }

    #[test]
    fn test_cell_scale_is_reciprocal() {
        let size = GridSize::new(64, 32);
        let cs = size.cell_scale();
        assert_eq!(cs.0, Vec2::new(1.0 / 64.0, 1.0 / 32.0));
        assert_eq!(cs.ndc(), Vec2::new(2.0 / 64.0, 2.0 / 32.0));
    }

    #[test]
    fn test_boundary_select() {
        let cs = GridSize::new(10, 20).cell_scale();
        assert_eq!(BoundarySpace::select(false, cs), BoundarySpace::OPEN);
        let walls = BoundarySpace::select(true, cs);
        assert!(walls.is_walled());
        assert_eq!(walls.inset_cells(cs), UVec2::ONE);
        assert_eq!(BoundarySpace::OPEN.inset_cells(cs), UVec2::ZERO);
    }

    #[test]
    fn test_bounds_inset_and_degenerate() {
        let size = GridSize::new(8, 6);
        let b = Bounds::inset(size, UVec2::ONE);
        assert_eq!(b.lo, IVec2::new(1, 1));
        assert_eq!(b.hi, IVec2::new(6, 4));
        assert!(b.contains(IVec2::new(1, 4)));
        assert!(!b.contains(IVec2::new(0, 4)));

        let tiny = Bounds::inset(GridSize::new(1, 1), UVec2::ONE);
        assert_eq!(tiny.lo, IVec2::ZERO);
        assert_eq!(tiny.hi, IVec2::ZERO);
    }

    #[test]
    fn test_sample_at_cell_center_is_exact() {
        let size = GridSize::new(4, 4);
        let field = Field::from_fn(size, |x, y| (x + 10 * y) as f32);
        let bounds = Bounds::full(size);
        let uv = (Vec2::new(2.0, 1.0) + 0.5) * size.cell_scale().0;
        assert!((field.sample(uv, bounds) - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_sample_interpolates_between_cells() {
        let size = GridSize::new(4, 1);
        let field = Field::from_fn(size, |x, _| x as f32);
        let bounds = Bounds::full(size);
        // Halfway between cell 1 and cell 2 centers.
        let uv = Vec2::new(2.0 / 4.0, 0.5);
        assert!((field.sample(uv, bounds) - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_sample_clamps_to_edge() {
        let size = GridSize::new(4, 1);
        let field = Field::from_fn(size, |x, _| x as f32);
        let bounds = Bounds::full(size);
        assert!((field.sample(Vec2::new(-3.0, 0.5), bounds) - 0.0).abs() < 1e-5);
        assert!((field.sample(Vec2::new(5.0, 0.5), bounds) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_sample_far_outside_reads_edge() {
        let size = GridSize::new(4, 2);
        let field = Field::from_fn(size, |x, _| x as f32);
        let bounds = Bounds::full(size);
        assert_eq!(field.sample(Vec2::new(-1e12, 0.5), bounds), 0.0);
        assert_eq!(field.sample(Vec2::new(1e12, 0.5), bounds), 3.0);
        assert_eq!(field.sample(Vec2::new(f32::INFINITY, f32::NEG_INFINITY), bounds), 3.0);
        assert_eq!(field.sample(Vec2::splat(f32::MAX), bounds), 3.0);
    }

    #[test]
    fn test_ping_pong_split_never_aliases() {
        let mut pp = PingPong::new(1, 2);
        {
            let (r, w) = pp.split();
            assert_eq!(*r, 1);
            *w = 5;
        }
        pp.swap();
        assert_eq!(*pp.read(), 5);
        assert_eq!(pp.read_index(), 1);
        let (r, w) = pp.split();
        assert_eq!(*r, 5);
        assert_eq!(*w, 1);
    }

    #[test]
    fn test_rms_in_bounds() {
        let size = GridSize::new(3, 3);
        let mut field: Field<f32> = Field::new(size);
        field.set(1, 1, 3.0);
        let all = Bounds::full(size);
        assert!((field.rms_in(all) - (9.0f32 / 9.0).sqrt()).abs() < 1e-6);
        let center = Bounds::inset(size, UVec2::ONE);
        assert!((field.rms_in(center) - 3.0).abs() < 1e-6);
        assert_eq!(field.max_magnitude(), 3.0);
    }
}
