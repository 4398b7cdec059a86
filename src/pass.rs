//! CPU shader passes.
//!
//! A [`ShaderPass`] evaluates a fragment function for every cell it covers
//! and writes (or adds) the result into an output field, mirroring one draw
//! call of the GPU backend. Rows are shaded in parallel with rayon; the
//! fragment function only sees immutable inputs, so there is no shared
//! mutable state between rows.

use glam::{IVec2, Vec2};
use rayon::prelude::*;

use crate::grid::{Bounds, Field, GridSize, Sample};

/// Which cells a pass rasterizes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Coverage {
    /// Every cell inside the bounds (the full-screen face, inset by the walls).
    Face(Bounds),
    /// A rectangle around `center` with half-extent `extent`, both in NDC.
    Quad { center: Vec2, extent: Vec2 },
    /// The one-cell ring around the grid.
    Boundary,
}

/// How shaded values combine with the existing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    Replace,
    Additive,
}

/// Inputs to a fragment function for one cell.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub cell: IVec2,
    /// Cell center in UV space.
    pub uv: Vec2,
    /// Position relative to the covered quad, `[-1, 1]²` with y up. Zero for face passes.
    pub local: Vec2,
}

/// A single rasterization of a fragment function into a field.
#[derive(Clone, Copy, Debug)]
pub struct ShaderPass {
    pub label: &'static str,
    pub coverage: Coverage,
    pub blend: Blend,
}

impl ShaderPass {
    pub fn face(label: &'static str, bounds: Bounds) -> Self {
        Self {
            label,
            coverage: Coverage::Face(bounds),
            blend: Blend::Replace,
        }
    }

    pub fn quad(label: &'static str, center: Vec2, extent: Vec2) -> Self {
        Self {
            label,
            coverage: Coverage::Quad { center, extent },
            blend: Blend::Additive,
        }
    }

    pub fn boundary(label: &'static str) -> Self {
        Self {
            label,
            coverage: Coverage::Boundary,
            blend: Blend::Replace,
        }
    }

    /// Shade every covered cell of `output`.
    ///
    /// # Panics
    ///
    /// Panics if `output` does not match `grid`; fields must be recreated on
    /// resize before any pass runs against them.
    pub fn render<T, F>(&self, grid: GridSize, output: &mut Field<T>, shade: F)
    where
        T: Sample,
        F: Fn(&Fragment) -> T + Sync,
    {
        assert_eq!(
            output.size(),
            grid,
            "{}: output field is {:?} but the grid is {:?}",
            self.label,
            output.size(),
            grid
        );

        let cell_scale = grid.cell_scale().0;
        let width = grid.width as usize;
        let coverage = self.coverage;
        let blend = self.blend;

        output
            .data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let cell = IVec2::new(x as i32, y as i32);
                    let uv = (cell.as_vec2() + 0.5) * cell_scale;
                    let local = match coverage {
                        Coverage::Face(bounds) => {
                            if !bounds.contains(cell) {
                                continue;
                            }
                            Vec2::ZERO
                        }
                        Coverage::Quad { center, extent } => {
                            let local = (uv_to_ndc(uv) - center) / extent;
                            if local.x.abs() >= 1.0 || local.y.abs() >= 1.0 {
                                continue;
                            }
                            local
                        }
                        Coverage::Boundary => {
                            let on_edge = cell.x == 0
                                || cell.y == 0
                                || cell.x == grid.width as i32 - 1
                                || cell.y == grid.height as i32 - 1;
                            if !on_edge {
                                continue;
                            }
                            Vec2::ZERO
                        }
                    };

                    let value = shade(&Fragment { cell, uv, local });
                    *out = match blend {
                        Blend::Replace => value,
                        Blend::Additive => *out + value,
                    };
                }
            });
    }
}

/// UV (y down) to NDC (y up).
#[inline]
pub fn uv_to_ndc(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0)
}

/// NDC (y up) to UV (y down).
#[inline]
pub fn ndc_to_uv(ndc: Vec2) -> Vec2 {
    Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5)
}

/// A displacement in NDC expressed as a UV-space vector.
#[inline]
pub fn ndc_delta_to_uv(delta: Vec2) -> Vec2 {
    Vec2::new(delta.x * 0.5, -delta.y * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec2;

    #[test]
    fn test_coordinate_round_trip() {
        let uv = Vec2::new(0.25, 0.75);
        let ndc = uv_to_ndc(uv);
        assert_eq!(ndc, Vec2::new(-0.5, -0.5));
        assert_eq!(ndc_to_uv(ndc), uv);
    }

    #[test]
    fn test_face_pass_covers_all_cells() {
        let grid = GridSize::new(5, 4);
        let mut out: Field<f32> = Field::new(grid);
        ShaderPass::face("test", Bounds::full(grid)).render(grid, &mut out, |f| f.cell.x as f32 + 1.0);
        assert!(out.data().iter().all(|v| *v >= 1.0));
        assert_eq!(out.get(4, 3), 5.0);
    }

    #[test]
    fn test_inset_face_leaves_ring_untouched() {
        let grid = GridSize::new(6, 6);
        let mut out: Field<f32> = Field::new(grid);
        out.fill(-1.0);
        let bounds = Bounds::inset(grid, UVec2::ONE);
        ShaderPass::face("test", bounds).render(grid, &mut out, |_| 1.0);
        assert_eq!(out.get(0, 3), -1.0);
        assert_eq!(out.get(5, 5), -1.0);
        assert_eq!(out.get(1, 1), 1.0);
        assert_eq!(out.get(4, 4), 1.0);
    }

    #[test]
    fn test_quad_pass_is_additive_and_local() {
        let grid = GridSize::new(16, 16);
        let mut out: Field<f32> = Field::new(grid);
        out.fill(1.0);
        let extent = grid.cell_scale().ndc() * 2.0;
        ShaderPass::quad("test", Vec2::ZERO, extent).render(grid, &mut out, |f| {
            assert!(f.local.x.abs() < 1.0 && f.local.y.abs() < 1.0);
            1.0
        });
        // Centered quad spanning two cells each way covers cells 6..=9.
        assert_eq!(out.get(7, 7), 2.0);
        assert_eq!(out.get(6, 9), 2.0);
        assert_eq!(out.get(5, 7), 1.0);
        assert_eq!(out.get(0, 0), 1.0);
    }

    #[test]
    fn test_boundary_pass_only_touches_ring() {
        let grid = GridSize::new(5, 5);
        let mut out: Field<f32> = Field::new(grid);
        ShaderPass::boundary("test").render(grid, &mut out, |_| 1.0);
        let ring: f32 = out.data().iter().sum();
        assert_eq!(ring, 16.0);
        assert_eq!(out.get(2, 2), 0.0);
    }

    #[test]
    #[should_panic(expected = "output field")]
    fn test_mismatched_output_panics() {
        let mut out: Field<f32> = Field::new(GridSize::new(4, 4));
        ShaderPass::face("mismatch", Bounds::full(GridSize::new(8, 8))).render(GridSize::new(8, 8), &mut out, |_| 0.0);
    }
}
