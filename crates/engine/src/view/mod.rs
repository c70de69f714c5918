//! View volumes: the cuboid of chunk coordinates a viewer can see.
//!
//! A volume is three closed intervals of chunk coordinates. The y interval is
//! always clamped to the valid section range `0..=15`.

mod diff;

pub use diff::{Column, ViewDiff, diff, difference};

use std::fmt;

use crate::world::position::chunk_coord;

pub const MIN_SECTION_Y: i32 = 0;
pub const MAX_SECTION_Y: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewError {
    /// A radius or the vertical center was negative.
    InvalidRadius,
    /// Two identical volumes were compared; there is no movement to diff.
    DegenerateVolumes,
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::InvalidRadius => write!(f, "view radius and center y must be non-negative"),
            ViewError::DegenerateVolumes => write!(f, "cannot diff identical view volumes"),
        }
    }
}

impl std::error::Error for ViewError {}

/// Closed interval `[min, max]`, always normalized so `max >= min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min: i32,
    pub max: i32,
}

impl Bounds {
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    fn clamped(self, lo: i32, hi: i32) -> Self {
        Self {
            min: self.min.clamp(lo, hi),
            max: self.max.clamp(lo, hi),
        }
    }

    #[inline]
    pub fn contains(&self, v: i32) -> bool {
        self.min <= v && v <= self.max
    }

    #[inline]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    pub fn len(&self) -> usize {
        (self.max as i64 - self.min as i64 + 1) as usize
    }

    /// Values from `max` down to `min`.
    pub fn descending(self) -> impl Iterator<Item = i32> {
        (self.min..=self.max).rev()
    }
}

/// 2-D projection of a view volume onto the x/z plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: Bounds,
    pub z: Bounds,
}

impl Rect {
    #[inline]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.x.contains(x) && self.z.contains(z)
    }

    pub fn area(&self) -> usize {
        self.x.len() * self.z.len()
    }

    /// Column coordinates, z descending then x descending.
    pub fn coords(self) -> impl Iterator<Item = (i32, i32)> {
        let x = self.x;
        self.z
            .descending()
            .flat_map(move |z| x.descending().map(move |x| (x, z)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewVolume {
    pub x: Bounds,
    pub y: Bounds,
    pub z: Bounds,
}

impl ViewVolume {
    /// Volume centered on chunk `(cx, cy, cz)` extending `dx`, `dy`, `dz`
    /// chunks along each axis.
    pub fn from_center(
        cx: i32,
        cy: i32,
        cz: i32,
        dx: i32,
        dy: i32,
        dz: i32,
    ) -> Result<Self, ViewError> {
        if dx < 0 || dy < 0 || dz < 0 || cy < 0 {
            return Err(ViewError::InvalidRadius);
        }
        Ok(Self::from_bounds(
            (cx.saturating_sub(dx), cx.saturating_add(dx)),
            (cy.saturating_sub(dy), cy.saturating_add(dy)),
            (cz.saturating_sub(dz), cz.saturating_add(dz)),
        ))
    }

    /// Volume from raw bounds; each pair is normalized and y is clamped.
    pub fn from_bounds(x: (i32, i32), y: (i32, i32), z: (i32, i32)) -> Self {
        Self {
            x: Bounds::new(x.0, x.1),
            y: Bounds::new(y.0, y.1).clamped(MIN_SECTION_Y, MAX_SECTION_Y),
            z: Bounds::new(z.0, z.1),
        }
    }

    /// Full-height volume a player at world position `(x, z)` can see with
    /// the given render distance.
    pub fn around_player(x: f64, z: f64, render_distance: i32) -> Result<Self, ViewError> {
        Self::from_center(
            chunk_coord(x),
            MIN_SECTION_Y,
            chunk_coord(z),
            render_distance,
            MAX_SECTION_Y - MIN_SECTION_Y,
            render_distance,
        )
    }

    /// The same volume shifted by `dx`, `dz` chunks. Height is unchanged;
    /// bounds saturate at the `i32` range.
    pub fn translated(&self, dx: i32, dz: i32) -> Self {
        Self {
            x: Bounds::new(self.x.min.saturating_add(dx), self.x.max.saturating_add(dx)),
            y: self.y,
            z: Bounds::new(self.z.min.saturating_add(dz), self.z.max.saturating_add(dz)),
        }
    }

    pub fn overlaps(&self, other: &ViewVolume) -> bool {
        self.x.overlaps(&other.x) && self.y.overlaps(&other.y) && self.z.overlaps(&other.z)
    }

    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            z: self.z,
        }
    }

    pub fn contains_column(&self, x: i32, z: i32) -> bool {
        self.rect().contains(x, z)
    }

    /// Every column of the volume, z descending then x descending, each
    /// carrying its sections top-down.
    pub fn columns(&self) -> Vec<Column> {
        self.rect()
            .coords()
            .map(|(x, z)| Column::new(x, z, self.y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_center_rejects_negative_radius() {
        assert_eq!(
            ViewVolume::from_center(0, 0, 0, -1, 1, 1),
            Err(ViewError::InvalidRadius)
        );
        assert_eq!(
            ViewVolume::from_center(0, -1, 0, 1, 1, 1),
            Err(ViewError::InvalidRadius)
        );
        assert!(ViewVolume::from_center(-5, 0, -5, 0, 0, 0).is_ok());
    }

    #[test]
    fn y_is_clamped_to_section_range() {
        let v = ViewVolume::from_center(0, 14, 0, 2, 4, 2).unwrap();
        assert_eq!(v.y, Bounds { min: 10, max: 15 });
        let v = ViewVolume::from_bounds((3, -3), (-7, 40), (0, 0));
        assert_eq!(v.x, Bounds { min: -3, max: 3 });
        assert_eq!(v.y, Bounds { min: 0, max: 15 });
    }

    #[test]
    fn around_player_spans_full_height() {
        let v = ViewVolume::around_player(-0.5, 33.0, 4).unwrap();
        assert_eq!(v.x, Bounds { min: -5, max: 3 });
        assert_eq!(v.z, Bounds { min: -2, max: 6 });
        assert_eq!(v.y, Bounds { min: 0, max: 15 });
        assert_eq!(
            ViewVolume::around_player(0.0, 0.0, -1),
            Err(ViewError::InvalidRadius)
        );
    }

    #[test]
    fn overlap_is_closed_interval() {
        let a = ViewVolume::from_center(0, 0, 0, 1, 1, 1).unwrap();
        let b = ViewVolume::from_center(1, 1, 1, 1, 1, 1).unwrap();
        let c = ViewVolume::from_center(2, 0, 0, 0, 0, 0).unwrap();
        let d = ViewVolume::from_center(3, 0, 0, 0, 0, 0).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn translated_matches_recentered_volume() {
        let v = ViewVolume::around_player(8.0, 8.0, 3).unwrap();
        let moved = ViewVolume::around_player(8.0 + 16.0 * 2.0, 8.0 - 16.0, 3).unwrap();
        assert_eq!(v.translated(2, -1), moved);
    }

    #[test]
    fn coords_outlive_their_rect() {
        let coords = {
            let rect = ViewVolume::from_bounds((0, 1), (0, 0), (0, 1)).rect();
            rect.coords()
        };
        assert_eq!(coords.collect::<Vec<_>>(), vec![(1, 1), (0, 1), (1, 0), (0, 0)]);
    }

    #[test]
    fn extreme_centers_saturate_instead_of_overflowing() {
        let v = ViewVolume::from_center(i32::MAX, 0, i32::MIN, 4, 15, 4).unwrap();
        assert_eq!(v.x, Bounds { min: i32::MAX - 4, max: i32::MAX });
        assert_eq!(v.z, Bounds { min: i32::MIN, max: i32::MIN + 4 });

        let moved = v.translated(10, -10);
        assert_eq!(moved.x.max, i32::MAX);
        assert_eq!(moved.z.min, i32::MIN);
        assert_eq!(moved.y, v.y);
    }

    #[test]
    fn columns_enumerate_z_then_x_descending() {
        let v = ViewVolume::from_bounds((0, 1), (0, 1), (0, 1));
        let coords: Vec<_> = v.columns().iter().map(|c| (c.x, c.z)).collect();
        assert_eq!(coords, vec![(1, 1), (0, 1), (1, 0), (0, 0)]);
        assert_eq!(v.columns()[0].sections, vec![1, 0]);
    }
}
