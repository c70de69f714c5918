use super::{Bounds, ViewError, ViewVolume};

/// A chunk column inside a view volume with its visible sections, top-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub x: i32,
    pub z: i32,
    pub sections: Vec<i32>,
}

impl Column {
    pub fn new(x: i32, z: i32, y: Bounds) -> Self {
        Self {
            x,
            z,
            sections: y.descending().collect(),
        }
    }
}

/// Result of [`diff`]: columns only in `a`, in both, and only in `b`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDiff {
    pub only_a: Vec<Column>,
    pub overlap: Vec<Column>,
    pub only_b: Vec<Column>,
}

fn middle(a: Bounds, b: Bounds) -> Bounds {
    let mut corners = [a.min, a.max, b.min, b.max];
    corners.sort_unstable();
    Bounds::new(corners[1], corners[2])
}

/// Bounding box of the inner two of the four extreme corners per axis.
///
/// For overlapping volumes this is their intersection.
pub fn difference(a: &ViewVolume, b: &ViewVolume) -> Result<ViewVolume, ViewError> {
    if a == b {
        return Err(ViewError::DegenerateVolumes);
    }
    Ok(ViewVolume {
        x: middle(a.x, b.x),
        y: middle(a.y, b.y),
        z: middle(a.z, b.z),
    })
}

/// Partition the columns of `a` and `b` into only-`a`, shared, and only-`b`.
///
/// This is the one place chunk load/unload sets are derived from a move:
/// `diff(new, old)` yields the columns to load, to leave alone, and to
/// unload. Disjoint volumes produce their full enumerations and no overlap.
pub fn diff(a: &ViewVolume, b: &ViewVolume) -> Result<ViewDiff, ViewError> {
    if a == b {
        return Err(ViewError::DegenerateVolumes);
    }
    if !a.overlaps(b) {
        return Ok(ViewDiff {
            only_a: a.columns(),
            overlap: Vec::new(),
            only_b: b.columns(),
        });
    }

    let shared = difference(a, b)?;
    let shared_rect = shared.rect();
    let outside = |volume: &ViewVolume| -> Vec<Column> {
        volume
            .columns()
            .into_iter()
            .filter(|c| !shared_rect.contains(c.x, c.z))
            .collect()
    };

    Ok(ViewDiff {
        only_a: outside(a),
        overlap: shared.columns(),
        only_b: outside(b),
    })
}
