//! Uniform-cell broad phase for bullet-vs-ship collision.
//!
//! The grid is rebuilt from scratch every tick from current ship positions.
//! Ship counts are modest, so a linear rebuild is cheaper than maintaining
//! incremental updates. Cell vectors are cleared rather than dropped between
//! rebuilds, and whole grids are pooled per cell size in [`GridPool`].

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SimError};

/// Integer cell coordinate.
pub type CellKey = (i64, i64);

/// Buckets entity handles by the cell containing their center.
///
/// Handles are opaque `usize` values; the simulation stores ship indices.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    occupied: Vec<CellKey>,
    len: usize,
}

impl SpatialGrid {
    /// Create an empty grid.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidCellSize`] if `cell_size` is not a
    /// positive finite number.
    pub fn new(cell_size: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            occupied: Vec::new(),
            len: 0,
        })
    }

    /// Edge length of one cell.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of inserted handles.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been inserted since the last clear.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cell containing a point: `floor(x / cell_size), floor(y / cell_size)`.
    #[must_use]
    pub fn cell_of(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    /// Remove every handle, keeping the cell allocations for the next rebuild.
    pub fn clear(&mut self) {
        for key in self.occupied.drain(..) {
            if let Some(bucket) = self.cells.get_mut(&key) {
                bucket.clear();
            }
        }
        self.len = 0;
    }

    /// Bucket `handle` at the cell containing `(x, y)`.
    pub fn insert(&mut self, handle: usize, x: f64, y: f64) {
        let key = self.cell_of(x, y);
        let bucket = self.cells.entry(key).or_default();
        if bucket.is_empty() {
            self.occupied.push(key);
        }
        bucket.push(handle);
        self.len += 1;
    }

    /// Collect every handle in cells overlapping the square bounding the
    /// circle `(x, y, r)` into `out`, sorted and de-duplicated.
    ///
    /// The result is a superset of the handles whose *center* lies within
    /// `r`; callers widen `r` by the largest entity radius to cover overlap.
    ///
    /// Cost is bounded by the number of occupied cells: when the query square
    /// covers more cells than are occupied, the occupied cells are tested
    /// against the square instead of walking it.
    pub fn query_radius(&self, x: f64, y: f64, r: f64, out: &mut Vec<usize>) {
        out.clear();
        let r = r.max(0.0);
        let (min_cx, min_cy) = self.cell_of(x - r, y - r);
        let (max_cx, max_cy) = self.cell_of(x + r, y + r);

        let span_x = i128::from(max_cx) - i128::from(min_cx) + 1;
        let span_y = i128::from(max_cy) - i128::from(min_cy) + 1;
        if span_x.saturating_mul(span_y) > self.occupied.len() as i128 {
            for key in &self.occupied {
                let inside =
                    (min_cx..=max_cx).contains(&key.0) && (min_cy..=max_cy).contains(&key.1);
                if let (true, Some(bucket)) = (inside, self.cells.get(key)) {
                    out.extend_from_slice(bucket);
                }
            }
        } else {
            for cx in min_cx..=max_cx {
                for cy in min_cy..=max_cy {
                    if let Some(bucket) = self.cells.get(&(cx, cy)) {
                        out.extend_from_slice(bucket);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

/// Grids reused across ticks, one per distinct cell size.
#[derive(Debug, Clone, Default)]
pub struct GridPool {
    grids: BTreeMap<u64, SpatialGrid>,
}

impl GridPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cleared grid for `cell_size`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidCellSize`] for a non-positive cell size.
    pub fn acquire(&mut self, cell_size: f64) -> Result<&mut SpatialGrid> {
        let key = cell_size.to_bits();
        if !self.grids.contains_key(&key) {
            self.grids.insert(key, SpatialGrid::new(cell_size)?);
        }
        let grid = self
            .grids
            .get_mut(&key)
            .ok_or(SimError::InvalidCellSize(cell_size))?;
        grid.clear();
        Ok(grid)
    }

    /// Number of distinct grids held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// Whether no grid has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::circles_overlap;

    #[test]
    fn test_rejects_bad_cell_size() {
        assert!(matches!(
            SpatialGrid::new(0.0),
            Err(SimError::InvalidCellSize(_))
        ));
        assert!(SpatialGrid::new(-5.0).is_err());
        assert!(SpatialGrid::new(f64::NAN).is_err());
    }

    #[test]
    fn test_cell_of_floors_negative_coordinates() {
        let grid = SpatialGrid::new(10.0).unwrap();
        assert_eq!(grid.cell_of(0.0, 0.0), (0, 0));
        assert_eq!(grid.cell_of(9.99, 10.0), (0, 1));
        assert_eq!(grid.cell_of(-0.1, -10.0), (-1, -1));
    }

    #[test]
    fn test_query_across_four_adjacent_cells() {
        // Entities straddle the corner shared by four cells.
        let mut grid = SpatialGrid::new(10.0).unwrap();
        let entities = [(0usize, 9.0, 9.0, 2.0), (1, 11.0, 9.0, 2.0), (2, 9.0, 11.0, 2.0), (3, 11.5, 11.5, 1.0)];
        for &(h, x, y, _) in &entities {
            grid.insert(h, x, y);
        }

        let (qx, qy, qr) = (10.0, 10.0, 1.0);
        let max_radius = 2.0;
        let mut out = Vec::new();
        grid.query_radius(qx, qy, qr + max_radius, &mut out);

        for &(h, x, y, r) in &entities {
            if circles_overlap(qx, qy, qr, x, y, r) {
                assert!(out.contains(&h), "missed overlapping entity {h}");
            }
        }
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_query_is_sorted_and_deduplicated() {
        let mut grid = SpatialGrid::new(5.0).unwrap();
        grid.insert(4, 1.0, 1.0);
        grid.insert(2, 6.0, 1.0);
        grid.insert(4, 1.0, 1.0);
        let mut out = Vec::new();
        grid.query_radius(3.0, 1.0, 5.0, &mut out);
        assert_eq!(out, vec![2, 4]);
    }

    #[test]
    fn test_far_cells_not_returned() {
        let mut grid = SpatialGrid::new(10.0).unwrap();
        grid.insert(0, 5.0, 5.0);
        grid.insert(1, 500.0, 500.0);
        let mut out = Vec::new();
        grid.query_radius(5.0, 5.0, 3.0, &mut out);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_huge_query_scans_occupied_cells_only() {
        let mut grid = SpatialGrid::new(10.0).unwrap();
        grid.insert(0, 5.0, 5.0);
        grid.insert(1, -4_000.0, 9_000.0);
        grid.insert(2, 1.0e12, 1.0e12);
        let mut out = Vec::new();

        grid.query_radius(0.0, 0.0, 1.0e300, &mut out);
        assert_eq!(out, vec![0, 1, 2]);

        // Same answer either way the query is evaluated.
        grid.query_radius(0.0, 0.0, 10_000.0, &mut out);
        assert_eq!(out, vec![0, 1]);

        grid.query_radius(0.0, 0.0, f64::INFINITY, &mut out);
        assert_eq!(out, vec![0, 1, 2]);
    }

    #[test]
    fn test_clear_keeps_grid_usable() {
        let mut grid = SpatialGrid::new(10.0).unwrap();
        grid.insert(0, 1.0, 1.0);
        assert_eq!(grid.len(), 1);
        grid.clear();
        assert!(grid.is_empty());
        let mut out = Vec::new();
        grid.query_radius(1.0, 1.0, 1.0, &mut out);
        assert!(out.is_empty());
        grid.insert(3, 1.0, 1.0);
        grid.query_radius(1.0, 1.0, 1.0, &mut out);
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn test_grid_pool_reuses_per_cell_size() {
        let mut pool = GridPool::new();
        pool.acquire(32.0).unwrap().insert(1, 0.0, 0.0);
        pool.acquire(64.0).unwrap();
        assert_eq!(pool.len(), 2);

        let grid = pool.acquire(32.0).unwrap();
        assert!(grid.is_empty(), "acquire must hand back a cleared grid");
        assert_eq!(pool.len(), 2);
        assert!(pool.acquire(0.0).is_err());
    }
}
