//! Fixed-size lat/lon cell grid.
//!
//! Cells are `degrees_per_cell` on a side, numbered column-major from
//! (-90, -180). Longitude wraps around the antimeridian; latitude does not
//! wrap, so the polar rows have no neighbour beyond the pole.

use crate::error::GeoError;
use crate::geo::{Coordinate, Region};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGrid {
    degrees_per_cell: f64,
    cols: u32,
    rows: u32,
}

impl CellGrid {
    /// `degrees_per_cell` must be positive and divide 180 evenly.
    pub fn new(degrees_per_cell: f64) -> Result<Self, GeoError> {
        if !degrees_per_cell.is_finite() || degrees_per_cell <= 0.0 || degrees_per_cell > 180.0 {
            return Err(GeoError::InvalidCellSize(degrees_per_cell));
        }
        let rows = 180.0 / degrees_per_cell;
        if (rows - rows.round()).abs() > 1e-9 {
            return Err(GeoError::InvalidCellSize(degrees_per_cell));
        }
        // Cell ids are column-major u32 indices over cols * rows.
        if 2.0 * rows * rows > u32::MAX as f64 {
            return Err(GeoError::InvalidCellSize(degrees_per_cell));
        }
        let rows = rows.round() as u32;
        Ok(Self {
            degrees_per_cell,
            cols: rows * 2,
            rows,
        })
    }

    pub fn degrees_per_cell(&self) -> f64 {
        self.degrees_per_cell
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn len(&self) -> usize {
        (self.cols * self.rows) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn id(&self, col: u32, row: u32) -> CellId {
        CellId(col * self.rows + row)
    }

    /// (column, row) of a cell.
    pub fn col_row(&self, cell: CellId) -> (u32, u32) {
        (cell.0 / self.rows, cell.0 % self.rows)
    }

    /// Cell containing a coordinate. Latitude is clamped, longitude wraps.
    pub fn cell_of(&self, c: &Coordinate) -> CellId {
        let col = ((c.lon + 180.0) / self.degrees_per_cell).floor() as i64;
        let col = col.rem_euclid(self.cols as i64) as u32;
        let row = ((c.lat + 90.0) / self.degrees_per_cell).floor() as i64;
        let row = row.clamp(0, self.rows as i64 - 1) as u32;
        self.id(col, row)
    }

    /// Every cell touched by a representative of the region.
    pub fn cells_of(&self, region: &Region) -> BTreeSet<CellId> {
        region.representatives().iter().map(|c| self.cell_of(c)).collect()
    }

    /// Left, right, bottom and top neighbours, deduplicated.
    pub fn neighbors(&self, cell: CellId) -> Vec<CellId> {
        let (col, row) = self.col_row(cell);
        let left = (col + self.cols - 1) % self.cols;
        let right = (col + 1) % self.cols;

        let mut out = vec![self.id(left, row)];
        if right != left {
            out.push(self.id(right, row));
        }
        if row > 0 {
            out.push(self.id(col, row - 1));
        }
        if row + 1 < self.rows {
            out.push(self.id(col, row + 1));
        }
        out
    }

    /// Center of a cell.
    pub fn center(&self, cell: CellId) -> Coordinate {
        let (col, row) = self.col_row(cell);
        let half = self.degrees_per_cell / 2.0;
        Coordinate::new(
            -90.0 + row as f64 * self.degrees_per_cell + half,
            -180.0 + col as f64 * self.degrees_per_cell + half,
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = CellId> {
        (0..self.cols * self.rows).map(CellId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sizes() {
        for bad in [0.0, -1.0, 7.0, 200.0, f64::NAN] {
            assert!(CellGrid::new(bad).is_err(), "{} accepted", bad);
        }
        assert!(CellGrid::new(0.5).is_ok());
    }

    #[test]
    fn test_rejects_grids_too_fine_to_index() {
        assert!(CellGrid::new(0.002).is_err());
        let fine = CellGrid::new(0.01).unwrap();
        assert_eq!(fine.len(), 36_000 * 18_000);
        let last = fine.cell_of(&Coordinate::new(89.999, 179.999));
        assert_eq!(fine.col_row(last), (35_999, 17_999));
    }

    #[test]
    fn test_grid_dimensions() {
        let g = CellGrid::new(1.0).unwrap();
        assert_eq!((g.cols(), g.rows()), (360, 180));
        assert_eq!(g.len(), 64_800);
    }

    #[test]
    fn test_cell_of_and_center() {
        let g = CellGrid::new(10.0).unwrap();
        let cell = g.cell_of(&Coordinate::new(48.85, 2.35));
        assert_eq!(g.col_row(cell), (18, 13));
        assert_eq!(g.center(cell), Coordinate::new(45.0, 5.0));
        assert_eq!(g.cell_of(&g.center(cell)), cell);
    }

    #[test]
    fn test_edges_wrap_and_clamp() {
        let g = CellGrid::new(10.0).unwrap();
        assert_eq!(g.cell_of(&Coordinate::new(0.0, 180.0)), g.cell_of(&Coordinate::new(0.0, -180.0)));
        assert_eq!(g.col_row(g.cell_of(&Coordinate::new(90.0, 0.0))).1, 17);
        assert_eq!(g.col_row(g.cell_of(&Coordinate::new(-90.0, 0.0))).1, 0);
    }

    #[test]
    fn test_neighbors_wrap_longitude() {
        let g = CellGrid::new(10.0).unwrap();
        let west = g.cell_of(&Coordinate::new(5.0, -175.0));
        let n: Vec<(u32, u32)> = g.neighbors(west).into_iter().map(|c| g.col_row(c)).collect();
        assert_eq!(n, vec![(35, 9), (1, 9), (0, 8), (0, 10)]);
    }

    #[test]
    fn test_neighbors_stop_at_poles() {
        let g = CellGrid::new(10.0).unwrap();
        let north = g.cell_of(&Coordinate::new(89.0, 0.0));
        let south = g.cell_of(&Coordinate::new(-89.0, 0.0));
        assert_eq!(g.neighbors(north).len(), 3);
        assert_eq!(g.neighbors(south).len(), 3);
        assert!(g.neighbors(north).iter().all(|&c| g.col_row(c).1 <= 17));
    }

    #[test]
    fn test_coarsest_grid_dedups() {
        let g = CellGrid::new(180.0).unwrap();
        assert_eq!((g.cols(), g.rows()), (2, 1));
        let cell = g.cell_of(&Coordinate::new(0.0, 0.0));
        assert_eq!(g.neighbors(cell).len(), 1);
    }

    #[test]
    fn test_cells_of_region() {
        let g = CellGrid::new(10.0).unwrap();
        let region = Region::from_points(vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
            Coordinate::new(15.0, 1.0),
        ])
        .unwrap();
        assert_eq!(g.cells_of(&region).len(), 2);
    }
}
