//! Square per-tile layers.

use std::ops::{Index, IndexMut};

use serde::ser::{Serialize, Serializer};
use tileworld_common::TilePos;

/// A `size × size` layer stored row-major.
///
/// Serializes as a nested array indexed `[row][col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    size: u32,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid by evaluating `f` for every tile in row-major order.
    pub fn from_fn(size: u32, mut f: impl FnMut(TilePos) -> T) -> Self {
        let count = (size as usize) * (size as usize);
        let cells = (0..count).map(|i| f(TilePos::from_index(i, size))).collect();
        Self { size, cells }
    }

    /// Tiles per side.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Gets a tile by row and column.
    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<&T> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(TilePos::new(col, row).to_index(self.size))
    }

    /// Iterates over rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks_exact(self.size.max(1) as usize)
    }

    /// Iterates over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Iterates over tiles with their positions.
    pub fn iter_with_pos(&self) -> impl Iterator<Item = (TilePos, &T)> {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, value)| (TilePos::from_index(i, size), value))
    }

    /// Row-major backing storage.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Maps every tile into a new grid of the same size.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            size: self.size,
            cells: self.cells.iter().map(&mut f).collect(),
        }
    }
}

impl<T: Clone> Grid<T> {
    /// Creates a grid with every tile set to `value`.
    #[must_use]
    pub fn filled(size: u32, value: T) -> Self {
        Self {
            size,
            cells: vec![value; (size as usize) * (size as usize)],
        }
    }
}

impl<T> Index<TilePos> for Grid<T> {
    type Output = T;

    fn index(&self, pos: TilePos) -> &T {
        &self.cells[pos.to_index(self.size)]
    }
}

impl<T> IndexMut<TilePos> for Grid<T> {
    fn index_mut(&mut self, pos: TilePos) -> &mut T {
        let idx = pos.to_index(self.size);
        &mut self.cells[idx]
    }
}

impl<T: Serialize> Serialize for Grid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_row_major() {
        let grid = Grid::from_fn(3, |pos| pos.y * 10 + pos.x);
        assert_eq!(grid.get(0, 2), Some(&2));
        assert_eq!(grid.get(2, 0), Some(&20));
        assert_eq!(grid[TilePos::new(1, 2)], 21);
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn test_grid_serializes_nested() {
        let grid = Grid::from_fn(2, |pos| pos.y * 2 + pos.x);
        let json = serde_json::to_string(&grid).expect("serialize grid");
        assert_eq!(json, "[[0,1],[2,3]]");
    }

    #[test]
    fn test_grid_map_and_set() {
        let mut grid = Grid::filled(4, false);
        grid[TilePos::new(3, 1)] = true;
        let counts = grid.map(|&b| u8::from(b));
        assert_eq!(counts.iter().map(|&c| u32::from(c)).sum::<u32>(), 1);
        assert_eq!(grid.rows().count(), 4);
    }
}
