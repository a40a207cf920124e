use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

pub type Coordinate = u32;

/// A cell of the grid.
///
/// Positions order by `y` first, then `x`, which is the row-major scan
/// order of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: Coordinate,
    pub y: Coordinate,
}

impl Position {
    #[must_use]
    pub const fn new(x: Coordinate, y: Coordinate) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance between two cells, in grid units.
    #[must_use]
    pub fn grid_distance_squared(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx * dx + dy * dy
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A dense `width * height` grid of values, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    width: Coordinate,
    height: Coordinate,
    cells: Vec<T>,
}

impl<T> Matrix<T> {
    /// Build a matrix by computing each cell from its position.
    pub fn from_fn(width: Coordinate, height: Coordinate, mut f: impl FnMut(Position) -> T) -> Self {
        let cells = positions(width, height).map(&mut f).collect();
        Self {
            width,
            height,
            cells,
        }
    }

    /// Build a matrix from row-major cells. Returns `None` when the cell
    /// count does not match the shape.
    pub fn from_cells(width: Coordinate, height: Coordinate, cells: Vec<T>) -> Option<Self> {
        (cells.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            cells,
        })
    }

    #[must_use]
    pub const fn width(&self) -> Coordinate {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> Coordinate {
        self.height
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Every position of the grid, in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        positions(self.width, self.height)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        self.positions().zip(self.cells.iter())
    }

    /// The up to four cells sharing an edge with `position`.
    pub fn neighbors(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        let Position { x, y } = position;
        [
            x.checked_sub(1).map(|x| Position::new(x, y)),
            Some(Position::new(x + 1, y)),
            y.checked_sub(1).map(|y| Position::new(x, y)),
            Some(Position::new(x, y + 1)),
        ]
        .into_iter()
        .flatten()
        .filter(move |p| self.contains(*p))
    }

    fn offset(&self, position: Position) -> usize {
        position.y as usize * self.width as usize + position.x as usize
    }
}

impl<T: Default> Matrix<T> {
    pub fn new(width: Coordinate, height: Coordinate) -> Self {
        Self::from_fn(width, height, |_| T::default())
    }
}

impl<T> Index<Position> for Matrix<T> {
    type Output = T;

    fn index(&self, position: Position) -> &T {
        assert!(
            self.contains(position),
            "position {position} outside {}x{} grid",
            self.width,
            self.height
        );
        &self.cells[self.offset(position)]
    }
}

impl<T> IndexMut<Position> for Matrix<T> {
    fn index_mut(&mut self, position: Position) -> &mut T {
        assert!(
            self.contains(position),
            "position {position} outside {}x{} grid",
            self.width,
            self.height
        );
        let offset = self.offset(position);
        &mut self.cells[offset]
    }
}

fn positions(width: Coordinate, height: Coordinate) -> impl Iterator<Item = Position> {
    (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_row_major() {
        let matrix: Matrix<u8> = Matrix::new(2, 2);
        let positions: Vec<Position> = matrix.positions().collect();
        assert_eq!(
            positions,
            vec![
                Position::new(0, 0),
                Position::new(1, 0),
                Position::new(0, 1),
                Position::new(1, 1),
            ]
        );
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(sorted, positions);
    }

    #[test]
    fn test_index_and_mutation() {
        let mut matrix: Matrix<Vec<u32>> = Matrix::new(3, 2);
        matrix[Position::new(2, 1)].push(7);
        assert_eq!(matrix[Position::new(2, 1)], vec![7]);
        assert!(matrix[Position::new(0, 0)].is_empty());
        assert!(!matrix.contains(Position::new(3, 0)));
    }

    #[test]
    fn test_neighbors_at_corner_and_center() {
        let matrix: Matrix<u8> = Matrix::new(3, 3);
        let corner: Vec<Position> = matrix.neighbors(Position::new(0, 0)).collect();
        assert_eq!(corner, vec![Position::new(1, 0), Position::new(0, 1)]);

        let center: Vec<Position> = matrix.neighbors(Position::new(1, 1)).collect();
        assert_eq!(center.len(), 4);
    }

    #[test]
    fn test_from_cells_checks_shape() {
        assert!(Matrix::from_cells(2, 2, vec![1, 2, 3]).is_none());
        let matrix = Matrix::from_cells(2, 1, vec![1, 2]).unwrap();
        assert_eq!(matrix[Position::new(1, 0)], 2);
    }

    #[test]
    fn test_grid_distance() {
        let a = Position::new(0, 0);
        let b = Position::new(2, 1);
        assert!((a.grid_distance_squared(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_index_out_of_bounds_panics() {
        let matrix: Matrix<u8> = Matrix::new(2, 2);
        let _value: u8 = matrix[Position::new(5, 5)];
    }

    #[test]
    fn test_position_serde_format() {
        let json = serde_json::to_string(&Position::new(3, 1)).unwrap();
        assert_eq!(json, r#"{"x":3,"y":1}"#);
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Position::new(3, 1));
    }
}
