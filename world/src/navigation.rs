//! Flow-field pathing over the sub-tile cell grid.

use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

use creepline_core::GraphCell;
use glam::Vec3;

/// Byte written by [`Graph::grid_layout`] for obstructed cells.
pub const OBSTACLE_MARKER: u8 = 255;

const UNREACHED: u16 = u16::MAX;

/// Offsets visited during expansion: N, S, E, W, NE, NW, SE, SW.
const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (0, 1),
    (1, 0),
    (-1, 0),
    (1, -1),
    (-1, -1),
    (1, 1),
    (-1, 1),
];

/// Dense grid of cells, its obstacle set and the flow field towards one destination.
///
/// The flow field stores, for every cell that can reach the destination, the
/// neighbour one hop closer to it. Obstacle mutations mark the field dirty and
/// [`Graph::compute_paths`] must run before the next movement read; the field
/// is always rebuilt in full.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    width: u16,
    height: u16,
    destination: Option<GraphCell>,
    obstacles: BTreeSet<GraphCell>,
    next_hops: Vec<Option<GraphCell>>,
    distances: Vec<u16>,
    dirty: bool,
}

impl Graph {
    /// Creates an obstacle-free grid with no destination.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let cell_count = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            destination: None,
            obstacles: BTreeSet::new(),
            next_hops: vec![None; cell_count],
            distances: vec![UNREACHED; cell_count],
            dirty: true,
        }
    }

    /// Width of the grid in cells.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Height of the grid in cells.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: GraphCell) -> bool {
        cell.x() < self.width && cell.y() < self.height
    }

    /// Marks a cell as obstructed. Returns `false` when it already was.
    pub fn add_obstacle(&mut self, cell: GraphCell) -> bool {
        let inserted = self.contains(cell) && self.obstacles.insert(cell);
        self.dirty |= inserted;
        inserted
    }

    /// Clears an obstruction. Returns `false` when the cell was free.
    pub fn remove_obstacle(&mut self, cell: GraphCell) -> bool {
        let removed = self.obstacles.remove(&cell);
        self.dirty |= removed;
        removed
    }

    /// Reports whether the cell is obstructed.
    #[must_use]
    pub fn is_obstacle(&self, cell: GraphCell) -> bool {
        self.obstacles.contains(&cell)
    }

    /// Obstructed cells in ascending coordinate order.
    pub fn obstacles(&self) -> impl Iterator<Item = GraphCell> + '_ {
        self.obstacles.iter().copied()
    }

    /// Reports whether the obstacle set changed since the last recompute.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Destination of the current flow field.
    #[must_use]
    pub const fn destination(&self) -> Option<GraphCell> {
        self.destination
    }

    /// Rebuilds the flow field with a breadth-first expansion from `destination`.
    ///
    /// Returns the number of cells that can reach the destination, including
    /// the destination itself. An obstructed or out-of-bounds destination
    /// leaves every cell unreachable.
    pub fn compute_paths(&mut self, destination: GraphCell) -> usize {
        self.destination = Some(destination);
        self.dirty = false;
        self.next_hops.fill(None);
        self.distances.fill(UNREACHED);

        let Some(origin) = self.index(destination) else {
            return 0;
        };
        if self.is_obstacle(destination) {
            return 0;
        }

        self.distances[origin] = 0;
        let mut reached = 1;
        let mut queue = VecDeque::from([destination]);

        while let Some(current) = queue.pop_front() {
            let Some(current_index) = self.index(current) else {
                continue;
            };
            let next_distance = self.distances[current_index].saturating_add(1);
            let neighbours: Vec<GraphCell> = self.neighbours(current).collect();

            for neighbour in neighbours {
                let Some(index) = self.index(neighbour) else {
                    continue;
                };
                if self.distances[index] != UNREACHED {
                    continue;
                }
                self.distances[index] = next_distance;
                self.next_hops[index] = Some(current);
                reached += 1;
                queue.push_back(neighbour);
            }
        }

        reached
    }

    /// Neighbour one hop closer to the destination.
    ///
    /// `None` means the cell is the destination itself, cannot reach it, or
    /// lies outside the grid. Callers treat it as "stay" or "despawn".
    #[must_use]
    pub fn next_cell(&self, cell: GraphCell) -> Option<GraphCell> {
        self.index(cell).and_then(|index| self.next_hops[index])
    }

    /// Hop distance from the cell to the destination, if it is reachable.
    #[must_use]
    pub fn distance(&self, cell: GraphCell) -> Option<u16> {
        self.index(cell)
            .map(|index| self.distances[index])
            .filter(|distance| *distance != UNREACHED)
    }

    /// Free neighbour with the lowest distance, for agents standing on an obstacle.
    #[must_use]
    pub fn escape_cell(&self, cell: GraphCell) -> Option<GraphCell> {
        self.neighbours(cell)
            .filter_map(|neighbour| self.distance(neighbour).map(|distance| (distance, neighbour)))
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, neighbour)| neighbour)
    }

    /// Row-major byte map with [`OBSTACLE_MARKER`] on every obstructed cell.
    #[must_use]
    pub fn grid_layout(&self) -> Vec<u8> {
        let mut grid = vec![0; self.next_hops.len()];
        for obstacle in &self.obstacles {
            if let Some(index) = self.index(*obstacle) {
                grid[index] = OBSTACLE_MARKER;
            }
        }
        grid
    }

    /// Cells covered by the ground projection of an axis-aligned box.
    ///
    /// The box is clipped to the grid; cells are returned in row-major order.
    #[must_use]
    pub fn cells_in_box(&self, min: Vec3, max: Vec3) -> Vec<GraphCell> {
        if self.width == 0 || self.height == 0 || min.x > max.x || min.z > max.z {
            return Vec::new();
        }
        let low = GraphCell::from_world(min);
        let high = GraphCell::from_world(max);
        let x_end = high.x().min(self.width - 1);
        let y_end = high.y().min(self.height - 1);

        let mut cells = Vec::new();
        for y in low.y()..=y_end {
            for x in low.x()..=x_end {
                cells.push(GraphCell::new(x, y));
            }
        }
        cells
    }

    fn neighbours(&self, cell: GraphCell) -> impl Iterator<Item = GraphCell> + '_ {
        NEIGHBOUR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let candidate = self.offset(cell, dx, dy)?;
            if self.is_obstacle(candidate) {
                return None;
            }
            if dx != 0 && dy != 0 {
                // Diagonal steps may not clip the corner of an obstacle.
                let horizontal = self.offset(cell, dx, 0)?;
                let vertical = self.offset(cell, 0, dy)?;
                if self.is_obstacle(horizontal) || self.is_obstacle(vertical) {
                    return None;
                }
            }
            Some(candidate)
        })
    }

    fn offset(&self, cell: GraphCell, dx: i32, dy: i32) -> Option<GraphCell> {
        let x = u16::try_from(i32::from(cell.x()) + dx).ok()?;
        let y = u16::try_from(i32::from(cell.y()) + dy).ok()?;
        let candidate = GraphCell::new(x, y);
        self.contains(candidate).then_some(candidate)
    }

    fn index(&self, cell: GraphCell) -> Option<usize> {
        self.contains(cell)
            .then(|| usize::from(cell.y()) * usize::from(self.width) + usize::from(cell.x()))
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = GraphCell::new(x, y);
                let glyph = if self.is_obstacle(cell) {
                    '#'
                } else if self.destination == Some(cell) {
                    '@'
                } else {
                    match self.next_cell(cell) {
                        None => '.',
                        Some(next) => arrow(cell, next),
                    }
                };
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn arrow(from: GraphCell, to: GraphCell) -> char {
    let dx = i32::from(to.x()) - i32::from(from.x());
    let dy = i32::from(to.y()) - i32::from(from.y());
    match (dx, dy) {
        (0, -1) => '↑',
        (0, 1) => '↓',
        (1, 0) => '→',
        (-1, 0) => '←',
        (1, -1) => '↗',
        (-1, -1) => '↖',
        (1, 1) => '↘',
        _ => '↙',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_has_no_next_hop() {
        let mut graph = Graph::new(5, 5);
        let base = GraphCell::new(2, 2);
        assert_eq!(graph.compute_paths(base), 25);
        assert_eq!(graph.next_cell(base), None);
        assert_eq!(graph.distance(base), Some(0));
    }

    #[test]
    fn cardinal_neighbours_win_ties_over_diagonals() {
        let mut graph = Graph::new(3, 3);
        let _ = graph.compute_paths(GraphCell::new(1, 1));
        assert_eq!(graph.next_cell(GraphCell::new(1, 0)), Some(GraphCell::new(1, 1)));
        assert_eq!(graph.next_cell(GraphCell::new(0, 0)), Some(GraphCell::new(1, 1)));
        assert_eq!(graph.distance(GraphCell::new(2, 2)), Some(1));
    }

    #[test]
    fn diagonal_steps_do_not_cut_obstacle_corners() {
        let mut graph = Graph::new(3, 3);
        assert!(graph.add_obstacle(GraphCell::new(1, 0)));
        let _ = graph.compute_paths(GraphCell::new(1, 1));
        assert_eq!(
            graph.next_cell(GraphCell::new(0, 0)),
            Some(GraphCell::new(0, 1)),
            "the corner next to the obstacle must route around it"
        );
    }

    #[test]
    fn box_rasterization_clips_to_the_grid() {
        let graph = Graph::new(6, 6);
        let cells = graph.cells_in_box(Vec3::new(1.5, 0.0, -1.0), Vec3::new(9.0, 1.0, 0.2));
        assert_eq!(cells.first(), Some(&GraphCell::new(4, 0)));
        assert_eq!(cells.last(), Some(&GraphCell::new(5, 0)));
        assert_eq!(cells.len(), 2);
    }
}
