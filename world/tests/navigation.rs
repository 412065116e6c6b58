use creepline_core::GraphCell;
use creepline_world::navigation::{Graph, OBSTACLE_MARKER};
use proptest::prelude::*;

fn assert_consistent(graph: &Graph) -> Result<(), TestCaseError> {
    for y in 0..graph.height() {
        for x in 0..graph.width() {
            let cell = GraphCell::new(x, y);
            let Some(next) = graph.next_cell(cell) else {
                continue;
            };
            prop_assert!(!graph.is_obstacle(next), "{:?} routes into obstacle {:?}", cell, next);
            prop_assert!(!graph.is_obstacle(cell), "obstacle {:?} has a route", cell);
            let here = graph.distance(cell).expect("routed cells are reachable");
            let there = graph.distance(next).expect("next hops are reachable");
            prop_assert_eq!(there + 1, here, "next hop must be one step closer");
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn next_hops_never_enter_obstacles(
        edits in prop::collection::vec((0_u16..12, 0_u16..12, any::<bool>()), 0..60),
        base in (0_u16..12, 0_u16..12),
    ) {
        let mut graph = Graph::new(12, 12);
        let base = GraphCell::new(base.0, base.1);
        let _ = graph.compute_paths(base);

        for (x, y, add) in edits {
            let cell = GraphCell::new(x, y);
            if add {
                let _ = graph.add_obstacle(cell);
            } else {
                let _ = graph.remove_obstacle(cell);
            }
            let _ = graph.compute_paths(base);
            assert_consistent(&graph)?;
        }
    }
}

#[test]
fn enclosed_cell_has_no_route() {
    let mut graph = Graph::new(5, 5);
    let pocket = GraphCell::new(0, 0);
    for wall in [GraphCell::new(1, 0), GraphCell::new(0, 1), GraphCell::new(1, 1)] {
        assert!(graph.add_obstacle(wall));
    }
    let reachable = graph.compute_paths(GraphCell::new(4, 4));

    assert_eq!(graph.next_cell(pocket), None, "enclosed cell must stay put");
    assert_eq!(graph.distance(pocket), None);
    assert_eq!(reachable, 25 - 3 - 1);
}

#[test]
fn obstacle_edits_mark_the_field_dirty() {
    let mut graph = Graph::new(4, 4);
    let _ = graph.compute_paths(GraphCell::new(0, 0));
    assert!(!graph.is_dirty());

    assert!(graph.add_obstacle(GraphCell::new(2, 2)));
    assert!(graph.is_dirty());
    assert!(!graph.add_obstacle(GraphCell::new(2, 2)), "duplicate insert is a no-op");
    assert!(!graph.add_obstacle(GraphCell::new(9, 9)), "outside cells are ignored");

    let _ = graph.compute_paths(GraphCell::new(0, 0));
    assert!(!graph.is_dirty());
    assert!(graph.remove_obstacle(GraphCell::new(2, 2)));
    assert!(graph.is_dirty());
}

#[test]
fn grid_layout_indexes_rows_by_width() {
    let mut graph = Graph::new(4, 3);
    assert!(graph.add_obstacle(GraphCell::new(3, 1)));
    assert!(graph.add_obstacle(GraphCell::new(0, 2)));

    let layout = graph.grid_layout();
    assert_eq!(layout.len(), 12);
    assert_eq!(layout[4 + 3], OBSTACLE_MARKER, "(3, 1) lives at y * width + x");
    assert_eq!(layout[2 * 4], OBSTACLE_MARKER, "(0, 2) lives at y * width + x");
    assert_eq!(layout.iter().filter(|byte| **byte == OBSTACLE_MARKER).count(), 2);
    assert_eq!(layout[1 + 1], 0, "the y * width + y slot stays clear");
}

#[test]
fn escape_picks_the_closest_free_neighbour() {
    let mut graph = Graph::new(5, 1);
    assert!(graph.add_obstacle(GraphCell::new(2, 0)));
    let _ = graph.compute_paths(GraphCell::new(4, 0));

    assert_eq!(graph.next_cell(GraphCell::new(2, 0)), None);
    assert_eq!(graph.escape_cell(GraphCell::new(2, 0)), Some(GraphCell::new(3, 0)));
}

#[test]
fn display_draws_the_flow_field() {
    let mut graph = Graph::new(3, 1);
    assert!(graph.add_obstacle(GraphCell::new(0, 0)));
    let _ = graph.compute_paths(GraphCell::new(2, 0));
    assert_eq!(graph.to_string(), "#→@\n");
}
