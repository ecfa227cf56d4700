use campus_runner_core::{CellCoord, Direction, Edge, GridError, NavigationGraph, Neighbors, Path};
use campus_runner_system_search::{astar, bfs, Algorithm};

/// Small weighted grid: `#` blocks, `.` costs one, digits cost their value.
struct TestGrid {
    columns: u32,
    rows: u32,
    weights: Vec<Option<u32>>,
}

impl TestGrid {
    fn parse(layout: &str) -> Self {
        let lines: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let rows = lines.len() as u32;
        let columns = lines.first().map_or(0, |line| line.len()) as u32;
        let weights = lines
            .iter()
            .flat_map(|line| line.chars())
            .map(|glyph| match glyph {
                '#' => None,
                '.' => Some(1),
                digit => digit.to_digit(10),
            })
            .collect();
        Self {
            columns,
            rows,
            weights,
        }
    }

    fn generated(seed: u64, columns: u32, rows: u32) -> Self {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 33) as u32
        };
        let weights = (0..columns * rows)
            .map(|_| match next() % 8 {
                0 | 1 => None,
                roll => Some(roll % 4 + 1),
            })
            .collect();
        let mut grid = Self {
            columns,
            rows,
            weights,
        };
        grid.weights[0] = Some(1);
        let last = grid.weights.len() - 1;
        grid.weights[last] = Some(1);
        grid
    }

    fn weight(&self, cell: CellCoord) -> Option<u32> {
        if !self.contains(cell) {
            return None;
        }
        let index = (cell.row() * self.columns + cell.column()) as usize;
        self.weights[index]
    }

    fn corners(&self) -> (CellCoord, CellCoord) {
        (
            CellCoord::new(0, 0),
            CellCoord::new(self.columns - 1, self.rows - 1),
        )
    }
}

impl NavigationGraph for TestGrid {
    fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn neighbors(&self, cell: CellCoord) -> Neighbors {
        let mut neighbors = Neighbors::new();
        if self.weight(cell).is_none() {
            return neighbors;
        }
        for direction in Direction::NAVIGATION_ORDER {
            if let Some(to) = cell.step(direction) {
                if let Some(weight) = self.weight(to) {
                    neighbors.push(Edge { to, weight });
                }
            }
        }
        neighbors
    }

    fn min_weight(&self) -> u32 {
        self.weights.iter().flatten().copied().min().unwrap_or(1)
    }
}

/// Fewest edges and lowest cost over every simple path, by brute force.
fn exhaustive_optimum(grid: &TestGrid, start: CellCoord, goal: CellCoord) -> Option<(usize, u64)> {
    fn walk(
        grid: &TestGrid,
        cell: CellCoord,
        goal: CellCoord,
        visited: &mut Vec<CellCoord>,
        cost: u64,
        best: &mut Option<(usize, u64)>,
    ) {
        if cell == goal {
            let edges = visited.len() - 1;
            *best = Some(match *best {
                Some((fewest, cheapest)) => (fewest.min(edges), cheapest.min(cost)),
                None => (edges, cost),
            });
            return;
        }
        for edge in grid.neighbors(cell) {
            if visited.contains(&edge.to) {
                continue;
            }
            visited.push(edge.to);
            walk(grid, edge.to, goal, visited, cost + u64::from(edge.weight), best);
            let _ = visited.pop();
        }
    }

    if grid.weight(start).is_none() {
        return None;
    }
    let mut best = None;
    let mut visited = vec![start];
    walk(grid, start, goal, &mut visited, 0, &mut best);
    best
}

fn assert_valid(grid: &TestGrid, path: &Path, start: CellCoord, goal: CellCoord) {
    assert_eq!(path.start(), Some(start));
    assert_eq!(path.goal(), Some(goal));
    for cell in path.cells() {
        assert!(grid.weight(*cell).is_some(), "path crosses blocked {cell}");
    }
    for pair in path.cells().windows(2) {
        assert!(
            Direction::between(pair[0], pair[1]).is_some(),
            "{} and {} are not adjacent",
            pair[0],
            pair[1]
        );
    }
}

fn cost(grid: &TestGrid, path: &Path) -> u64 {
    path.cost_with(|cell| grid.weight(cell))
        .expect("path only crosses walkable cells")
}

#[test]
fn bfs_reaches_around_a_single_wall() {
    let grid = TestGrid::parse(
        "
        .....
        .....
        ..#..
        .....
        .....
        ",
    );
    let (start, goal) = grid.corners();
    let path = bfs::find_path(&grid, start, goal).expect("in bounds");

    assert_eq!(path.edge_count(), 8);
    assert!(!path.contains(CellCoord::new(2, 2)));
    assert_valid(&grid, &path, start, goal);
}

#[test]
fn a_full_wall_makes_the_goal_unreachable() {
    let grid = TestGrid::parse(
        "
        .#...
        .#...
        .#...
        .#...
        .#...
        ",
    );
    let (start, goal) = grid.corners();

    for algorithm in Algorithm::ALL {
        let report = algorithm.run(&grid, start, goal).expect("in bounds");
        assert!(report.path.is_empty(), "{algorithm} found a path");
    }
}

#[test]
fn start_equal_to_goal_is_a_single_cell_path() {
    let grid = TestGrid::parse("...");
    let cell = CellCoord::new(1, 0);
    assert_eq!(bfs::find_path(&grid, cell, cell), Ok(Path::new(vec![cell])));
    assert_eq!(astar::find_path(&grid, cell, cell), Ok(Path::new(vec![cell])));
}

#[test]
fn out_of_bounds_endpoints_are_errors() {
    let grid = TestGrid::parse(
        "
        ..
        ..
        ",
    );
    let outside = CellCoord::new(0, 2);
    let expected = Err(GridError::OutOfBounds {
        cell: outside,
        columns: 2,
        rows: 2,
    });
    assert_eq!(bfs::find_path(&grid, CellCoord::new(0, 0), outside), expected);
    assert_eq!(astar::find_path(&grid, outside, CellCoord::new(0, 0)), expected);
}

#[test]
fn blocked_endpoints_yield_no_path() {
    let grid = TestGrid::parse(".#.");
    let path = bfs::find_path(&grid, CellCoord::new(0, 0), CellCoord::new(1, 0))
        .expect("in bounds");
    assert!(path.is_empty());
    let path = astar::find_path(&grid, CellCoord::new(1, 0), CellCoord::new(2, 0))
        .expect("in bounds");
    assert!(path.is_empty());
}

#[test]
fn astar_prefers_cheap_detours_over_expensive_shortcuts() {
    let grid = TestGrid::parse(
        "
        .9.
        ...
        ",
    );
    let start = CellCoord::new(0, 0);
    let goal = CellCoord::new(2, 0);

    let shortest = bfs::find_path(&grid, start, goal).expect("in bounds");
    let cheapest = astar::find_path(&grid, start, goal).expect("in bounds");

    assert_eq!(shortest.edge_count(), 2);
    assert_eq!(cost(&grid, &shortest), 10);
    assert_eq!(cheapest.edge_count(), 4);
    assert_eq!(cost(&grid, &cheapest), 4);
}

#[test]
fn astar_matches_bfs_length_on_uniform_grids() {
    for seed in 0..40 {
        let mut grid = TestGrid::generated(seed, 6, 5);
        for weight in grid.weights.iter_mut().flatten() {
            *weight = 1;
        }
        let (start, goal) = grid.corners();

        let shortest = bfs::find_path(&grid, start, goal).expect("in bounds");
        let cheapest = astar::find_path(&grid, start, goal).expect("in bounds");
        assert_eq!(shortest.is_empty(), cheapest.is_empty(), "seed {seed}");
        assert_eq!(shortest.edge_count(), cheapest.edge_count(), "seed {seed}");
    }
}

#[test]
fn searches_are_optimal_against_exhaustive_enumeration() {
    for seed in 0..60 {
        let grid = TestGrid::generated(seed, 4, 4);
        let (start, goal) = grid.corners();
        let optimum = exhaustive_optimum(&grid, start, goal);

        let shortest = bfs::find_path(&grid, start, goal).expect("in bounds");
        let cheapest = astar::find_path(&grid, start, goal).expect("in bounds");

        match optimum {
            None => {
                assert!(shortest.is_empty(), "seed {seed}");
                assert!(cheapest.is_empty(), "seed {seed}");
            }
            Some((fewest_edges, lowest_cost)) => {
                assert_valid(&grid, &shortest, start, goal);
                assert_valid(&grid, &cheapest, start, goal);
                assert_eq!(shortest.edge_count(), fewest_edges, "seed {seed}");
                assert_eq!(cost(&grid, &cheapest), lowest_cost, "seed {seed}");
            }
        }
    }
}

#[test]
fn astar_explores_less_of_an_open_field() {
    let grid = TestGrid::generated(0, 10, 10);
    let mut open = grid;
    for weight in &mut open.weights {
        *weight = Some(1);
    }
    let start = CellCoord::new(0, 5);
    let goal = CellCoord::new(9, 5);

    let breadth = Algorithm::Bfs.run(&open, start, goal).expect("in bounds");
    let guided = Algorithm::AStar.run(&open, start, goal).expect("in bounds");

    assert_eq!(breadth.path.edge_count(), guided.path.edge_count());
    assert!(guided.explored < breadth.explored);
    assert_eq!(guided.explored, 10);
}

#[test]
fn repeated_searches_are_identical() {
    let grid = TestGrid::generated(7, 8, 8);
    let (start, goal) = grid.corners();
    for algorithm in Algorithm::ALL {
        let first = algorithm.run(&grid, start, goal).expect("in bounds");
        let second = algorithm.run(&grid, start, goal).expect("in bounds");
        assert_eq!(first, second);
    }
}

#[test]
fn equal_length_routes_resolve_in_navigation_order() {
    let grid = TestGrid::parse(
        "
        ...
        ...
        ...
        ",
    );
    let expected = Path::new(vec![
        CellCoord::new(0, 0),
        CellCoord::new(0, 1),
        CellCoord::new(1, 1),
    ]);

    for algorithm in Algorithm::ALL {
        let report = algorithm
            .run(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1))
            .expect("in bounds");
        assert_eq!(report.path, expected, "{algorithm}");
    }
    assert_eq!(
        bfs::find_path(&grid, CellCoord::new(1, 1), CellCoord::new(0, 0)),
        Ok(Path::new(vec![
            CellCoord::new(1, 1),
            CellCoord::new(1, 0),
            CellCoord::new(0, 0),
        ]))
    );
}
