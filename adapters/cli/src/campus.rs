//! ASCII campus layouts and their rendering.

use std::collections::BTreeMap;

use campus_runner_core::{ActorKind, CellCoord, Command, NpcKind, Path, TileKind};
use campus_runner_world::{query, World};

/// Built-in 20x18 campus. Letters mark landmarks, `S` marks the main gate.
const DEFAULT_LAYOUT: &str = r#"
####################
#O....###...###....#
#.###.#.#.#.#.#.##.#
#.#A#.B...#M....#..#
#.#.###.#####.###.##
#......D#...#.E....#
###.#####.#.#####.##
#...G....H#~~~..F..#
#.#####.#####.####.#
#.....#.w.#...#I...#
###.#.###.#.###.####
#...#^.J..#.....#..#
#.#######.#######.##
#...L....+.K..""...#
#.###.#######.####.#
#.S...#.....#N..P.O#
#####.#.###.#.######
####################
"#;

const DEFAULT_LANDMARKS: [(char, &str); 14] = [
    ('A', "Admin Block"),
    ('B', "DTL Innovation Hub"),
    ('D', "BT Quadrangle"),
    ('E', "AI-ML & MCA Dept"),
    ('F', "BT & EIE Dept"),
    ('G', "IEM Dept"),
    ('H', "EEE Dept"),
    ('I', "CSE Dept"),
    ('J', "ECE Dept"),
    ('K', "Library"),
    ('L', "Food Court"),
    ('M', "Mechanical Dept"),
    ('N', "Incubation Center"),
    ('P', "Boys Hostel"),
];

const START_GLYPH: char = 'S';
const PORTAL_GLYPH: char = 'O';
const CONSTRUCTION_GLYPH: char = 'C';

/// Errors raised while reading a campus layout or resolving a cell reference.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum CampusError {
    /// The layout contained no rows.
    #[error("campus layout is empty")]
    Empty,
    /// A row was shorter or longer than the first one.
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: u32,
        /// Width of the first row.
        expected: u32,
        /// Width of the offending row.
        found: u32,
    },
    /// A character with no tile meaning was found.
    #[error("unknown glyph '{glyph}' at {cell}")]
    UnknownGlyph {
        /// Character that could not be interpreted.
        glyph: char,
        /// Cell holding the character.
        cell: CellCoord,
    },
    /// The same landmark letter appeared twice.
    #[error("landmark '{0}' appears more than once")]
    DuplicateLandmark(char),
    /// More than one start cell was marked.
    #[error("layout marks more than one start cell")]
    DuplicateStart,
    /// Portals come in pairs; the last one was left without a partner.
    #[error("portal at {0} has no partner")]
    UnpairedPortal(CellCoord),
    /// A cell reference named a landmark the layout does not contain.
    #[error("no landmark named '{0}'")]
    UnknownLandmark(String),
    /// A cell reference was neither a landmark nor a `column,row` pair.
    #[error("'{0}' is neither a landmark letter nor a column,row pair")]
    InvalidCell(String),
}

/// Campus layout owned by the adapter: tiles, portal pairs, landmarks, and the start cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CampusModel {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
    portals: Vec<(CellCoord, CellCoord)>,
    landmarks: BTreeMap<char, CellCoord>,
    names: BTreeMap<char, &'static str>,
    start: Option<CellCoord>,
}

impl CampusModel {
    /// The built-in campus with named landmarks.
    pub(crate) fn builtin() -> Result<Self, CampusError> {
        let mut campus = Self::parse(DEFAULT_LAYOUT)?;
        campus.names = DEFAULT_LANDMARKS.into_iter().collect();
        Ok(campus)
    }

    /// Parses an ASCII layout. Blank lines and surrounding whitespace are ignored.
    pub(crate) fn parse(layout: &str) -> Result<Self, CampusError> {
        let lines: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let first = lines.first().ok_or(CampusError::Empty)?;
        let columns = width(first);
        let rows = to_u32(lines.len());

        let mut tiles = Vec::with_capacity(lines.len() * first.len());
        let mut portal_cells = Vec::new();
        let mut landmarks = BTreeMap::new();
        let mut start = None;

        for (row, line) in (0_u32..).zip(&lines) {
            let found = width(line);
            if found != columns {
                return Err(CampusError::RaggedRow {
                    row,
                    expected: columns,
                    found,
                });
            }
            for (column, glyph) in (0_u32..).zip(line.chars()) {
                let cell = CellCoord::new(column, row);
                let kind = match glyph {
                    START_GLYPH => {
                        if start.replace(cell).is_some() {
                            return Err(CampusError::DuplicateStart);
                        }
                        TileKind::Normal
                    }
                    PORTAL_GLYPH => {
                        portal_cells.push(cell);
                        TileKind::Portal
                    }
                    letter if letter.is_ascii_uppercase() && letter != CONSTRUCTION_GLYPH => {
                        if landmarks.insert(letter, cell).is_some() {
                            return Err(CampusError::DuplicateLandmark(letter));
                        }
                        TileKind::Normal
                    }
                    other => tile_for(other).ok_or(CampusError::UnknownGlyph {
                        glyph: other,
                        cell,
                    })?,
                };
                tiles.push(kind);
            }
        }

        let mut portals = Vec::with_capacity(portal_cells.len() / 2);
        for pair in portal_cells.chunks(2) {
            match pair {
                [entrance, exit] => portals.push((*entrance, *exit)),
                [lonely] => return Err(CampusError::UnpairedPortal(*lonely)),
                _ => {}
            }
        }

        Ok(Self {
            columns,
            rows,
            tiles,
            portals,
            landmarks,
            names: BTreeMap::new(),
            start,
        })
    }

    /// Grid dimensions as `(columns, rows)`.
    pub(crate) const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Cell the player starts on, if the layout marks one.
    pub(crate) const fn start(&self) -> Option<CellCoord> {
        self.start
    }

    /// Landmark cells in letter order.
    pub(crate) fn landmarks(&self) -> impl Iterator<Item = (char, CellCoord)> + '_ {
        self.landmarks.iter().map(|(letter, cell)| (*letter, *cell))
    }

    /// Display name of a landmark, falling back to its letter.
    pub(crate) fn name(&self, letter: char) -> String {
        self.names
            .get(&letter)
            .map_or_else(|| letter.to_string(), |name| (*name).to_owned())
    }

    /// Resolves `S`, a landmark letter, or a `column,row` pair into a cell.
    pub(crate) fn resolve(&self, reference: &str) -> Result<CellCoord, CampusError> {
        let trimmed = reference.trim();
        if let Some((column, row)) = trimmed.split_once(',') {
            let column = column.trim().parse::<u32>();
            let row = row.trim().parse::<u32>();
            return match (column, row) {
                (Ok(column), Ok(row)) => Ok(CellCoord::new(column, row)),
                _ => Err(CampusError::InvalidCell(trimmed.to_owned())),
            };
        }

        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.eq_ignore_ascii_case(&START_GLYPH) => self
                .start
                .ok_or_else(|| CampusError::UnknownLandmark(trimmed.to_owned())),
            (Some(letter), None) if letter.is_ascii_alphabetic() => self
                .landmarks
                .get(&letter.to_ascii_uppercase())
                .copied()
                .ok_or_else(|| CampusError::UnknownLandmark(trimmed.to_owned())),
            _ => Err(CampusError::InvalidCell(trimmed.to_owned())),
        }
    }

    /// Commands that lay the campus out in a freshly configured world.
    pub(crate) fn commands(&self) -> Vec<Command> {
        let mut commands = vec![Command::ConfigureGrid {
            columns: self.columns,
            rows: self.rows,
        }];
        let columns = self.columns.max(1);
        for (offset, kind) in (0_u32..).zip(&self.tiles) {
            if matches!(kind, TileKind::Normal | TileKind::Portal) {
                continue;
            }
            commands.push(Command::SetTile {
                cell: CellCoord::new(offset % columns, offset / columns),
                kind: *kind,
            });
        }
        commands.extend(
            self.portals
                .iter()
                .map(|(entrance, exit)| Command::LinkPortals {
                    entrance: *entrance,
                    exit: *exit,
                }),
        );
        commands
    }
}

/// Draws the world as ASCII, overlaying an optional path and every actor.
pub(crate) fn render(world: &World, path: Option<&Path>) -> String {
    let grid = query::grid(world);
    let columns = grid.columns();
    let mut glyphs: Vec<char> = grid.cells().map(|(_, kind)| glyph_for(kind)).collect();
    let mut paint = |cell: CellCoord, glyph: char| {
        if grid.contains(cell) {
            let index = (cell.row() * columns + cell.column()) as usize;
            if let Some(slot) = glyphs.get_mut(index) {
                *slot = glyph;
            }
        }
    };

    if let Some(path) = path {
        for cell in path.cells() {
            paint(*cell, '*');
        }
    }
    for actor in query::actor_view(world).iter() {
        paint(actor.cell, actor_glyph(actor.kind));
    }

    let mut out = String::with_capacity(glyphs.len() + grid.rows() as usize);
    for row in glyphs.chunks(columns.max(1) as usize) {
        out.extend(row);
        out.push('\n');
    }
    out
}

fn tile_for(glyph: char) -> Option<TileKind> {
    let kind = match glyph {
        '.' => TileKind::Normal,
        '#' => TileKind::Wall,
        '~' => TileKind::Ice,
        '"' => TileKind::Grass,
        'w' => TileKind::Water,
        '^' => TileKind::Trap,
        '+' => TileKind::Booster,
        'k' => TileKind::Key,
        '=' => TileKind::LockedGate,
        CONSTRUCTION_GLYPH => TileKind::Construction,
        _ => return None,
    };
    Some(kind)
}

fn glyph_for(kind: TileKind) -> char {
    match kind {
        TileKind::Normal => '.',
        TileKind::Wall => '#',
        TileKind::Ice => '~',
        TileKind::Grass => '"',
        TileKind::Water => 'w',
        TileKind::Portal => PORTAL_GLYPH,
        TileKind::Trap => '^',
        TileKind::Booster => '+',
        TileKind::Key => 'k',
        TileKind::LockedGate => '=',
        TileKind::Construction => CONSTRUCTION_GLYPH,
    }
}

fn actor_glyph(kind: ActorKind) -> char {
    match kind {
        ActorKind::Player => '@',
        ActorKind::Npc(NpcKind::Student) => 's',
        ActorKind::Npc(NpcKind::Guard) => 'g',
        ActorKind::Npc(NpcKind::Professor) => 'p',
        ActorKind::Npc(NpcKind::LabAssistant) => 'l',
    }
}

fn width(line: &str) -> u32 {
    to_u32(line.chars().count())
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
