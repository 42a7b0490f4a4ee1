//! Starting positions.
//!
//! A map is a JSON object with the board dimensions and the initial contents
//! of every cell, row by row:
//!
//! ```text
//! {"name":"duel","cols":2,"rows":1,"cells":[
//!     {"tile":{"type":"city","owner":"red","stacks":2,"power":2}},
//!     {"tile":{"type":"grass"},"temperature":-3}
//! ]}
//! ```
//!
//! Owners on a map are abstract color slots; the automaton decides which
//! player plays which slot when the map is loaded.

use std::path::Path;

use serde::{Deserialize, Serialize};
use umbra_board::bible::Bible;
use umbra_board::cell::Cell;
use umbra_board::player::Player;
use umbra_board::position::{Position, MAX_COLS, MAX_ROWS};
use umbra_board::token::{TileToken, TileType};

use crate::LoadError;

/// Initial board contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    pub name: String,
    pub cols: i16,
    pub rows: i16,
    /// Row-major, `rows * cols` entries.
    pub cells: Vec<Cell>,
}

impl Map {
    /// A map where every cell holds an unowned tile of `kind`.
    pub fn filled(name: &str, cols: i16, rows: i16, kind: TileType) -> Self {
        let n = rows.max(0) as usize * cols.max(0) as usize;
        let cell = Cell {
            tile: TileToken::new(kind, None, 0, 0),
            ..Cell::default()
        };
        Self {
            name: name.to_owned(),
            cols,
            rows,
            cells: vec![cell; n],
        }
    }

    /// Parse and validate a map.
    pub fn from_json(json: &str) -> Result<Map, LoadError> {
        let map: Map = serde_json::from_str(json).map_err(|source| LoadError::Json {
            path: "<inline>".into(),
            source,
        })?;
        map.validate()?;
        Ok(map)
    }

    /// Read, parse and validate a map file.
    pub fn load(path: &Path) -> Result<Map, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map: Map = serde_json::from_str(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        map.validate()?;
        Ok(map)
    }

    /// Dimensions within the board maxima and one cell per position.
    pub fn validate(&self) -> Result<(), LoadError> {
        if !(1..=MAX_COLS).contains(&self.cols) || !(1..=MAX_ROWS).contains(&self.rows) {
            return Err(self.invalid(format!(
                "size {}x{} outside 1x1..={MAX_COLS}x{MAX_ROWS}",
                self.cols, self.rows
            )));
        }
        let expected = self.rows as usize * self.cols as usize;
        if self.cells.len() != expected {
            return Err(self.invalid(format!(
                "{} cells for a {}x{} map (expected {expected})",
                self.cells.len(),
                self.cols,
                self.rows
            )));
        }
        Ok(())
    }

    /// Every tile and unit type on the map is defined by `bible`.
    pub fn check(&self, bible: &Bible) -> Result<(), LoadError> {
        self.validate()?;
        for (pos, cell) in self.iter() {
            let tile = &cell.tile;
            if !tile.is_none() && bible.tile(&tile.kind).is_none() {
                return Err(self.invalid(format!("unknown tile type '{}' at {pos}", tile.kind)));
            }
            for (_, unit) in cell.units() {
                if bible.unit(&unit.kind).is_none() {
                    return Err(self.invalid(format!("unknown unit type '{}' at {pos}", unit.kind)));
                }
            }
        }
        Ok(())
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index_of(pos).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.index_of(pos).map(|i| &mut self.cells[i])
    }

    /// Every (position, cell) pair in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> {
        let cols = self.cols.max(1);
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let pos = Position::new((i / cols as usize) as i16, (i % cols as usize) as i16);
            (pos, cell)
        })
    }

    /// The colors that own a tile or unit on the map, in index order.
    pub fn colors(&self) -> Vec<Player> {
        Player::COLORS
            .into_iter()
            .filter(|color| {
                self.cells.iter().any(|cell| {
                    cell.tile.owner == Some(*color)
                        || cell.units().any(|(_, u)| u.owner == Some(*color))
                })
            })
            .collect()
    }

    fn index_of(&self, pos: Position) -> Option<usize> {
        let on_map = (0..self.rows).contains(&pos.row) && (0..self.cols).contains(&pos.col);
        on_map.then(|| pos.row as usize * self.cols as usize + pos.col as usize)
    }

    fn invalid(&self, details: String) -> LoadError {
        LoadError::InvalidMap {
            name: self.name.clone(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_board::token::{UnitToken, UnitType};

    #[test]
    fn parses_documented_shape() {
        let map = Map::from_json(
            r#"{"name":"duel","cols":2,"rows":1,"cells":[
                {"tile":{"type":"city","owner":"red","stacks":2,"power":2}},
                {"tile":{"type":"grass"},"temperature":-3}
            ]}"#,
        )
        .unwrap();
        assert_eq!(map.cell(Position::new(0, 1)).unwrap().hazards.temperature, -3);
        assert_eq!(map.colors(), vec![Player::Red]);
        map.check(&Bible::standard()).unwrap();
    }

    #[test]
    fn wrong_cell_count_is_rejected() {
        let err = Map::from_json(r#"{"name":"bad","cols":2,"rows":2,"cells":[{}]}"#).unwrap_err();
        assert!(matches!(err, LoadError::InvalidMap { .. }));
    }

    #[test]
    fn oversized_map_is_rejected() {
        let map = Map::filled("huge", MAX_COLS + 1, 1, TileType::new("grass"));
        assert!(matches!(map.validate(), Err(LoadError::InvalidMap { .. })));
    }

    #[test]
    fn unknown_unit_type_is_rejected() {
        let mut map = Map::filled("m", 2, 2, TileType::new("grass"));
        map.cell_mut(Position::new(1, 1)).unwrap().ground =
            UnitToken::new(UnitType::new("dragon"), Some(Player::Red), 1);
        let err = map.check(&Bible::standard()).unwrap_err();
        assert!(err.to_string().contains("dragon"));
    }

    #[test]
    fn iter_is_row_major() {
        let map = Map::filled("m", 3, 2, TileType::new("grass"));
        let positions: Vec<Position> = map.iter().map(|(p, _)| p).collect();
        assert_eq!(positions[1], Position::new(0, 1));
        assert_eq!(positions[3], Position::new(1, 0));
        assert!(map.cell(Position::new(2, 0)).is_none());
    }
}
