//! # MNK Game Module
//!
//! MNK is the family of games played on an M-by-N board whose players take
//! turns placing marks, trying to align K of their own. The default variant
//! is Tic-Tac-Toe. Boards are hashed in base three (cell digits: 0 empty,
//! 1 first player, 2 second player), the number of placed marks indexes the
//! tier, and the board symmetry group folds positions onto the smallest
//! hash in their orbit.

use anyhow::Result;

use crate::game::GameData;
use crate::game::Information;
use crate::game::Move;
use crate::game::Position;
use crate::game::Tier;
use crate::game::TierGame;
use crate::game::TierPosition;
use crate::game::TierType;
use crate::game::Value;
use crate::game::Variable;
use crate::game::Variant;
use crate::game::mnk::variants::*;

/* SUBMODULES */

mod variants;

/* GAME DATA */

const NAME: &str = "mnk";
const AUTHORS: &str = "Max Fierro <maxfierro@berkeley.edu>";
const ABOUT: &str = "Two players take turns claiming empty cells of an M by \
N board. The first player to claim K contiguous cells along a row, column, \
or diagonal wins immediately. If the board fills up without either player \
doing so, the game is a tie. The 3-3-3 variant is the familiar game of \
Tic-Tac-Toe.";

/* GAME IMPLEMENTATION */

pub struct Session {
    rows: usize,
    cols: usize,
    cells: usize,
    pow3: Vec<u64>,
    lines: Vec<Vec<usize>>,
    transforms: Vec<Vec<usize>>,
}

impl Session {
    pub fn new(variant: Option<Variant>) -> Result<Self> {
        if let Some(v) = variant {
            Self::variant(v)
        } else {
            Ok(Self::default())
        }
    }

    pub(crate) fn build(rows: usize, cols: usize, k: usize) -> Self {
        let cells = rows * cols;
        let mut pow3 = vec![1u64; cells + 1];
        for i in 1..=cells {
            pow3[i] = pow3[i - 1] * 3;
        }

        Self {
            rows,
            cols,
            cells,
            pow3,
            lines: line_windows(rows, cols, k),
            transforms: symmetry_maps(rows, cols),
        }
    }

    /* UTILITY */

    fn decode(&self, hash: Position) -> Vec<u8> {
        let mut board = vec![0u8; self.cells];
        let mut hash = hash;
        for digit in board.iter_mut() {
            *digit = (hash % 3) as u8;
            hash /= 3;
        }

        board
    }

    fn encode(&self, board: &[u8]) -> Position {
        board
            .iter()
            .enumerate()
            .map(|(cell, &digit)| digit as u64 * self.pow3[cell])
            .sum()
    }

    /// Hash of `board` seen through `map`, without materializing the image.
    fn transformed(&self, board: &[u8], map: &[usize]) -> Position {
        map.iter()
            .enumerate()
            .map(|(dest, &src)| board[src] as u64 * self.pow3[dest])
            .sum()
    }

    fn fold(&self, board: &[u8]) -> Position {
        self.transforms
            .iter()
            .map(|map| self.transformed(board, map))
            .min()
            .expect("The symmetry group always contains the identity.")
    }

    fn has_line(&self, board: &[u8], digit: u8) -> bool {
        self.lines
            .iter()
            .any(|line| line.iter().all(|&cell| board[cell] == digit))
    }

    /// Mark placed by the move that produced a board with `tier` pieces.
    fn last_mover(tier: Tier) -> u8 {
        if tier % 2 == 1 { 1 } else { 2 }
    }
}

/* IMPLEMENTATIONS */

impl Default for Session {
    fn default() -> Self {
        parse_variant(VARIANT_DEFAULT.to_owned())
            .expect("Failed to parse default variant.")
    }
}

impl Information for Session {
    fn info() -> GameData {
        GameData {
            name: NAME,
            authors: AUTHORS,
            about: ABOUT,

            variant_protocol: VARIANT_PROTOCOL,
            variant_pattern: VARIANT_PATTERN,
            variant_default: VARIANT_DEFAULT,
        }
    }
}

impl Variable for Session {
    fn variant(variant: Variant) -> Result<Self> {
        parse_variant(variant)
    }
}

impl TierGame for Session {
    fn initial_tier(&self) -> Tier {
        0
    }

    fn initial_position(&self) -> TierPosition {
        TierPosition {
            tier: 0,
            position: 0,
        }
    }

    fn tier_size(&self, _tier: Tier) -> u64 {
        self.pow3[self.cells]
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        if (tier as usize) < self.cells {
            vec![tier + 1]
        } else {
            Vec::new()
        }
    }

    fn generate_moves(&self, state: TierPosition) -> Vec<Move> {
        self.decode(state.position)
            .iter()
            .enumerate()
            .filter(|(_, &digit)| digit == 0)
            .map(|(cell, _)| cell as Move)
            .collect()
    }

    fn do_move(&self, state: TierPosition, mv: Move) -> TierPosition {
        let mover = if state.tier % 2 == 0 { 1u64 } else { 2 };
        TierPosition {
            tier: state.tier + 1,
            position: state.position + mover * self.pow3[mv as usize],
        }
    }

    fn primitive(&self, state: TierPosition) -> Value {
        if state.tier == 0 {
            return Value::Undecided;
        }

        let board = self.decode(state.position);
        if self.has_line(&board, Self::last_mover(state.tier)) {
            Value::Lose
        } else if state.tier as usize == self.cells {
            Value::Tie
        } else {
            Value::Undecided
        }
    }

    fn is_legal(&self, state: TierPosition) -> bool {
        let tier = state.tier as usize;
        if tier > self.cells || state.position >= self.pow3[self.cells] {
            return false;
        }

        let board = self.decode(state.position);
        let first = board.iter().filter(|&&d| d == 1).count();
        let second = board.iter().filter(|&&d| d == 2).count();
        if first != tier.div_ceil(2) || second != tier / 2 {
            return false;
        }

        // The game ends the moment a line appears, so only the player who
        // moved last may hold one.
        if tier > 0 {
            let idle = 3 - Self::last_mover(state.tier);
            if self.has_line(&board, idle) {
                return false;
            }
        }

        true
    }

    fn canonical_position(&self, state: TierPosition) -> Position {
        self.fold(&self.decode(state.position))
    }

    fn canonical_parents(
        &self,
        child: TierPosition,
        parent_tier: Tier,
    ) -> Option<Vec<Position>> {
        if child.tier != parent_tier + 1 {
            return Some(Vec::new());
        }

        let canonical_child = TierPosition {
            tier: child.tier,
            position: self.canonical_position(child),
        };

        let board = self.decode(canonical_child.position);
        let last = Self::last_mover(child.tier);
        let mut parents = Vec::new();

        // Undo the last move on every board in the child's symmetry orbit;
        // folding the results covers every canonical predecessor.
        for map in &self.transforms {
            let mut image = vec![0u8; self.cells];
            for (dest, &src) in map.iter().enumerate() {
                image[dest] = board[src];
            }

            for cell in 0..self.cells {
                if image[cell] == last {
                    image[cell] = 0;
                    parents.push(self.fold(&image));
                    image[cell] = last;
                }
            }
        }

        parents.sort_unstable();
        parents.dedup();
        parents.retain(|&parent| {
            let state = TierPosition {
                tier: parent_tier,
                position: parent,
            };

            self.is_legal(state)
                && self
                    .canonical_children(state)
                    .contains(&canonical_child)
        });

        Some(parents)
    }

    fn tier_type(&self, _tier: Tier) -> TierType {
        TierType::ImmediateTransition
    }

    fn tier_name(&self, tier: Tier) -> String {
        format!("{tier}_pieces")
    }
}

/* UTILITY */

/// Enumerates every K-cell window of the board that wins the game when
/// filled by one player.
fn line_windows(rows: usize, cols: usize, k: usize) -> Vec<Vec<usize>> {
    let index = |r: usize, c: usize| r * cols + c;
    let mut lines = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if c + k <= cols {
                lines.push((0..k).map(|i| index(r, c + i)).collect());
            }

            if r + k <= rows {
                lines.push((0..k).map(|i| index(r + i, c)).collect());
            }

            if r + k <= rows && c + k <= cols {
                lines.push((0..k).map(|i| index(r + i, c + i)).collect());
            }

            if r + k <= rows && c + 1 >= k {
                lines.push((0..k).map(|i| index(r + i, c - i)).collect());
            }
        }
    }

    lines
}

/// Builds the board's symmetry group as cell permutations (`map[dest]` is
/// the source cell). Row and column flips always apply; transposition only
/// on square boards.
fn symmetry_maps(rows: usize, cols: usize) -> Vec<Vec<usize>> {
    let transposes: &[bool] = if rows == cols {
        &[false, true]
    } else {
        &[false]
    };

    let mut maps = Vec::new();
    for &transpose in transposes {
        for flip_row in [false, true] {
            for flip_col in [false, true] {
                let mut map = vec![0; rows * cols];
                for r in 0..rows {
                    for c in 0..cols {
                        let (mut sr, mut sc) =
                            if transpose { (c, r) } else { (r, c) };

                        if flip_row {
                            sr = rows - 1 - sr;
                        }

                        if flip_col {
                            sc = cols - 1 - sc;
                        }

                        map[r * cols + c] = sr * cols + sc;
                    }
                }

                if !maps.contains(&map) {
                    maps.push(map);
                }
            }
        }
    }

    maps
}
