//! Crossword slot filling as constraint satisfaction.
//!
//! Slots are variables, candidate words are values, and crossings between
//! slots are binary constraints. Solving runs node consistency, AC-3 arc
//! consistency, and a backtracking search guided by the minimum-remaining-
//! values, degree, and least-constraining-value heuristics.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Debug, Formatter};

use bit_set::BitSet;
use instant::{Duration, Instant};
use smallvec::{smallvec, SmallVec};
use thiserror::Error;

mod trace;
use crate::trace::{debug, trace};

/// The expected maximum number of distinct characters appearing in a word list.
pub const MAX_GLYPH_COUNT: usize = 256;

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given letter, based on its index in the Grid's `glyphs` field.
pub type GlyphId = usize;

/// An identifier for a given slot, based on its index in the Grid's `slots` field.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the Grid's `words` field.
pub type WordId = usize;

/// Zero-indexed x and y coords for a cell in the grid, where y = 0 in the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Across,
    Down,
}

/// A crossword entry position: a maximal run of cells in one direction that
/// takes a single word. Two slots are the same slot exactly when all four
/// scalar fields (start x, start y, direction, length) match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,
}

impl Slot {
    pub fn new(start_cell: GridCoord, direction: Direction, length: usize) -> Slot {
        Slot {
            start_cell,
            direction,
            length,
        }
    }

    /// Generate the coords for each cell of this slot.
    fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (self.start_cell.0 + cell_idx, self.start_cell.1),
                Direction::Down => (self.start_cell.0, self.start_cell.1 + cell_idx),
            })
            .collect()
    }
}

/// A word that can be chosen for a slot, with its letters interned as glyph ids.
#[derive(Debug, Clone)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,
}

/// A crossing between one slot and another, referencing the shared cell's
/// position within this slot and within the other slot. The character a word
/// places at `cell` must equal the character the other slot's word places at
/// `other_cell`.
#[derive(Debug, Clone, Copy)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub cell: usize,
    pub other_cell: usize,
}

/// The immutable model consumed by the solver: slot definitions, the candidate
/// word list, and the crossing map computed once from grid geometry.
pub struct Grid {
    pub glyphs: SmallVec<[char; MAX_GLYPH_COUNT]>,
    pub slots: SmallVec<[Slot; MAX_SLOT_COUNT]>,
    pub words: Vec<Word>,
    crossings: Vec<SmallVec<[Crossing; MAX_SLOT_LENGTH]>>,
}

impl Debug for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("glyphs", &self.glyphs)
            .field("slots", &self.slots)
            .field("words", &(["(", &self.words.len().to_string(), " entries)"].join("")))
            .finish()
    }
}

impl Grid {
    /// Build a grid from explicit slots and a word list. Duplicate strings in
    /// the word list are dropped, and crossings are computed from the slots'
    /// cell coordinates. Panics on contradictory slot sets: two slots running
    /// in the same direction through one cell, more than two slots sharing a
    /// cell, or a crossing whose offsets fall outside either slot.
    pub fn new<S: AsRef<str>>(slots: &[Slot], word_list: &[S]) -> Grid {
        let mut glyphs: SmallVec<[char; MAX_GLYPH_COUNT]> = SmallVec::new();
        let mut glyph_ids_by_char: HashMap<char, GlyphId> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut words: Vec<Word> = Vec::with_capacity(word_list.len());

        for entry in word_list {
            let string = entry.as_ref();
            if !seen.insert(string) {
                continue;
            }
            let interned: SmallVec<[GlyphId; MAX_SLOT_LENGTH]> = string
                .chars()
                .map(|c| {
                    *glyph_ids_by_char.entry(c).or_insert_with(|| {
                        glyphs.push(c);
                        glyphs.len() - 1
                    })
                })
                .collect();
            words.push(Word {
                string: string.to_string(),
                glyphs: interned,
            });
        }

        // Build a map from cell location to (slot index, cell index within
        // slot), which we can then use to calculate crossings.
        let mut cell_by_loc: HashMap<GridCoord, Vec<(usize, usize)>> = HashMap::new();
        for (slot_idx, slot) in slots.iter().enumerate() {
            assert!(slot.length > 0, "Slot {:?} has zero length", slot);
            for (cell_idx, loc) in slot.cell_coords().into_iter().enumerate() {
                cell_by_loc.entry(loc).or_default().push((slot_idx, cell_idx));
            }
        }

        let crossings: Vec<SmallVec<[Crossing; MAX_SLOT_LENGTH]>> = slots
            .iter()
            .enumerate()
            .map(|(slot_idx, slot)| {
                let mut result: SmallVec<[Crossing; MAX_SLOT_LENGTH]> = SmallVec::new();

                for (cell_idx, loc) in slot.cell_coords().into_iter().enumerate() {
                    let others: Vec<&(usize, usize)> = cell_by_loc[&loc]
                        .iter()
                        .filter(|&&(other_idx, _)| other_idx != slot_idx)
                        .collect();

                    if others.len() > 1 {
                        panic!("More than two slots share the cell {:?}", loc);
                    }

                    if let Some(&&(other_slot_id, other_cell)) = others.first() {
                        let other = &slots[other_slot_id];
                        if other.direction == slot.direction {
                            panic!(
                                "Slots {:?} and {:?} run in the same direction through {:?}",
                                slot, other, loc
                            );
                        }
                        assert!(
                            cell_idx < slot.length && other_cell < other.length,
                            "Crossing offsets ({}, {}) fall outside slots {:?} and {:?}",
                            cell_idx,
                            other_cell,
                            slot,
                            other
                        );
                        result.push(Crossing {
                            other_slot_id,
                            cell: cell_idx,
                            other_cell,
                        });
                    }
                }

                result
            })
            .collect();

        Grid {
            glyphs,
            slots: SmallVec::from_iter(slots.iter().copied()),
            words,
            crossings,
        }
    }

    /// Build a grid from a string template, with `.` representing open cells
    /// and any other non-whitespace character representing a block. Slots are
    /// maximal runs of at least two open cells, in both directions.
    pub fn from_template<S: AsRef<str>>(template: &str, word_list: &[S]) -> Grid {
        let rows: Vec<Vec<char>> = template
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    Some(line.chars().collect())
                }
            })
            .collect();

        let mut slots: Vec<Slot> = vec![];

        for (y, row) in rows.iter().enumerate() {
            let mut run_start = 0;
            let mut run_len = 0;
            for (x, &cell) in row.iter().enumerate() {
                if cell == '.' {
                    if run_len == 0 {
                        run_start = x;
                    }
                    run_len += 1;
                } else {
                    if run_len > 1 {
                        slots.push(Slot::new((run_start, y), Direction::Across, run_len));
                    }
                    run_len = 0;
                }
            }
            if run_len > 1 {
                slots.push(Slot::new((run_start, y), Direction::Across, run_len));
            }
        }

        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        for x in 0..width {
            let mut run_start = 0;
            let mut run_len = 0;
            for (y, row) in rows.iter().enumerate() {
                if row.get(x) == Some(&'.') {
                    if run_len == 0 {
                        run_start = y;
                    }
                    run_len += 1;
                } else {
                    if run_len > 1 {
                        slots.push(Slot::new((x, run_start), Direction::Down, run_len));
                    }
                    run_len = 0;
                }
            }
            if run_len > 1 {
                slots.push(Slot::new((x, run_start), Direction::Down, run_len));
            }
        }

        Grid::new(&slots, word_list)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn word(&self, word_id: WordId) -> &str {
        &self.words[word_id].string
    }

    /// Look a word id up by its string.
    pub fn word_id(&self, string: &str) -> Option<WordId> {
        self.words.iter().position(|word| word.string == string)
    }

    /// Look a slot id up by its start cell and direction.
    pub fn slot_at(&self, start_cell: GridCoord, direction: Direction) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|slot| slot.start_cell == start_cell && slot.direction == direction)
    }

    /// All crossings of the given slot, one per shared cell.
    pub fn crossings(&self, slot_id: SlotId) -> &[Crossing] {
        &self.crossings[slot_id]
    }

    /// The slots that share a cell with the given slot.
    pub fn neighbors(&self, slot_id: SlotId) -> impl Iterator<Item = SlotId> + '_ {
        self.crossings[slot_id].iter().map(|crossing| crossing.other_slot_id)
    }

    /// How many other slots the given slot crosses.
    pub fn degree(&self, slot_id: SlotId) -> usize {
        self.crossings[slot_id].len()
    }

    /// The pair of offsets at which two slots share a cell: the character at
    /// position `i` of x's word must equal the character at position `j` of
    /// y's word. `None` if the slots don't cross.
    pub fn overlap(&self, x: SlotId, y: SlotId) -> Option<(usize, usize)> {
        self.crossings[x]
            .iter()
            .find(|crossing| crossing.other_slot_id == y)
            .map(|crossing| (crossing.cell, crossing.other_cell))
    }
}

/// A partial or complete assignment of words to slots. Each search branch
/// owns an independent copy; a slot is assigned at most once.
#[derive(Debug, Clone)]
pub struct Assignment {
    word_by_slot: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Assignment {
    pub fn empty(slot_count: usize) -> Assignment {
        Assignment {
            word_by_slot: vec![None; slot_count],
            assigned_count: 0,
        }
    }

    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.word_by_slot[slot_id]
    }

    /// Assign a word to a slot. Panics if the slot already holds a word.
    pub fn set(&mut self, slot_id: SlotId, word_id: WordId) {
        assert!(
            self.word_by_slot[slot_id].is_none(),
            "Slot {} is already assigned",
            slot_id
        );
        self.word_by_slot[slot_id] = Some(word_id);
        self.assigned_count += 1;
    }

    pub fn len(&self) -> usize {
        self.assigned_count
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_count == 0
    }

    /// Iterate the assigned (slot, word) pairs in slot-id order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.word_by_slot
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word)| word.map(|word_id| (slot_id, word_id)))
    }
}

/// Turn the given grid and (possibly partial) assignment into a rendered
/// string, with `.` for cells no assigned word has written yet.
pub fn render_grid(grid: &Grid, assignment: &Assignment) -> String {
    let max_x = grid
        .slots
        .iter()
        .map(|slot| match slot.direction {
            Direction::Across => slot.start_cell.0 + slot.length - 1,
            Direction::Down => slot.start_cell.0,
        })
        .max()
        .expect("Grid must have slots");

    let max_y = grid
        .slots
        .iter()
        .map(|slot| match slot.direction {
            Direction::Across => slot.start_cell.1,
            Direction::Down => slot.start_cell.1 + slot.length - 1,
        })
        .max()
        .expect("Grid must have slots");

    let mut rows: Vec<String> = (0..=max_y)
        .map(|_| (0..=max_x).map(|_| ".").collect::<Vec<_>>().join(""))
        .collect();

    for (slot_id, word_id) in assignment.iter() {
        let slot = &grid.slots[slot_id];
        let word = &grid.words[word_id];

        for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
            let (x, y) = match slot.direction {
                Direction::Across => (slot.start_cell.0 + cell_idx, slot.start_cell.1),
                Direction::Down => (slot.start_cell.0, slot.start_cell.1 + cell_idx),
            };

            rows[y].replace_range(x..x + 1, &grid.glyphs[glyph].to_string());
        }
    }

    rows.join("\n")
}

/// A struct tracking statistics about the solving process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Search states visited (one per recursive step).
    pub states: u64,
    /// Dead ends reached during search.
    pub backtracks: u64,
    /// Words removed by arc-consistency revisions.
    pub revisions: u64,
    pub duration: Duration,
}

/// Caller-imposed bounds on a single solve, checked at the top of every
/// search step. Unlimited by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveLimits {
    pub max_states: Option<u64>,
    pub max_duration: Option<Duration>,
}

/// Knobs for a single solve.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Re-propagate arc consistency over the arcs into each slot as it is
    /// assigned. Prunes the search tree without changing the outcome.
    pub maintain_arc_consistency: bool,
    /// Forbid assigning the same word to two different slots.
    pub forbid_duplicate_words: bool,
    pub limits: SolveLimits,
}

impl Default for SolveOptions {
    fn default() -> SolveOptions {
        SolveOptions {
            maintain_arc_consistency: true,
            forbid_duplicate_words: false,
            limits: SolveLimits::default(),
        }
    }
}

/// Why a solve produced no assignment. The first two variants are ordinary
/// "no solution" verdicts; `BudgetExhausted` means a limit fired first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolveFailure {
    #[error("a slot has no candidate words left after constraint propagation")]
    UnsatisfiableDomain,
    #[error("exhausted the search space without completing an assignment")]
    SearchExhausted,
    #[error("hit the solve budget before the search completed")]
    BudgetExhausted,
}

/// A completed fill: a word for every slot, plus counters from the search.
#[derive(Debug, Clone)]
pub struct Solution {
    pub assignment: Assignment,
    pub statistics: Statistics,
}

type GlyphCountsByCell = Vec<SmallVec<[u32; MAX_GLYPH_COUNT]>>;

/// Live candidate sets for every slot. Domains only ever shrink. The glyph
/// counts track, for each cell of a slot, how many live candidates of the
/// slot's own length place each glyph there, so support checks during
/// revision are a single lookup.
#[derive(Clone)]
pub struct DomainStore {
    live: Vec<BitSet>,
    glyph_counts: Vec<GlyphCountsByCell>,
    remaining: Vec<usize>,
}

impl DomainStore {
    /// Every slot starts with the full word list as its domain.
    fn new(grid: &Grid) -> DomainStore {
        let full: BitSet = (0..grid.words.len()).collect();

        let glyph_counts = grid
            .slots
            .iter()
            .map(|slot| {
                let mut counts: GlyphCountsByCell =
                    (0..slot.length).map(|_| smallvec![0; grid.glyphs.len()]).collect();

                for word in &grid.words {
                    if word.glyphs.len() != slot.length {
                        continue;
                    }
                    for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
                        counts[cell_idx][glyph] += 1;
                    }
                }

                counts
            })
            .collect();

        DomainStore {
            live: grid.slots.iter().map(|_| full.clone()).collect(),
            glyph_counts,
            remaining: grid.slots.iter().map(|_| grid.words.len()).collect(),
        }
    }

    /// How many candidates are still available for this slot?
    pub fn remaining(&self, slot_id: SlotId) -> usize {
        self.remaining[slot_id]
    }

    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.remaining[slot_id] == 0
    }

    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.live[slot_id].contains(word_id)
    }

    /// Iterate the live candidates for a slot in word-id order.
    pub fn candidates(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        self.live[slot_id].iter()
    }

    /// How many live candidates of the slot's own length place `glyph` at `cell`.
    pub fn glyph_count(&self, slot_id: SlotId, cell: usize, glyph: GlyphId) -> u32 {
        self.glyph_counts[slot_id][cell][glyph]
    }

    fn remove(&mut self, grid: &Grid, slot_id: SlotId, word_id: WordId) -> bool {
        if !self.live[slot_id].remove(word_id) {
            return false;
        }
        self.remaining[slot_id] -= 1;

        let removed = &grid.words[word_id];
        if removed.glyphs.len() == grid.slots[slot_id].length {
            for (cell_idx, &glyph) in removed.glyphs.iter().enumerate() {
                self.glyph_counts[slot_id][cell_idx][glyph] -= 1;
            }
        }
        true
    }

    /// Shrink a slot's domain to a single chosen word.
    fn restrict_to(&mut self, grid: &Grid, slot_id: SlotId, word_id: WordId) {
        let doomed: Vec<WordId> = self.live[slot_id].iter().filter(|&w| w != word_id).collect();
        for w in doomed {
            self.remove(grid, slot_id, w);
        }
    }
}

/// The solver for one fill attempt: owns the domain store for a single solve
/// invocation over a borrowed grid. Build a fresh solver per solve.
pub struct Solver<'g> {
    grid: &'g Grid,
    domains: DomainStore,
    options: SolveOptions,
    statistics: Statistics,
    deadline: Option<Instant>,
}

impl<'g> Solver<'g> {
    pub fn new(grid: &'g Grid) -> Solver<'g> {
        Solver::with_options(grid, SolveOptions::default())
    }

    pub fn with_options(grid: &'g Grid, options: SolveOptions) -> Solver<'g> {
        Solver {
            grid,
            domains: DomainStore::new(grid),
            options,
            statistics: Statistics::default(),
            deadline: None,
        }
    }

    pub fn domains(&self) -> &DomainStore {
        &self.domains
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Remove every candidate whose length differs from its slot's length.
    /// Runs once, before arc consistency; afterwards every domain holds only
    /// words that fit their slot.
    pub fn enforce_node_consistency(&mut self) {
        for slot_id in 0..self.grid.slot_count() {
            let length = self.grid.slots[slot_id].length;
            let doomed: Vec<WordId> = self
                .domains
                .candidates(slot_id)
                .filter(|&word_id| self.grid.words[word_id].glyphs.len() != length)
                .collect();
            for word_id in doomed {
                self.domains.remove(self.grid, slot_id, word_id);
            }
        }
    }

    /// Make `x` arc consistent with `y`: remove from x's domain every word
    /// with no supporting candidate in y's domain at the crossing cell.
    /// Returns whether anything was removed; no-op when the slots don't cross.
    pub fn revise(&mut self, x: SlotId, y: SlotId) -> bool {
        let (i, j) = match self.grid.overlap(x, y) {
            Some(offsets) => offsets,
            None => return false,
        };

        let doomed: Vec<WordId> = self
            .domains
            .candidates(x)
            .filter(|&word_id| match self.grid.words[word_id].glyphs.get(i) {
                Some(&glyph) => self.domains.glyph_count(y, j, glyph) == 0,
                None => true,
            })
            .collect();

        for &word_id in &doomed {
            self.domains.remove(self.grid, x, word_id);
        }
        self.statistics.revisions += doomed.len() as u64;

        !doomed.is_empty()
    }

    /// Propagate arc consistency to a fixpoint across every crossing pair.
    /// Returns false as soon as any domain is emptied.
    pub fn ac3(&mut self) -> bool {
        let grid = self.grid;
        let arcs: Vec<(SlotId, SlotId)> = (0..grid.slot_count())
            .flat_map(|x| {
                grid.crossings(x)
                    .iter()
                    .map(move |crossing| (x, crossing.other_slot_id))
            })
            .collect();
        self.ac3_seeded(arcs)
    }

    /// Worklist-driven arc consistency over a caller-chosen initial arc set.
    /// Whenever a revision shrinks x, every arc (z, x) for the other
    /// neighbors z of x goes back on the queue, so the result is a fixpoint
    /// over everything reachable from the seeds. Used during search to
    /// propagate the singleton domain of a just-assigned slot.
    pub fn ac3_seeded<I>(&mut self, arcs: I) -> bool
    where
        I: IntoIterator<Item = (SlotId, SlotId)>,
    {
        let mut queue: VecDeque<(SlotId, SlotId)> = arcs.into_iter().collect();

        while let Some((x, y)) = queue.pop_front() {
            if !self.revise(x, y) {
                continue;
            }

            if self.domains.is_empty(x) {
                debug!(slot = x, "domain emptied during propagation");
                return false;
            }

            for crossing in self.grid.crossings(x) {
                if crossing.other_slot_id != y {
                    queue.push_back((crossing.other_slot_id, x));
                }
            }
        }

        true
    }

    /// Check a partial assignment structurally: every assigned word fits its
    /// slot's length, every pair of assigned crossing slots agrees on the
    /// shared cell, and (when duplicates are forbidden) no word appears
    /// twice. Pure; never consults the domain store.
    pub fn consistent(&self, assignment: &Assignment) -> bool {
        for (slot_id, word_id) in assignment.iter() {
            let slot = &self.grid.slots[slot_id];
            let word = &self.grid.words[word_id];

            if word.glyphs.len() != slot.length {
                return false;
            }

            for crossing in self.grid.crossings(slot_id) {
                if let Some(other_word_id) = assignment.get(crossing.other_slot_id) {
                    let other = &self.grid.words[other_word_id];
                    if word.glyphs.get(crossing.cell) != other.glyphs.get(crossing.other_cell) {
                        return false;
                    }
                }
            }
        }

        if self.options.forbid_duplicate_words {
            let mut used = BitSet::with_capacity(self.grid.word_count());
            for (_, word_id) in assignment.iter() {
                if !used.insert(word_id) {
                    return false;
                }
            }
        }

        true
    }

    /// Choose the unassigned slot with the fewest remaining candidates,
    /// breaking ties towards the slot with the most crossings. `None` once
    /// every slot is assigned.
    pub fn select_unassigned_variable(&self, assignment: &Assignment) -> Option<SlotId> {
        (0..self.grid.slot_count())
            .filter(|&slot_id| assignment.get(slot_id).is_none())
            .min_by_key(|&slot_id| (self.domains.remaining(slot_id), Reverse(self.grid.degree(slot_id))))
    }

    /// Rank the slot's live candidates by how many options they would rule
    /// out in unassigned crossing slots, least constraining first. The count
    /// for one neighbor is its remaining domain size minus the number of its
    /// candidates agreeing with ours at the shared cell.
    pub fn order_domain_values(&self, slot_id: SlotId, assignment: &Assignment) -> Vec<WordId> {
        let mut values: Vec<WordId> = self.domains.candidates(slot_id).collect();

        values.sort_by_cached_key(|&word_id| {
            let word = &self.grid.words[word_id];
            let mut ruled_out = 0;

            for crossing in self.grid.crossings(slot_id) {
                if assignment.get(crossing.other_slot_id).is_some() {
                    continue;
                }
                let supported = match word.glyphs.get(crossing.cell) {
                    Some(&glyph) => {
                        self.domains
                            .glyph_count(crossing.other_slot_id, crossing.other_cell, glyph)
                            as usize
                    }
                    None => 0,
                };
                ruled_out += self.domains.remaining(crossing.other_slot_id) - supported;
            }

            ruled_out
        });

        values
    }

    /// Run the full pipeline: node consistency, arc consistency to a
    /// fixpoint, then backtracking search. An empty domain after propagation
    /// reports `UnsatisfiableDomain` without entering the search at all.
    pub fn solve(&mut self) -> Result<Solution, SolveFailure> {
        let start = Instant::now();
        self.deadline = self.options.limits.max_duration.map(|limit| start + limit);

        self.enforce_node_consistency();
        let propagated = self.ac3();
        if !propagated || (0..self.grid.slot_count()).any(|slot_id| self.domains.is_empty(slot_id)) {
            self.statistics.duration = start.elapsed();
            debug!("unsatisfiable before search");
            return Err(SolveFailure::UnsatisfiableDomain);
        }

        let result = self.backtrack(&Assignment::empty(self.grid.slot_count()));
        self.statistics.duration = start.elapsed();

        match result {
            Ok(Some(assignment)) => {
                debug!(states = self.statistics.states, "fill found");
                Ok(Solution {
                    assignment,
                    statistics: self.statistics.clone(),
                })
            }
            Ok(None) => Err(SolveFailure::SearchExhausted),
            Err(failure) => Err(failure),
        }
    }

    fn over_budget(&self) -> bool {
        if let Some(max_states) = self.options.limits.max_states {
            if self.statistics.states >= max_states {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        false
    }

    /// Depth-first search over extensions of `assignment`. `Ok(Some(_))` is a
    /// completed assignment and propagates upward immediately; `Ok(None)` is
    /// an ordinary dead end, handled by the caller trying its next candidate;
    /// `Err` aborts the whole search.
    fn backtrack(&mut self, assignment: &Assignment) -> Result<Option<Assignment>, SolveFailure> {
        if self.over_budget() {
            return Err(SolveFailure::BudgetExhausted);
        }
        self.statistics.states += 1;

        if assignment.len() == self.grid.slot_count() {
            return Ok(Some(assignment.clone()));
        }

        let slot_id = self
            .select_unassigned_variable(assignment)
            .expect("An unassigned slot must remain in an incomplete assignment");

        for word_id in self.order_domain_values(slot_id, assignment) {
            let mut extended = assignment.clone();
            extended.set(slot_id, word_id);

            if !self.consistent(&extended) {
                continue;
            }

            if self.options.maintain_arc_consistency {
                // The branch works on its own copy of the domains; the
                // snapshot comes back when the branch fails.
                let saved = self.domains.clone();
                self.domains.restrict_to(self.grid, slot_id, word_id);
                let arcs: Vec<(SlotId, SlotId)> = self
                    .grid
                    .crossings(slot_id)
                    .iter()
                    .map(|crossing| (crossing.other_slot_id, slot_id))
                    .collect();

                if self.ac3_seeded(arcs) {
                    if let Some(solution) = self.backtrack(&extended)? {
                        return Ok(Some(solution));
                    }
                }
                self.domains = saved;
            } else if let Some(solution) = self.backtrack(&extended)? {
                return Ok(Some(solution));
            }
        }

        trace!(slot = slot_id, "dead end, backtracking");
        self.statistics.backtracks += 1;
        Ok(None)
    }
}

/// Search for a valid fill for the given grid with default options.
pub fn solve(grid: &Grid) -> Result<Solution, SolveFailure> {
    Solver::new(grid).solve()
}

/// Search for a valid fill for the given grid with the given options.
pub fn solve_with_options(grid: &Grid, options: SolveOptions) -> Result<Solution, SolveFailure> {
    Solver::with_options(grid, options).solve()
}
