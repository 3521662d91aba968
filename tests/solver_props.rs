use crossfill::{solve, solve_with_options, Grid, SolveOptions, Solver};
use proptest::prelude::*;

fn letter() -> impl Strategy<Value = char> {
    prop_oneof![Just('a'), Just('b'), Just('c')]
}

fn word(length: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(letter(), length).prop_map(|chars| chars.into_iter().collect())
}

fn word_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(word(2), 1..8)
}

/// Exhaustively check whether a 2x2 square can be filled from the word list:
/// two rows, two columns, four crossing cells.
fn brute_force_satisfiable(words: &[String]) -> bool {
    for r0 in words {
        for r1 in words {
            for c0 in words {
                for c1 in words {
                    let (r0, r1) = (r0.as_bytes(), r1.as_bytes());
                    let (c0, c1) = (c0.as_bytes(), c1.as_bytes());
                    if r0[0] == c0[0] && r0[1] == c1[0] && r1[0] == c0[1] && r1[1] == c1[1] {
                        return true;
                    }
                }
            }
        }
    }
    false
}

proptest! {
    #[test]
    fn verdict_matches_brute_force(words in word_list()) {
        let grid = Grid::from_template("..\n..", &words);
        let expected = brute_force_satisfiable(&words);

        prop_assert_eq!(solve(&grid).is_ok(), expected);

        let plain = SolveOptions {
            maintain_arc_consistency: false,
            ..SolveOptions::default()
        };
        prop_assert_eq!(solve_with_options(&grid, plain).is_ok(), expected);
    }

    #[test]
    fn solutions_are_complete_and_consistent(words in word_list()) {
        let grid = Grid::from_template("..\n..", &words);

        if let Ok(solution) = solve(&grid) {
            prop_assert_eq!(solution.assignment.len(), grid.slot_count());
            let checker = Solver::new(&grid);
            prop_assert!(checker.consistent(&solution.assignment));
        }
    }

    #[test]
    fn ac3_reaches_a_supported_fixpoint(words in word_list()) {
        let grid = Grid::from_template("..\n..", &words);
        let mut solver = Solver::new(&grid);
        solver.enforce_node_consistency();

        if solver.ac3() {
            for x in 0..grid.slot_count() {
                for crossing in grid.crossings(x) {
                    let y = crossing.other_slot_id;
                    for word_id in solver.domains().candidates(x) {
                        let glyph = grid.words[word_id].glyphs[crossing.cell];
                        let supported = solver.domains().candidates(y).any(|other_id| {
                            grid.words[other_id].glyphs[crossing.other_cell] == glyph
                        });
                        prop_assert!(supported);
                    }
                }
            }

            // A second pass over an already-consistent store removes nothing.
            let revisions = solver.statistics().revisions;
            prop_assert!(solver.ac3());
            prop_assert_eq!(solver.statistics().revisions, revisions);
        }
    }

    #[test]
    fn node_consistency_keeps_only_fitting_words(
        words in prop::collection::vec(prop::collection::vec(letter(), 2..=3usize)
            .prop_map(|chars| chars.into_iter().collect::<String>()), 1..10)
    ) {
        // One length-3 slot and three length-2 slots.
        let grid = Grid::from_template("...\n..#", &words);
        let mut solver = Solver::new(&grid);
        solver.enforce_node_consistency();

        for slot_id in 0..grid.slot_count() {
            for word_id in solver.domains().candidates(slot_id) {
                prop_assert_eq!(grid.words[word_id].glyphs.len(), grid.slots[slot_id].length);
            }
        }
    }
}
