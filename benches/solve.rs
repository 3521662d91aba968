use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crossfill::{solve, Grid, Solver};

/// Every word of the given length over a two-letter alphabet, so any fill the
/// search commits to can be completed.
fn all_words(length: usize) -> Vec<String> {
    (0..(1u32 << length))
        .map(|bits| {
            (0..length)
                .map(|i| if bits >> i & 1 == 1 { 'b' } else { 'a' })
                .collect()
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let grid = Grid::from_template(
        "
        ....
        ....
        ....
        ....
        ",
        &all_words(4),
    );

    c.bench_function("solve_4x4_square", |b| b.iter(|| solve(black_box(&grid))));

    c.bench_function("propagate_4x4_square", |b| {
        b.iter(|| {
            let mut solver = Solver::new(black_box(&grid));
            solver.enforce_node_consistency();
            black_box(solver.ac3())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
