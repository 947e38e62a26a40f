use rand::Rng;

/// Draw `draw_count` case indices with replacement from `0..n_cases`.
///
/// Returns the draws (duplicates kept, in draw order) and the sorted cases
/// never drawn. `n_cases` must be non-zero when `draw_count` is.
pub fn bootstrap_sample(
    n_cases: usize,
    draw_count: usize,
    rng: &mut impl Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut drawn = vec![false; n_cases];
    let mut in_bag = Vec::with_capacity(draw_count);
    for _ in 0..draw_count {
        let case = rng.gen_range(0..n_cases);
        in_bag.push(case);
        drawn[case] = true;
    }
    let oob = (0..n_cases).filter(|&c| !drawn[c]).collect();
    (in_bag, oob)
}
