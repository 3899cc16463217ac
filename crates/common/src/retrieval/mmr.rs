//! Maximal Marginal Relevance (MMR) re-ranking
//!
//! MMR picks results one at a time, scoring each remaining candidate by
//! its similarity to the query minus its similarity to the closest
//! result already picked:
//!
//! `lambda * sim(query, c) - (1 - lambda) * max(sim(c, picked))`
//!
//! `lambda = 1.0` degenerates to plain relevance ranking; `0.0` maximizes
//! diversity.

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Select up to `k` candidate indices in MMR order
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda_mult: f32,
) -> Vec<usize> {
    let target = k.min(candidates.len());
    if target == 0 {
        return Vec::new();
    }

    let to_query: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    // Seed with the most relevant candidate
    let mut best = 0;
    for (i, score) in to_query.iter().enumerate() {
        if *score > to_query[best] {
            best = i;
        }
    }

    let mut selected = vec![best];
    // Highest similarity of each candidate to anything selected so far
    let mut redundancy: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(c, &candidates[best]))
        .collect();

    while selected.len() < target {
        let mut pick: Option<(usize, f32)> = None;

        for (i, relevance) in to_query.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }
            let score = lambda_mult * relevance - (1.0 - lambda_mult) * redundancy[i];
            if pick.map_or(true, |(_, best_score)| score > best_score) {
                pick = Some((i, score));
            }
        }

        let Some((next, _)) = pick else { break };
        selected.push(next);

        for (i, candidate) in candidates.iter().enumerate() {
            let sim = cosine_similarity(candidate, &candidates[next]);
            if sim > redundancy[i] {
                redundancy[i] = sim;
            }
        }
    }

    selected
}
