//! Question selection with anti-repetition.
//!
//! A test draws `n` questions at random, preferring questions that were not
//! part of the previous test. Previously used questions only backfill when
//! the unused ones run out.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::Question;

/// Default number of questions per test.
pub const DEFAULT_QUESTIONS_PER_TEST: usize = 5;

/// Pick up to `n` questions from `pool`, avoiding IDs in `previous`.
///
/// The result holds `min(n, pool.len())` questions with distinct IDs, in
/// random order.
pub fn select_questions<R: Rng + ?Sized>(
    pool: &[Question],
    previous: &HashSet<u32>,
    n: usize,
    rng: &mut R,
) -> Vec<Question> {
    let mut seen = HashSet::new();
    let (mut fresh, mut reused): (Vec<&Question>, Vec<&Question>) = pool
        .iter()
        .filter(|q| seen.insert(q.id))
        .partition(|q| !previous.contains(&q.id));

    fresh.shuffle(rng);
    let mut selected: Vec<Question> = fresh.into_iter().take(n).cloned().collect();

    if selected.len() < n {
        let missing = n - selected.len();
        tracing::debug!(
            missing,
            "not enough unused questions, backfilling from previous test"
        );
        reused.shuffle(rng);
        selected.extend(reused.into_iter().take(missing).cloned());
        selected.shuffle(rng);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::fallback_questions;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(questions: &[Question]) -> HashSet<u32> {
        questions.iter().map(|q| q.id).collect()
    }

    #[test]
    fn sample_size_matches_request() {
        let pool = fallback_questions();
        let mut rng = StdRng::seed_from_u64(7);
        for n in 0..=pool.len() {
            let selected = select_questions(&pool, &HashSet::new(), n, &mut rng);
            assert_eq!(selected.len(), n);
            assert_eq!(ids(&selected).len(), n, "IDs must be distinct");
        }
    }

    #[test]
    fn small_pool_returns_everything() {
        let pool: Vec<Question> = fallback_questions().into_iter().take(3).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let selected = select_questions(&pool, &HashSet::new(), 5, &mut rng);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn avoids_previous_questions_when_possible() {
        let pool = fallback_questions();
        let previous: HashSet<u32> = (1..=5).collect();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let selected = select_questions(&pool, &previous, 5, &mut rng);
            assert!(ids(&selected).is_disjoint(&previous));
        }
    }

    #[test]
    fn backfills_from_previous_when_short() {
        let pool = fallback_questions();
        let previous: HashSet<u32> = (1..=8).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let selected = select_questions(&pool, &previous, 5, &mut rng);
        let chosen = ids(&selected);
        assert_eq!(selected.len(), 5);
        assert!(chosen.contains(&9));
        assert!(chosen.contains(&10));
        assert_eq!(chosen.intersection(&previous).count(), 3);
    }

    #[test]
    fn duplicate_pool_ids_are_ignored() {
        let mut pool = fallback_questions();
        pool.extend(fallback_questions());
        let mut rng = StdRng::seed_from_u64(9);
        let selected = select_questions(&pool, &HashSet::new(), 10, &mut rng);
        assert_eq!(ids(&selected).len(), 10);
    }
}
