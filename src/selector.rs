//! Winner selection

use rand::seq::index;
use rand::Rng;

use crate::error::{PickError, Result};
use crate::models::Participant;

/// Draw up to `count` distinct winners uniformly at random.
pub fn select(eligible: &[Participant], count: usize) -> Result<Vec<Participant>> {
    select_with(eligible, count, &mut rand::thread_rng())
}

/// As [`select`], with a caller-supplied random source.
///
/// `count` is clamped to the pool size. An empty pool is an error
/// regardless of `count`.
pub fn select_with<R: Rng + ?Sized>(
    eligible: &[Participant],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Participant>> {
    if eligible.is_empty() {
        return Err(PickError::NoEligibleParticipants);
    }

    let amount = count.min(eligible.len());
    Ok(index::sample(rng, eligible.len(), amount)
        .into_iter()
        .map(|i| eligible[i].clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn pool(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| Participant::new(format!("user{}.bsky.social", i), None))
            .collect()
    }

    #[test]
    fn test_returns_distinct_members_of_pool() {
        let eligible = pool(10);
        let mut rng = StdRng::seed_from_u64(7);

        for k in 1..=10 {
            let winners = select_with(&eligible, k, &mut rng).unwrap();
            assert_eq!(winners.len(), k);
            let unique: HashSet<_> = winners.iter().map(|w| &w.handle).collect();
            assert_eq!(unique.len(), k);
            assert!(winners.iter().all(|w| eligible.contains(w)));
        }
    }

    #[test]
    fn test_count_clamps_to_pool_size() {
        let eligible = pool(2);
        let winners = select(&eligible, 5).unwrap();
        assert_eq!(winners.len(), 2);
        let unique: HashSet<_> = winners.iter().map(|w| &w.handle).collect();
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_empty_pool_fails_for_any_count() {
        for k in [0, 1, 100] {
            assert!(matches!(
                select(&[], k),
                Err(PickError::NoEligibleParticipants)
            ));
        }
    }

    #[test]
    fn test_every_member_can_win() {
        let eligible = pool(4);
        let mut rng = StdRng::seed_from_u64(42);
        let mut wins: HashMap<String, usize> = HashMap::new();

        for _ in 0..4000 {
            let winner = select_with(&eligible, 1, &mut rng).unwrap().remove(0);
            *wins.entry(winner.handle).or_default() += 1;
        }

        assert_eq!(wins.len(), 4);
        // 1000 expected per member; allow generous slack
        assert!(wins.values().all(|&n| (800..=1200).contains(&n)));
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let eligible = pool(20);
        let first = select_with(&eligible, 3, &mut StdRng::seed_from_u64(1)).unwrap();
        let second = select_with(&eligible, 3, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(first, second);
    }
}
