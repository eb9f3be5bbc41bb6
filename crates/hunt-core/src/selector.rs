//! Interest-weighted challenge selection, used at hunt start and when
//! swapping unfinished challenges.
//!
//! Pure score-maximization would starve interests held by few
//! participants, so a diversity pass first gives every declared tag one
//! uniformly-random representative; only then does the fill pass rank the
//! rest by popularity. The RNG is injected so tests can seed it.

use std::collections::{BTreeMap, BTreeSet};

use contracts::Challenge;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

/// Select `target` challenge ids from `pool`, weighting toward the
/// participants' declared interests.
///
/// Returns every id when the pool is no larger than the target. With no
/// declared interests the draw is a uniform shuffle. The output order is
/// stable for a fixed RNG stream but carries no meaning beyond that.
pub fn select(
    pool: &[Challenge],
    interest_profiles: &[BTreeSet<String>],
    target: usize,
    rng: &mut impl Rng,
) -> Vec<u32> {
    if pool.len() <= target {
        return pool.iter().map(|challenge| challenge.id).collect();
    }

    let declared: BTreeSet<&str> = interest_profiles
        .iter()
        .flat_map(|profile| profile.iter().map(String::as_str))
        .collect();

    if declared.is_empty() {
        let mut ids: Vec<u32> = pool.iter().map(|challenge| challenge.id).collect();
        ids.shuffle(rng);
        ids.truncate(target);
        return ids;
    }

    let mut tag_weights: BTreeMap<&str, usize> = BTreeMap::new();
    for profile in interest_profiles {
        for tag in profile {
            *tag_weights.entry(tag.as_str()).or_default() += 1;
        }
    }

    let score = |challenge: &Challenge| -> usize {
        challenge
            .interest_tags
            .iter()
            .filter_map(|tag| tag_weights.get(tag.as_str()))
            .sum()
    };

    let mut picked = vec![false; pool.len()];
    let mut selected: Vec<usize> = Vec::with_capacity(target);
    let mut covered: BTreeSet<&str> = BTreeSet::new();

    // Diversity pass: one random representative per declared tag, so every
    // represented interest gets a slot before popularity takes over.
    for tag in &declared {
        if selected.len() >= target {
            break;
        }
        if covered.contains(tag) {
            continue;
        }

        let candidates: Vec<usize> = pool
            .iter()
            .enumerate()
            .filter(|(index, challenge)| {
                !picked[*index] && challenge.interest_tags.contains(*tag)
            })
            .map(|(index, _)| index)
            .collect();

        let Some(&choice) = candidates.choose(rng) else {
            // No challenge carries this tag; nothing to represent.
            continue;
        };

        picked[choice] = true;
        selected.push(choice);
        for carried in &pool[choice].interest_tags {
            if declared.contains(carried.as_str()) {
                covered.insert(carried.as_str());
            }
        }
    }

    // Fill pass: score descending; the pre-shuffle makes the stable sort's
    // tie-break uniformly random.
    let mut remaining: Vec<usize> = (0..pool.len()).filter(|index| !picked[*index]).collect();
    remaining.shuffle(rng);
    remaining.sort_by(|a, b| score(&pool[*b]).cmp(&score(&pool[*a])));

    for index in remaining {
        if selected.len() >= target {
            break;
        }
        selected.push(index);
    }

    selected.into_iter().map(|index| pool[index].id).collect()
}

/// Rewrite `selection` element-wise, replacing each id in `ids_to_replace`
/// with the next fresh id while untouched positions keep their slots.
/// Callers validate that `ids_to_replace` is a distinct subset of the
/// selection and that `replacements` has matching length.
pub fn replace_in_place(selection: &mut [u32], ids_to_replace: &[u32], replacements: &[u32]) {
    let mut fresh = replacements.iter();
    for slot in selection.iter_mut() {
        if ids_to_replace.contains(slot) {
            if let Some(&next) = fresh.next() {
                *slot = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn challenge(id: u32, tags: &[&str]) -> Challenge {
        Challenge {
            id,
            caption: format!("challenge {id}"),
            image_url: format!("/img/{id}.jpg"),
            interest_tags: tags.iter().map(|tag| tag.to_string()).collect(),
            placeholder: false,
        }
    }

    fn profile(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|tag| tag.to_string()).collect()
    }

    #[test]
    fn small_pool_returns_everything() {
        let pool = vec![challenge(1, &[]), challenge(2, &[]), challenge(3, &[])];
        let mut rng = StdRng::seed_from_u64(7);
        let ids = select(&pool, &[], 5, &mut rng);
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn no_interests_draws_exactly_target_from_pool() {
        let pool: Vec<Challenge> = (1..=10).map(|id| challenge(id, &[])).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let ids = select(&pool, &[profile(&[]), profile(&[])], 5, &mut rng);

        assert_eq!(ids.len(), 5);
        let distinct: BTreeSet<u32> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), 5);
        assert!(ids.iter().all(|id| (1..=10).contains(id)));
    }

    #[test]
    fn every_declared_tag_gets_a_representative() {
        let pool = vec![
            challenge(1, &["food"]),
            challenge(2, &["food"]),
            challenge(3, &["food"]),
            challenge(4, &["art"]),
            challenge(5, &["nature"]),
            challenge(6, &[]),
            challenge(7, &[]),
        ];
        // Two food-lovers outvote the art and nature singletons.
        let profiles = vec![
            profile(&["food"]),
            profile(&["food"]),
            profile(&["art"]),
            profile(&["nature"]),
        ];

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ids = select(&pool, &profiles, 3, &mut rng);
            assert_eq!(ids.len(), 3);
            assert!(ids.contains(&4), "art starved at seed {seed}: {ids:?}");
            assert!(ids.contains(&5), "nature starved at seed {seed}: {ids:?}");
        }
    }

    #[test]
    fn fill_pass_prefers_higher_scores() {
        let pool = vec![
            challenge(1, &["food", "art"]),
            challenge(2, &["food"]),
            challenge(3, &[]),
            challenge(4, &[]),
            challenge(5, &[]),
        ];
        let profiles = vec![profile(&["food"]), profile(&["food"]), profile(&["art"])];

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ids = select(&pool, &profiles, 2, &mut rng);
            ids.sort_unstable();
            // Challenge 1 covers both tags in the diversity pass; the fill
            // pass then takes 2 over every untagged challenge.
            assert_eq!(ids, vec![1, 2], "seed {seed}");
        }
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let pool: Vec<Challenge> = (1..=30).map(|id| challenge(id, &[])).collect();
        let first = select(&pool, &[], 15, &mut StdRng::seed_from_u64(99));
        let second = select(&pool, &[], 15, &mut StdRng::seed_from_u64(99));
        assert_eq!(first, second);
    }

    #[test]
    fn replace_in_place_preserves_untouched_positions() {
        let mut selection = vec![10, 11, 12, 13, 14];
        replace_in_place(&mut selection, &[11, 13], &[20, 21]);
        assert_eq!(selection, vec![10, 20, 12, 21, 14]);
    }
}
