use std::collections::BTreeSet;

use contracts::Challenge;
use hunt_core::selector::select;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const TAGS: [&str; 5] = ["food", "art", "nature", "history", "sports"];

fn arb_challenge(id: u32) -> impl Strategy<Value = Challenge> {
    proptest::collection::btree_set(proptest::sample::select(TAGS.to_vec()), 0..3).prop_map(
        move |tags| Challenge {
            id,
            caption: format!("challenge {id}"),
            image_url: format!("/img/{id}.jpg"),
            interest_tags: tags.into_iter().map(str::to_string).collect(),
            placeholder: false,
        },
    )
}

fn arb_pool(max: usize) -> impl Strategy<Value = Vec<Challenge>> {
    (1..=max).prop_flat_map(|len| {
        (0..len)
            .map(|index| arb_challenge(index as u32 + 1))
            .collect::<Vec<_>>()
    })
}

fn arb_profiles() -> impl Strategy<Value = Vec<BTreeSet<String>>> {
    proptest::collection::vec(
        proptest::collection::btree_set(proptest::sample::select(TAGS.to_vec()), 0..4)
            .prop_map(|tags| tags.into_iter().map(str::to_string).collect()),
        0..5,
    )
}

proptest! {
    #[test]
    fn selection_size_and_membership(
        pool in arb_pool(40),
        profiles in arb_profiles(),
        target in 1usize..20,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let ids = select(&pool, &profiles, target, &mut rng);

        let pool_ids: BTreeSet<u32> = pool.iter().map(|challenge| challenge.id).collect();
        let distinct: BTreeSet<u32> = ids.iter().copied().collect();

        prop_assert_eq!(distinct.len(), ids.len(), "selection must be duplicate-free");
        prop_assert!(distinct.is_subset(&pool_ids), "selection must come from the pool");

        if target <= pool.len() {
            prop_assert_eq!(ids.len(), target);
        } else {
            prop_assert_eq!(ids.len(), pool.len(), "undersized pool returns everything");
        }
    }

    #[test]
    fn every_representable_tag_is_represented(
        pool in arb_pool(40),
        profiles in arb_profiles(),
        seed in any::<u64>(),
    ) {
        let declared: BTreeSet<&str> = profiles
            .iter()
            .flat_map(|profile| profile.iter().map(String::as_str))
            .collect();

        // The diversity guarantee applies when the pool can carry every
        // declared tag and the target leaves room for each.
        let representable = declared.iter().all(|tag| {
            pool.iter().any(|challenge| challenge.interest_tags.contains(*tag))
        });
        prop_assume!(representable && !declared.is_empty());

        let target = declared.len().max(1).min(pool.len());
        prop_assume!(target >= declared.len());

        let mut rng = StdRng::seed_from_u64(seed);
        let ids = select(&pool, &profiles, target, &mut rng);
        let selected: Vec<&Challenge> = pool
            .iter()
            .filter(|challenge| ids.contains(&challenge.id))
            .collect();

        for tag in &declared {
            prop_assert!(
                selected.iter().any(|challenge| challenge.interest_tags.contains(*tag)),
                "tag {} has no representative in {:?}",
                tag,
                ids
            );
        }
    }

    #[test]
    fn selection_is_deterministic_per_seed(
        pool in arb_pool(30),
        profiles in arb_profiles(),
        target in 1usize..15,
        seed in any::<u64>(),
    ) {
        let first = select(&pool, &profiles, target, &mut StdRng::seed_from_u64(seed));
        let second = select(&pool, &profiles, target, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(first, second);
    }
}
