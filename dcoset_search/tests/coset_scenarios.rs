//! End-to-end scenarios for the double-coset engine: pinned coset
//! computations on small symmetric groups plus the engine's algebraic
//! properties.

use itertools::Itertools;
use quickcheck::quickcheck;
use rstest::rstest;

use dcoset_common::{PartitionStack, StabilizerChain};
use dcoset_search::sequences::{coset_eq, SequencePair};
use dcoset_search::{double_coset, SearchConfig, Workspace};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn rotation_coset_returns_the_pinned_witness() {
    init_tracing();
    let found = coset_eq(
        &[0, 1, 2, 3, 4, 5],
        &[1, 2, 3, 4, 5, 0],
        &[vec![1, 2, 3, 4, 5, 0]],
    )
    .unwrap()
    .expect("the rotation group carries perm1 onto perm2");
    assert_eq!(found.images(), &[5, 0, 1, 2, 3, 4]);
}

#[rstest]
#[case::cyclic_four(vec![vec![1, 2, 3, 0]], 6)]
#[case::klein(vec![vec![1, 0, 2, 3], vec![0, 1, 3, 2]], 6)]
#[case::cyclic_three(vec![vec![1, 2, 0, 3]], 8)]
fn bucketing_s4_into_cosets(#[case] gens: Vec<Vec<usize>>, #[case] expected: usize) {
    init_tracing();
    let mut reps: Vec<Vec<usize>> = Vec::new();
    for perm in (0..4usize).permutations(4) {
        let known = reps
            .iter()
            .any(|rep| coset_eq(&perm, rep, &gens).unwrap().is_some());
        if !known {
            reps.push(perm);
        }
    }
    assert_eq!(reps.len(), expected);
}

#[test]
fn degree_zero_is_never_isomorphic() {
    assert!(coset_eq(&[], &[], &[]).unwrap().is_none());

    let mut client = SequencePair::<i64>::new(&[], &[]);
    let found = double_coset(
        &mut client,
        &PartitionStack::unit(0),
        None,
        None,
        None,
        &SearchConfig::default(),
    )
    .unwrap();
    assert!(found.is_none());
}

#[test]
fn distinct_sequences_do_not_match_under_full_symmetric_group() {
    let s1 = [0i64, 1, 2];
    let s2 = [0i64, 1, 3];
    let mut client = SequencePair::new(&s1, &s2);
    let found = double_coset(
        &mut client,
        &PartitionStack::unit(3),
        None,
        None,
        None,
        &SearchConfig::default(),
    )
    .unwrap();
    assert!(found.is_none());
}

#[test]
fn repeated_values_match_past_a_failing_first_leaf() {
    // The identity pairing fails, so the engine must work through the
    // automorphisms of the right sequence to find a match.
    let s1 = [1i64, 1, 0];
    let s2 = [1i64, 0, 1];
    let mut client = SequencePair::new(&s1, &s2);
    let found = double_coset(
        &mut client,
        &PartitionStack::unit(3),
        None,
        None,
        None,
        &SearchConfig::default(),
    )
    .unwrap()
    .expect("the sequences are rearrangements of each other");
    for (i, &image) in found.images().iter().enumerate() {
        assert_eq!(s1[image], s2[i]);
    }
}

#[test]
fn trivial_group_admits_only_the_identity_ordering() {
    let s = [0i64, 1, 2];
    let trivial = StabilizerChain::from_generators(3, &[]).unwrap();

    let mut client = SequencePair::new(&s, &s);
    let found = double_coset(
        &mut client,
        &PartitionStack::unit(3),
        Some(&[1, 0, 2]),
        Some(&trivial),
        None,
        &SearchConfig::default(),
    )
    .unwrap();
    assert!(found.is_none());

    let mut client = SequencePair::new(&s, &s);
    let found = double_coset(
        &mut client,
        &PartitionStack::unit(3),
        Some(&[0, 1, 2]),
        Some(&trivial),
        None,
        &SearchConfig::default(),
    )
    .unwrap()
    .expect("the identity ordering matches the structure to itself");
    assert!(found.is_identity());
}

#[test]
fn subgroup_matches_survive_in_the_supergroup() {
    // H = <(0 1 2 3)> inside G = S_4.
    let h_gens = vec![vec![1usize, 2, 3, 0]];
    let g_gens = vec![vec![1usize, 0, 2, 3], vec![1usize, 2, 3, 0]];
    for perm in (0..4usize).permutations(4) {
        let rep = [0usize, 1, 2, 3];
        if coset_eq(&perm, &rep, &h_gens).unwrap().is_some() {
            assert!(
                coset_eq(&perm, &rep, &g_gens).unwrap().is_some(),
                "H-match for {perm:?} vanished in the supergroup"
            );
        }
    }
}

#[test]
fn matching_is_symmetric_in_the_two_structures() {
    let sequences: Vec<Vec<i64>> = vec![
        vec![0, 0, 1, 1],
        vec![1, 0, 1, 0],
        vec![0, 1, 2, 3],
        vec![2, 2, 2, 0],
    ];
    for (a, b) in sequences.iter().cartesian_product(&sequences) {
        let mut forward = SequencePair::new(a, b);
        let mut backward = SequencePair::new(b, a);
        let ps = PartitionStack::unit(4);
        let config = SearchConfig::default();
        let fwd = double_coset(&mut forward, &ps, None, None, None, &config).unwrap();
        let bwd = double_coset(&mut backward, &ps, None, None, None, &config).unwrap();
        assert_eq!(fwd.is_some(), bwd.is_some(), "asymmetry for {a:?} / {b:?}");
    }
}

#[test]
fn caller_supplied_workspace_is_reusable() {
    let config = SearchConfig::default();
    let mut workspace = Workspace::new(4, &config);
    let s1 = [0i64, 1, 1, 0];
    let s2 = [1i64, 0, 0, 1];
    let s3 = [1i64, 1, 1, 0];

    let mut client = SequencePair::new(&s1, &s2);
    let ps = PartitionStack::unit(4);
    let found = double_coset(&mut client, &ps, None, None, Some(&mut workspace), &config).unwrap();
    assert!(found.is_some());

    // A failing search right after a successful one must not inherit
    // stale pruning state.
    let mut client = SequencePair::new(&s1, &s3);
    let found = double_coset(&mut client, &ps, None, None, Some(&mut workspace), &config).unwrap();
    assert!(found.is_none());

    let mut client = SequencePair::new(&s1, &s2);
    let found = double_coset(&mut client, &ps, None, None, Some(&mut workspace), &config).unwrap();
    assert!(found.is_some());
}

quickcheck! {
    fn full_symmetric_matches_exactly_the_rearrangements(pairs: Vec<(u8, u8)>) -> bool {
        let n = pairs.len().min(6);
        let s1: Vec<i64> = pairs[..n].iter().map(|&(x, _)| i64::from(x % 4)).collect();
        let s2: Vec<i64> = pairs[..n].iter().map(|&(_, y)| i64::from(y % 4)).collect();
        if n == 0 {
            // Degenerate degree: the engine reports no isomorphism even
            // for two empty sequences.
            let mut client = SequencePair::new(&s1, &s2);
            return double_coset(
                &mut client,
                &PartitionStack::unit(0),
                None,
                None,
                None,
                &SearchConfig::default(),
            )
            .unwrap()
            .is_none();
        }
        let mut client = SequencePair::new(&s1, &s2);
        let found = double_coset(
            &mut client,
            &PartitionStack::unit(n),
            None,
            None,
            None,
            &SearchConfig::default(),
        )
        .unwrap();
        let rearrangement = {
            let mut a = s1.clone();
            let mut b = s2.clone();
            a.sort_unstable();
            b.sort_unstable();
            a == b
        };
        match found {
            Some(gamma) => {
                rearrangement
                    && gamma
                        .images()
                        .iter()
                        .enumerate()
                        .all(|(i, &image)| s1[image] == s2[i])
            }
            None => !rearrangement,
        }
    }

    fn reflexive_up_to_the_identity(values: Vec<u8>) -> bool {
        let n = values.len().min(6);
        let s: Vec<i64> = values[..n].iter().map(|&v| i64::from(v % 3)).collect();
        if n == 0 {
            return true;
        }
        let mut client = SequencePair::new(&s, &s);
        let found = double_coset(
            &mut client,
            &PartitionStack::unit(n),
            None,
            None,
            None,
            &SearchConfig::default(),
        )
        .unwrap();
        match found {
            Some(gamma) => gamma
                .images()
                .iter()
                .enumerate()
                .all(|(i, &image)| s[image] == s[i]),
            None => false,
        }
    }
}
