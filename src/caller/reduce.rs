use super::allele::{AlleleKind, CandidateAllele, Observation};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ReduceParams {
    pub min_mapq: u8,
    pub min_baseq: u8,
    pub min_alt_count: usize,
    pub min_alt_fraction: f64,
}

/// Candidate alleles and per-sample observation groups for one locus.
/// Samples are listed in lexicographic order; candidates in order of
/// first appearance in the observation stream.
#[derive(Debug)]
pub struct ReducedLocus<'a> {
    pub candidates: Vec<CandidateAllele>,
    pub samples: Vec<(&'a str, Vec<&'a Observation>)>,
}

/// Reduces a locus's observations to the candidate alleles worth
/// evaluating. Returns None when no observation survives the kind filter
/// or when fewer than two candidates qualify, since a single hypothesis
/// carries no evidence of variation.
pub fn reduce<'a>(
    observations: &'a [Observation],
    allowed_kinds: &[AlleleKind],
    params: &ReduceParams,
) -> Option<ReducedLocus<'a>> {
    let observations: Vec<&Observation> = observations
        .iter()
        .filter(|obs| allowed_kinds.contains(&obs.kind))
        .collect();

    if observations.is_empty() {
        return None;
    }

    let groups = group_equivalent(&observations);

    // A group becomes a candidate only if some member clears both the
    // mapping and base quality floors; the first such member seeds it.
    let mut candidates = Vec::new();
    for group in &groups {
        if let Some(seed) = group
            .iter()
            .find(|obs| obs.map_quality >= params.min_mapq && obs.current_quality() >= params.min_baseq)
        {
            candidates.push(CandidateAllele::from_observation(seed));
        }
    }

    let samples = group_by_sample(&observations);

    let candidates: Vec<CandidateAllele> = candidates
        .into_iter()
        .filter(|candidate| has_sufficient_support(candidate, &samples, params))
        .collect();

    if candidates.len() < 2 {
        return None;
    }

    Some(ReducedLocus {
        candidates,
        samples: samples.into_iter().collect(),
    })
}

/// Partitions observations into equivalence groups, preserving the order
/// in which each group first appears.
fn group_equivalent<'a>(observations: &[&'a Observation]) -> Vec<Vec<&'a Observation>> {
    let mut groups: Vec<Vec<&Observation>> = Vec::new();
    for obs in observations {
        match groups
            .iter_mut()
            .find(|group| group[0].is_equivalent(obs))
        {
            Some(group) => group.push(obs),
            None => groups.push(vec![obs]),
        }
    }
    groups
}

fn group_by_sample<'a>(
    observations: &[&'a Observation],
) -> BTreeMap<&'a str, Vec<&'a Observation>> {
    let mut samples: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        samples.entry(obs.sample.as_str()).or_default().push(obs);
    }
    samples
}

/// A candidate is kept when at least one sample supports it with enough
/// observations, in both absolute count and as a fraction of that
/// sample's coverage.
fn has_sufficient_support(
    candidate: &CandidateAllele,
    samples: &BTreeMap<&str, Vec<&Observation>>,
    params: &ReduceParams,
) -> bool {
    for observations in samples.values() {
        let allele_count = observations
            .iter()
            .filter(|obs| obs.matches_candidate(candidate))
            .count();
        if allele_count >= params.min_alt_count
            && allele_count as f64 / observations.len() as f64 >= params.min_alt_fraction
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNP_KINDS: [AlleleKind; 2] = [AlleleKind::Reference, AlleleKind::Snp];

    fn params() -> ReduceParams {
        ReduceParams {
            min_mapq: 30,
            min_baseq: 20,
            min_alt_count: 1,
            min_alt_fraction: 0.0,
        }
    }

    fn obs(kind: AlleleKind, base: &str, baseq: u8, mapq: u8, sample: &str) -> Observation {
        Observation::new(kind, base, 1, mapq, vec![baseq], sample)
    }

    fn pileup(bases: &[(&str, usize)], sample: &str) -> Vec<Observation> {
        let mut observations = Vec::new();
        for (base, count) in bases {
            let kind = if *base == "A" {
                AlleleKind::Reference
            } else {
                AlleleKind::Snp
            };
            for _ in 0..*count {
                observations.push(obs(kind, base, 30, 60, sample));
            }
        }
        observations
    }

    #[test]
    fn disallowed_kinds_are_dropped() {
        let mut observations = pileup(&[("A", 5), ("G", 5)], "s1");
        observations.push(Observation::new(
            AlleleKind::Insertion,
            "GGA",
            3,
            60,
            vec![30; 3],
            "s1",
        ));
        observations.push(obs(AlleleKind::Null, "N", 30, 60, "s1"));

        let reduced = reduce(&observations, &SNP_KINDS, &params()).unwrap();
        assert_eq!(reduced.candidates.len(), 2);
        assert_eq!(reduced.samples[0].1.len(), 10);
    }

    #[test]
    fn all_observations_filtered_skips_locus() {
        let observations = vec![Observation::new(
            AlleleKind::Deletion,
            "",
            2,
            60,
            vec![],
            "s1",
        )];
        assert!(reduce(&observations, &SNP_KINDS, &params()).is_none());
    }

    #[test]
    fn single_candidate_skips_locus() {
        let observations = pileup(&[("A", 20)], "s1");
        assert!(reduce(&observations, &SNP_KINDS, &params()).is_none());
    }

    #[test]
    fn low_quality_group_yields_no_candidate() {
        let mut observations = pileup(&[("A", 10)], "s1");
        // every G observation is below the base quality floor
        for _ in 0..5 {
            observations.push(obs(AlleleKind::Snp, "G", 5, 60, "s1"));
        }
        assert!(reduce(&observations, &SNP_KINDS, &params()).is_none());
    }

    #[test]
    fn one_qualifying_observation_seeds_the_group() {
        let mut observations = pileup(&[("A", 10)], "s1");
        for _ in 0..5 {
            observations.push(obs(AlleleKind::Snp, "G", 5, 60, "s1"));
        }
        observations.push(obs(AlleleKind::Snp, "G", 30, 60, "s1"));

        let reduced = reduce(&observations, &SNP_KINDS, &params()).unwrap();
        assert_eq!(reduced.candidates.len(), 2);
        assert_eq!(reduced.candidates[1].base, "G");
    }

    #[test]
    fn min_alt_count_drops_singleton_candidates() {
        let mut observations = pileup(&[("A", 20)], "s1");
        observations.push(obs(AlleleKind::Snp, "C", 30, 60, "s1"));

        let mut strict = params();
        strict.min_alt_count = 2;
        assert!(reduce(&observations, &SNP_KINDS, &strict).is_none());

        let lenient = params();
        let reduced = reduce(&observations, &SNP_KINDS, &lenient).unwrap();
        assert_eq!(reduced.candidates.len(), 2);
    }

    #[test]
    fn min_alt_fraction_drops_rare_candidates() {
        let mut observations = pileup(&[("A", 99)], "s1");
        observations.push(obs(AlleleKind::Snp, "C", 30, 60, "s1"));

        let mut strict = params();
        strict.min_alt_fraction = 0.1;
        assert!(reduce(&observations, &SNP_KINDS, &strict).is_none());
    }

    #[test]
    fn support_in_a_single_sample_suffices() {
        let mut observations = pileup(&[("A", 50)], "s1");
        observations.extend(pileup(&[("A", 5), ("T", 5)], "s2"));

        let mut p = params();
        p.min_alt_count = 3;
        p.min_alt_fraction = 0.25;
        let reduced = reduce(&observations, &SNP_KINDS, &p).unwrap();
        assert_eq!(reduced.candidates.len(), 2);
        assert_eq!(reduced.samples.len(), 2);
        assert_eq!(reduced.samples[0].0, "s1");
        assert_eq!(reduced.samples[1].0, "s2");
    }

    #[test]
    fn candidates_keep_first_appearance_order() {
        let mut observations = vec![obs(AlleleKind::Snp, "T", 30, 60, "s1")];
        observations.extend(pileup(&[("A", 5)], "s1"));
        observations.push(obs(AlleleKind::Snp, "G", 30, 60, "s1"));

        let reduced = reduce(&observations, &SNP_KINDS, &params()).unwrap();
        let bases: Vec<&str> = reduced.candidates.iter().map(|c| c.base.as_str()).collect();
        assert_eq!(bases, vec!["T", "A", "G"]);
    }
}
