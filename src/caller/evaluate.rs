use super::allele::AlleleKind;
use super::combo::enumerate_combos;
use super::genotype::GenotypeTable;
use super::likelihood::{genotype_likelihoods, sort_likelihoods};
use super::pileup::LocusPileup;
use super::posterior::{aggregate, combo_sampling_probability};
use super::reduce::{reduce, ReduceParams};
use super::results::{LocusCall, SampleResult};

#[derive(Debug, Clone)]
pub struct CallParams {
    pub ploidy: usize,
    pub min_mapq: u8,
    pub min_baseq: u8,
    pub min_alt_count: usize,
    pub min_alt_fraction: f64,
    pub theta: f64,
    pub bandwidth: usize,
    pub banddepth: usize,
}

/// Only point alleles enter genotyping; indel and null observations are
/// dropped during reduction.
const ALLOWED_KINDS: [AlleleKind; 2] = [AlleleKind::Reference, AlleleKind::Snp];

/// Runs the full per-locus pipeline: reduction, genotype enumeration,
/// per-sample data likelihoods, banded combo search, and posterior
/// aggregation. Returns None for loci with nothing to evaluate; the
/// stream continues.
pub fn evaluate(locus: &LocusPileup, params: &CallParams) -> Option<LocusCall> {
    let reduce_params = ReduceParams {
        min_mapq: params.min_mapq,
        min_baseq: params.min_baseq,
        min_alt_count: params.min_alt_count,
        min_alt_fraction: params.min_alt_fraction,
    };

    let reduced = match reduce(&locus.observations, &ALLOWED_KINDS, &reduce_params) {
        Some(reduced) => reduced,
        None => {
            log::debug!(
                "{}:{}: no candidate variation",
                locus.contig,
                locus.position + 1
            );
            return None;
        }
    };

    let coverage = reduced.samples.iter().map(|(_, obs)| obs.len()).sum();
    let table = GenotypeTable::new(params.ploidy, reduced.candidates.clone());

    let mut samples = Vec::with_capacity(reduced.samples.len());
    let mut likelihoods = Vec::with_capacity(reduced.samples.len());
    let mut sorted = Vec::with_capacity(reduced.samples.len());
    for (name, observations) in &reduced.samples {
        let sample_likelihoods = genotype_likelihoods(observations, &table);
        let sample_sorted = sort_likelihoods(&sample_likelihoods);
        samples.push(SampleResult::new(
            name.to_string(),
            sample_sorted.clone(),
            observations.iter().map(|obs| (*obs).clone()).collect(),
        ));
        likelihoods.push(sample_likelihoods);
        sorted.push(sample_sorted);
    }

    let combos = enumerate_combos(
        &sorted,
        &likelihoods,
        &table,
        params.bandwidth,
        params.banddepth,
    );
    if combos.is_empty() {
        log::warn!(
            "{}:{}: no genotype hypotheses to evaluate",
            locus.contig,
            locus.position + 1
        );
        return None;
    }
    let combos_tested = combos.len();

    let posterior = match aggregate(combos, &table, params.theta, &mut samples) {
        Some(posterior) => posterior,
        None => {
            log::warn!(
                "{}:{}: all genotype hypotheses underflowed",
                locus.contig,
                locus.position + 1
            );
            return None;
        }
    };

    let best_combo = posterior.best().0.clone();
    let best_combo_prob = posterior.best_probability();
    let ewens_probability = combo_sampling_probability(&best_combo, &table, params.theta);

    Some(LocusCall {
        contig: locus.contig.clone(),
        position: locus.position,
        ref_base: locus.ref_base.clone(),
        table,
        best_combo,
        best_combo_prob,
        combos_tested,
        coverage,
        log_normalizer: posterior.log_normalizer,
        ewens_probability,
        p_variant: posterior.p_variant,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::allele::Observation;
    use crate::utils::{multiset_count, safe_exp};

    fn params() -> CallParams {
        CallParams {
            ploidy: 2,
            min_mapq: 0,
            min_baseq: 0,
            min_alt_count: 1,
            min_alt_fraction: 0.0,
            theta: 0.001,
            bandwidth: 2,
            banddepth: 2,
        }
    }

    fn locus(ref_base: &str, pileup: &[(&str, usize, u8, &str)]) -> LocusPileup {
        let mut observations = Vec::new();
        for (base, count, quality, sample) in pileup {
            let kind = if base == &ref_base {
                AlleleKind::Reference
            } else {
                AlleleKind::Snp
            };
            for _ in 0..*count {
                observations.push(Observation::new(kind, *base, 1, 60, vec![*quality], *sample));
            }
        }
        LocusPileup {
            contig: "chr1".to_string(),
            position: 999,
            ref_base: ref_base.to_string(),
            observations,
        }
    }

    fn best_label(call: &LocusCall, sample: usize) -> String {
        let (id, _) = call.samples[sample].best_marginal();
        call.table.label(id)
    }

    #[test]
    fn all_reference_pileup_is_skipped() {
        let locus = locus("A", &[("A", 20, 30, "s1")]);
        assert!(evaluate(&locus, &params()).is_none());
    }

    #[test]
    fn reference_pileup_with_trace_alt_is_nearly_invariant() {
        let locus = locus("A", &[("A", 20, 30, "s1"), ("G", 1, 30, "s1")]);
        let call = evaluate(&locus, &params()).unwrap();
        assert!(call.p_variant < 1e-3, "p_variant = {}", call.p_variant);
        assert_eq!(best_label(&call, 0), "A/A");
    }

    #[test]
    fn balanced_heterozygote_is_called() {
        let locus = locus("A", &[("A", 10, 30, "s1"), ("G", 10, 30, "s1")]);
        let call = evaluate(&locus, &params()).unwrap();

        assert_eq!(call.table.candidates.len(), 2);
        assert_eq!(call.table.len(), 3);
        assert_eq!(best_label(&call, 0), "A/G");
        let (id, log_marginal) = call.samples[0].best_marginal();
        assert_eq!(call.table.label(id), "A/G");
        assert!(safe_exp(log_marginal) > 0.99);
        assert!(call.p_variant > 0.99);
        assert_eq!(call.coverage, 20);
    }

    #[test]
    fn disagreeing_homozygotes_across_samples() {
        let locus = locus("A", &[("A", 20, 30, "s1"), ("T", 20, 30, "s2")]);
        let call = evaluate(&locus, &params()).unwrap();

        assert_eq!(call.samples.len(), 2);
        assert_eq!(best_label(&call, 0), "A/A");
        assert_eq!(best_label(&call, 1), "T/T");

        let combo_labels: Vec<String> = call
            .best_combo
            .genotypes
            .iter()
            .map(|&(id, _)| call.table.label(id))
            .collect();
        assert_eq!(combo_labels, vec!["A/A", "T/T"]);
        assert!(call.p_variant > 0.999);

        // the emitted alternate is T
        let (id, _) = call.samples[1].best_marginal();
        let alts = call.table.alternate_alleles(id, "A");
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0].base, "T");
    }

    #[test]
    fn noise_candidate_is_dropped_by_min_alt_count() {
        let locus = locus("A", &[("A", 20, 30, "s1"), ("C", 1, 5, "s1")]);

        let mut strict = params();
        strict.min_alt_count = 2;
        assert!(evaluate(&locus, &strict).is_none());

        let call = evaluate(&locus, &params()).unwrap();
        assert_eq!(best_label(&call, 0), "A/A");
        assert!(call.p_variant < 0.05);
    }

    #[test]
    fn low_quality_alt_flips_the_call_to_reference() {
        let high = locus("A", &[("A", 10, 30, "s1"), ("G", 10, 30, "s1")]);
        let high_call = evaluate(&high, &params()).unwrap();
        assert!(high_call.p_variant > 0.99);

        let low = locus("A", &[("A", 10, 30, "s1"), ("G", 10, 3, "s1")]);
        let low_call = evaluate(&low, &params()).unwrap();
        assert!(low_call.p_variant < 0.5, "p_variant = {}", low_call.p_variant);
        assert_eq!(best_label(&low_call, 0), "A/A");
    }

    #[test]
    fn larger_theta_raises_the_heterozygote_sampling_probability() {
        let pileup = [("A", 10, 30, "s1"), ("G", 10, 30, "s1")];

        let mut low_theta = params();
        low_theta.theta = 0.001;
        let low = evaluate(&locus("A", &pileup), &low_theta).unwrap();

        let mut high_theta = params();
        high_theta.theta = 0.1;
        let high = evaluate(&locus("A", &pileup), &high_theta).unwrap();

        assert_eq!(best_label(&low, 0), "A/G");
        assert_eq!(best_label(&high, 0), "A/G");
        assert!(high.ewens_probability > low.ewens_probability);
    }

    #[test]
    fn marginals_sum_to_one_for_every_sample() {
        let locus = locus(
            "A",
            &[
                ("A", 12, 30, "s1"),
                ("G", 9, 25, "s1"),
                ("A", 7, 30, "s2"),
                ("T", 6, 20, "s2"),
                ("G", 3, 15, "s2"),
            ],
        );
        let call = evaluate(&locus, &params()).unwrap();
        assert!(call.p_variant >= 0.0 && call.p_variant <= 1.0 + 1e-9);
        for sample in &call.samples {
            let total: f64 = sample.marginals.values().map(|lp| safe_exp(*lp)).sum();
            assert!((total - 1.0).abs() < 1e-9, "sample {}: {}", sample.sample, total);
        }
    }

    #[test]
    fn genotype_space_size_matches_the_candidate_count() {
        let locus = locus(
            "A",
            &[
                ("A", 10, 30, "s1"),
                ("C", 10, 30, "s1"),
                ("G", 10, 30, "s1"),
                ("T", 10, 30, "s1"),
            ],
        );
        for ploidy in [1, 2, 3] {
            let mut p = params();
            p.ploidy = ploidy;
            let call = evaluate(&locus, &p).unwrap();
            assert_eq!(call.table.len(), multiset_count(4, ploidy));
        }
    }

    // candidate indexing depends on first appearance, so labels are
    // compared as base multisets
    fn canonical(label: &str) -> String {
        let mut bases: Vec<&str> = label.split('/').collect();
        bases.sort_unstable();
        bases.join("/")
    }

    #[test]
    fn observation_order_does_not_change_the_posterior() {
        let forward = locus("A", &[("A", 10, 30, "s1"), ("G", 10, 30, "s1")]);
        let reversed = locus("A", &[("G", 10, 30, "s1"), ("A", 10, 30, "s1")]);

        let fwd = evaluate(&forward, &params()).unwrap();
        let rev = evaluate(&reversed, &params()).unwrap();

        assert!((fwd.p_variant - rev.p_variant).abs() < 1e-9);
        assert_eq!(
            canonical(&best_label(&fwd, 0)),
            canonical(&best_label(&rev, 0))
        );
        assert!((fwd.log_normalizer - rev.log_normalizer).abs() < 1e-9);
    }

    #[test]
    fn renaming_samples_permutes_results_without_changing_them() {
        let original = locus("A", &[("A", 20, 30, "s1"), ("T", 20, 30, "s2")]);
        // same pileup with the sample names exchanged
        let renamed = locus("A", &[("A", 20, 30, "s2"), ("T", 20, 30, "s1")]);

        let a = evaluate(&original, &params()).unwrap();
        let b = evaluate(&renamed, &params()).unwrap();

        assert!((a.p_variant - b.p_variant).abs() < 1e-9);
        assert!((a.log_normalizer - b.log_normalizer).abs() < 1e-9);
        assert_eq!(canonical(&best_label(&a, 0)), canonical(&best_label(&b, 1)));
        assert_eq!(canonical(&best_label(&a, 1)), canonical(&best_label(&b, 0)));
        assert!(
            (a.samples[0].best_marginal().1 - b.samples[1].best_marginal().1).abs() < 1e-9
        );
    }

    #[test]
    fn repeated_evaluation_is_deterministic() {
        let pileup = [
            ("A", 12, 30, "s1"),
            ("G", 9, 25, "s1"),
            ("T", 6, 20, "s2"),
            ("A", 7, 30, "s2"),
        ];
        let first = evaluate(&locus("A", &pileup), &params()).unwrap();
        let second = evaluate(&locus("A", &pileup), &params()).unwrap();

        assert_eq!(first.p_variant.to_bits(), second.p_variant.to_bits());
        assert_eq!(first.log_normalizer.to_bits(), second.log_normalizer.to_bits());
        assert_eq!(first.combos_tested, second.combos_tested);
        for (a, b) in first.samples.iter().zip(second.samples.iter()) {
            assert_eq!(a.best_marginal().0, b.best_marginal().0);
            assert_eq!(
                a.best_marginal().1.to_bits(),
                b.best_marginal().1.to_bits()
            );
        }
    }

    #[test]
    fn haploid_samples_with_different_alleles_show_variation() {
        let mut p = params();
        p.ploidy = 1;
        let locus = locus("A", &[("G", 20, 30, "s1"), ("A", 20, 30, "s2")]);
        let call = evaluate(&locus, &p).unwrap();
        assert_eq!(call.table.len(), 2);
        assert_eq!(best_label(&call, 0), "G");
        assert_eq!(best_label(&call, 1), "A");
        assert!(call.p_variant > 0.99);
    }

    #[test]
    fn a_single_haploid_sample_cannot_show_variation() {
        // every one-sample haploid combo is a shared homozygote, so the
        // posterior mass of "no variation" is the whole space
        let mut p = params();
        p.ploidy = 1;
        let locus = locus("A", &[("A", 2, 30, "s1"), ("G", 18, 30, "s1")]);
        let call = evaluate(&locus, &p).unwrap();
        assert_eq!(best_label(&call, 0), "G");
        assert!(call.p_variant < 1e-6);
    }
}
