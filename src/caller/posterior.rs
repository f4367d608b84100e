use super::combo::GenotypeCombo;
use super::genotype::{count_frequencies, Genotype, GenotypeTable};
use super::prior::ewens_log_prior;
use super::results::SampleResult;
use crate::utils::{log_sum_exp, safe_exp};

/// Scored joint hypotheses for one locus, sorted by posterior.
#[derive(Debug)]
pub struct LocusPosterior {
    /// (combo, unnormalized log posterior), descending; ties keep
    /// enumeration order.
    pub combos: Vec<(GenotypeCombo, f64)>,
    pub log_normalizer: f64,
    pub p_variant: f64,
}

impl LocusPosterior {
    pub fn best(&self) -> &(GenotypeCombo, f64) {
        &self.combos[0]
    }

    pub fn best_probability(&self) -> f64 {
        safe_exp(self.combos[0].1 - self.log_normalizer)
    }
}

/// Scores every combo (Ewens prior plus summed data likelihoods),
/// normalizes in log space, accumulates the per-sample genotype
/// marginals, and derives P(variant) as one minus the posterior mass of
/// the combos where all samples share one homozygous genotype.
///
/// Returns None when there is nothing to score or every posterior
/// underflows to -inf; the caller skips such loci.
pub fn aggregate(
    combos: Vec<GenotypeCombo>,
    table: &GenotypeTable,
    theta: f64,
    samples: &mut [SampleResult],
) -> Option<LocusPosterior> {
    if combos.is_empty() {
        return None;
    }

    let mut scored: Vec<(GenotypeCombo, f64)> = Vec::with_capacity(combos.len());
    for combo in combos {
        let genotypes: Vec<&Genotype> = combo
            .genotypes
            .iter()
            .map(|&(id, _)| table.genotype(id))
            .collect();
        let log_prior = ewens_log_prior(&count_frequencies(&genotypes), theta);
        let log_posterior = log_prior + combo.log_likelihood();

        for (sample, &(id, _)) in samples.iter_mut().zip(combo.genotypes.iter()) {
            sample
                .raw_marginals
                .entry(id)
                .or_default()
                .push(log_posterior);
        }

        scored.push((combo, log_posterior));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let posteriors: Vec<f64> = scored.iter().map(|(_, lp)| *lp).collect();
    let log_normalizer = log_sum_exp(&posteriors);
    if log_normalizer == f64::NEG_INFINITY {
        return None;
    }

    for sample in samples.iter_mut() {
        for (id, raw) in &sample.raw_marginals {
            sample
                .marginals
                .insert(*id, log_sum_exp(raw) - log_normalizer);
        }
    }

    let mut p_variant = 1.0;
    for (combo, log_posterior) in &scored {
        if combo.is_homozygous(table) {
            p_variant -= safe_exp(log_posterior - log_normalizer);
        }
    }
    let p_variant = p_variant.clamp(0.0, 1.0);

    Some(LocusPosterior {
        combos: scored,
        log_normalizer,
        p_variant,
    })
}

/// Ewens sampling probability of one combo's allele spectrum.
pub fn combo_sampling_probability(
    combo: &GenotypeCombo,
    table: &GenotypeTable,
    theta: f64,
) -> f64 {
    let genotypes: Vec<&Genotype> = combo
        .genotypes
        .iter()
        .map(|&(id, _)| table.genotype(id))
        .collect();
    safe_exp(ewens_log_prior(&count_frequencies(&genotypes), theta))
}
