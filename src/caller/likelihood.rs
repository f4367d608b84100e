use super::allele::Observation;
use super::genotype::{GenotypeId, GenotypeTable};

/// log P(observations | genotype) for every genotype in the table, in
/// enumeration order.
///
/// Each observation is modeled as a draw from the genotype's allele
/// copies, chosen uniformly: a copy emits the observed base with
/// probability 1 - e and any given other base with e/3, where
/// e = 10^(-Q/10) for the observation's base quality Q. The
/// per-observation mean over copies is bounded below by e/3k, so it is
/// formed in linear space and only its log enters the running sum.
pub fn genotype_likelihoods(
    observations: &[&Observation],
    table: &GenotypeTable,
) -> Vec<(GenotypeId, f64)> {
    let ploidy = table.ploidy as f64;

    table
        .genotypes
        .iter()
        .enumerate()
        .map(|(id, genotype)| {
            let mut log_likelihood = 0.0;
            for obs in observations {
                let error = error_probability(obs.current_quality());
                let mut mixture = 0.0;
                for (allele_index, count) in genotype.distinct_counts() {
                    let emission = if table.candidates[allele_index].base == obs.base {
                        1.0 - error
                    } else {
                        error / 3.0
                    };
                    mixture += emission * count as f64;
                }
                log_likelihood += (mixture / ploidy).ln();
            }
            (id, log_likelihood)
        })
        .collect()
}

/// Likelihoods sorted descending; ties keep enumeration order.
pub fn sort_likelihoods(likelihoods: &[(GenotypeId, f64)]) -> Vec<(GenotypeId, f64)> {
    let mut sorted = likelihoods.to_vec();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

fn error_probability(quality: u8) -> f64 {
    10f64.powf(-f64::from(quality) / 10.0)
}
