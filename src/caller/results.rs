use super::allele::Observation;
use super::combo::GenotypeCombo;
use super::genotype::{GenotypeId, GenotypeTable};
use std::collections::HashMap;

/// Per-sample view of one locus: the data likelihoods and the marginal
/// genotype posteriors accumulated over every scored combo.
#[derive(Debug)]
pub struct SampleResult {
    pub sample: String,
    /// (genotype, log-likelihood), descending.
    pub data_likelihoods: Vec<(GenotypeId, f64)>,
    /// Unnormalized log posterior contributions per genotype; nonempty
    /// exactly for genotypes that appeared in some scored combo.
    pub raw_marginals: HashMap<GenotypeId, Vec<f64>>,
    /// Normalized log marginal posterior per genotype.
    pub marginals: HashMap<GenotypeId, f64>,
    /// The observations this sample contributed at the locus.
    pub observations: Vec<Observation>,
}

impl SampleResult {
    pub fn new(
        sample: String,
        data_likelihoods: Vec<(GenotypeId, f64)>,
        observations: Vec<Observation>,
    ) -> Self {
        SampleResult {
            sample,
            data_likelihoods,
            raw_marginals: HashMap::new(),
            marginals: HashMap::new(),
            observations,
        }
    }

    pub fn coverage(&self) -> usize {
        self.observations.len()
    }

    /// Highest-marginal genotype; ties resolve to the lowest handle so
    /// the choice is independent of map iteration order.
    pub fn best_marginal(&self) -> (GenotypeId, f64) {
        let mut entries: Vec<(GenotypeId, f64)> =
            self.marginals.iter().map(|(id, lp)| (*id, *lp)).collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        entries[0]
    }
}

/// Everything the emission layer needs for one called locus.
#[derive(Debug)]
pub struct LocusCall {
    pub contig: String,
    /// 0-based reference position.
    pub position: u64,
    pub ref_base: String,
    pub table: GenotypeTable,
    pub best_combo: GenotypeCombo,
    pub best_combo_prob: f64,
    pub combos_tested: usize,
    pub coverage: usize,
    /// Log-space posterior normalizer.
    pub log_normalizer: f64,
    /// Ewens sampling probability of the best combo's allele spectrum.
    pub ewens_probability: f64,
    pub p_variant: f64,
    /// Ordered by sample name.
    pub samples: Vec<SampleResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_marginal_breaks_ties_by_handle() {
        let mut result = SampleResult::new("s1".to_string(), vec![], vec![]);
        result.marginals.insert(2, -0.5);
        result.marginals.insert(0, -0.5);
        result.marginals.insert(1, -3.0);
        assert_eq!(result.best_marginal(), (0, -0.5));
    }
}
