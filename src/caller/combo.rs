use super::genotype::{GenotypeId, GenotypeTable};
use std::collections::HashSet;

/// One joint assignment of genotypes to samples. Entry i holds the
/// genotype handle and data log-likelihood for the i-th sample of the
/// locus's lexicographic sample list.
#[derive(Debug, Clone)]
pub struct GenotypeCombo {
    pub genotypes: Vec<(GenotypeId, f64)>,
}

impl GenotypeCombo {
    pub fn log_likelihood(&self) -> f64 {
        self.genotypes.iter().map(|(_, ll)| ll).sum()
    }

    /// True when every sample carries the same single-allele genotype,
    /// i.e. the combo asserts no variation anywhere.
    pub fn is_homozygous(&self, table: &GenotypeTable) -> bool {
        let first = table.genotype(self.genotypes[0].0);
        if !first.is_homozygous() {
            return false;
        }
        let allele = first.allele_indices[0];
        self.genotypes.iter().all(|&(id, _)| {
            let genotype = table.genotype(id);
            genotype.is_homozygous() && genotype.allele_indices[0] == allele
        })
    }

    fn key(&self) -> Vec<GenotypeId> {
        self.genotypes.iter().map(|(id, _)| *id).collect()
    }
}

/// Builds the joint hypotheses to score: the band around the per-sample
/// best genotypes, plus the all-homozygous combo of every candidate
/// allele so the no-variation hypotheses are always represented.
///
/// The band starts from each sample's argmax genotype and admits, per
/// sample, any of its top-`bandwidth` genotypes, with at most
/// `banddepth` samples deviating from their argmax in any one combo.
pub fn enumerate_combos(
    sorted_likelihoods: &[Vec<(GenotypeId, f64)>],
    likelihoods: &[Vec<(GenotypeId, f64)>],
    table: &GenotypeTable,
    bandwidth: usize,
    banddepth: usize,
) -> Vec<GenotypeCombo> {
    let num_samples = sorted_likelihoods.len();
    let mut combos = Vec::new();
    let mut seen = HashSet::new();

    let mut ranks = vec![0usize; num_samples];
    banded_ranks(sorted_likelihoods, bandwidth, banddepth, 0, &mut ranks, &mut |ranks| {
        let combo = GenotypeCombo {
            genotypes: ranks
                .iter()
                .enumerate()
                .map(|(sample, &rank)| sorted_likelihoods[sample][rank])
                .collect(),
        };
        if seen.insert(combo.key()) {
            combos.push(combo);
        }
    });

    for allele_index in 0..table.candidates.len() {
        if let Some(id) = table.homozygous_id(allele_index) {
            let combo = GenotypeCombo {
                genotypes: (0..num_samples).map(|sample| likelihoods[sample][id]).collect(),
            };
            if seen.insert(combo.key()) {
                combos.push(combo);
            }
        }
    }

    combos
}

fn banded_ranks(
    sorted_likelihoods: &[Vec<(GenotypeId, f64)>],
    bandwidth: usize,
    depth_left: usize,
    sample: usize,
    ranks: &mut Vec<usize>,
    emit: &mut impl FnMut(&[usize]),
) {
    if sample == sorted_likelihoods.len() {
        emit(ranks);
        return;
    }
    let width = bandwidth.min(sorted_likelihoods[sample].len());
    for rank in 0..width {
        if rank > 0 && depth_left == 0 {
            break;
        }
        ranks[sample] = rank;
        let depth = if rank > 0 { depth_left - 1 } else { depth_left };
        banded_ranks(sorted_likelihoods, bandwidth, depth, sample + 1, ranks, emit);
    }
    ranks[sample] = 0;
}
