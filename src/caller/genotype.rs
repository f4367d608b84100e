use super::allele::CandidateAllele;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Stable handle for a genotype within one locus's table. Handles are
/// meaningless across loci.
pub type GenotypeId = usize;

/// A multiset of candidate alleles of size equal to the ploidy, stored as
/// a sorted list of candidate indices so equivalent multisets compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genotype {
    pub allele_indices: Vec<usize>,
}

impl Genotype {
    /// Distinct alleles with their multiplicities, in candidate order.
    pub fn distinct_counts(&self) -> Vec<(usize, usize)> {
        let mut counts = Vec::new();
        for &index in &self.allele_indices {
            match counts.last_mut() {
                Some((last, count)) if *last == index => *count += 1,
                _ => counts.push((index, 1)),
            }
        }
        counts
    }

    pub fn count_of(&self, allele_index: usize) -> usize {
        self.allele_indices
            .iter()
            .filter(|&&index| index == allele_index)
            .count()
    }

    pub fn is_homozygous(&self) -> bool {
        self.allele_indices
            .iter()
            .all(|&index| index == self.allele_indices[0])
    }
}

/// All genotypes for one locus: every multiset of the surviving candidate
/// alleles at the configured ploidy, C(n+k-1, k) in total.
#[derive(Debug)]
pub struct GenotypeTable {
    pub candidates: Vec<CandidateAllele>,
    pub genotypes: Vec<Genotype>,
    pub ploidy: usize,
}

impl GenotypeTable {
    pub fn new(ploidy: usize, candidates: Vec<CandidateAllele>) -> Self {
        let mut genotypes = Vec::new();
        let mut indices = Vec::with_capacity(ploidy);
        enumerate_multisets(candidates.len(), ploidy, 0, &mut indices, &mut genotypes);
        GenotypeTable {
            candidates,
            genotypes,
            ploidy,
        }
    }

    pub fn len(&self) -> usize {
        self.genotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genotypes.is_empty()
    }

    pub fn genotype(&self, id: GenotypeId) -> &Genotype {
        &self.genotypes[id]
    }

    /// Handle of the genotype carrying only the given candidate.
    pub fn homozygous_id(&self, allele_index: usize) -> Option<GenotypeId> {
        self.genotypes
            .iter()
            .position(|g| g.is_homozygous() && g.allele_indices[0] == allele_index)
    }

    /// Distinct alleles of the genotype whose base differs from the
    /// reference base.
    pub fn alternate_alleles(&self, id: GenotypeId, ref_base: &str) -> Vec<&CandidateAllele> {
        self.genotype(id)
            .distinct_counts()
            .iter()
            .map(|&(index, _)| &self.candidates[index])
            .filter(|allele| allele.base != ref_base)
            .collect()
    }

    /// Display form, e.g. "A/G" for a diploid heterozygote.
    pub fn label(&self, id: GenotypeId) -> String {
        self.genotype(id)
            .allele_indices
            .iter()
            .map(|&index| self.candidates[index].base.as_str())
            .join("/")
    }
}

fn enumerate_multisets(
    num_candidates: usize,
    remaining: usize,
    first: usize,
    indices: &mut Vec<usize>,
    out: &mut Vec<Genotype>,
) {
    if remaining == 0 {
        out.push(Genotype {
            allele_indices: indices.clone(),
        });
        return;
    }
    for index in first..num_candidates {
        indices.push(index);
        enumerate_multisets(num_candidates, remaining - 1, index, indices, out);
        indices.pop();
    }
}

/// Total copies of each allele across the genotypes of a combo.
pub fn allele_spectrum(genotypes: &[&Genotype]) -> BTreeMap<usize, usize> {
    let mut spectrum = BTreeMap::new();
    for genotype in genotypes {
        for &index in &genotype.allele_indices {
            *spectrum.entry(index).or_insert(0) += 1;
        }
    }
    spectrum
}

/// Count spectrum of a combo: multiplicity -> number of distinct alleles
/// observed with that multiplicity.
pub fn count_frequencies(genotypes: &[&Genotype]) -> BTreeMap<usize, usize> {
    let mut frequencies = BTreeMap::new();
    for count in allele_spectrum(genotypes).values() {
        *frequencies.entry(*count).or_insert(0) += 1;
    }
    frequencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::allele::AlleleKind;
    use crate::utils::multiset_count;

    fn candidates(bases: &[&str]) -> Vec<CandidateAllele> {
        bases
            .iter()
            .map(|base| CandidateAllele {
                kind: if *base == "A" {
                    AlleleKind::Reference
                } else {
                    AlleleKind::Snp
                },
                base: base.to_string(),
                length: 1,
            })
            .collect()
    }

    #[test]
    fn diploid_biallelic_table_has_three_genotypes() {
        let table = GenotypeTable::new(2, candidates(&["A", "G"]));
        let labels: Vec<String> = (0..table.len()).map(|id| table.label(id)).collect();
        assert_eq!(labels, vec!["A/A", "A/G", "G/G"]);
    }

    #[test]
    fn table_size_matches_multiset_count() {
        for (n, k) in [(2, 2), (3, 2), (4, 2), (2, 3), (3, 4)] {
            let bases = ["A", "C", "G", "T"];
            let table = GenotypeTable::new(k, candidates(&bases[..n]));
            assert_eq!(table.len(), multiset_count(n, k));
        }
    }

    #[test]
    fn homozygosity_and_counts() {
        let table = GenotypeTable::new(2, candidates(&["A", "G"]));
        let aa = table.homozygous_id(0).unwrap();
        let gg = table.homozygous_id(1).unwrap();
        assert!(table.genotype(aa).is_homozygous());
        assert!(table.genotype(gg).is_homozygous());
        assert_eq!(table.genotype(aa).count_of(0), 2);
        assert_eq!(table.genotype(aa).count_of(1), 0);

        let het = (0..table.len())
            .find(|&id| !table.genotype(id).is_homozygous())
            .unwrap();
        assert_eq!(table.genotype(het).count_of(0), 1);
        assert_eq!(table.genotype(het).count_of(1), 1);
        assert_eq!(table.genotype(het).distinct_counts(), vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn alternate_alleles_exclude_the_reference_base() {
        let table = GenotypeTable::new(2, candidates(&["A", "G", "T"]));
        let het = table
            .genotypes
            .iter()
            .position(|g| g.allele_indices == vec![0, 1])
            .unwrap();
        let alts = table.alternate_alleles(het, "A");
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0].base, "G");

        let gt = table
            .genotypes
            .iter()
            .position(|g| g.allele_indices == vec![1, 2])
            .unwrap();
        let alts = table.alternate_alleles(gt, "A");
        assert_eq!(alts.len(), 2);
    }

    #[test]
    fn spectrum_and_count_frequencies() {
        let table = GenotypeTable::new(2, candidates(&["A", "G"]));
        let aa = table.genotype(table.homozygous_id(0).unwrap());
        let het = &table.genotypes[1];

        // two samples: A/A and A/G -> A seen 3 times, G once
        let spectrum = allele_spectrum(&[aa, het]);
        assert_eq!(spectrum.get(&0), Some(&3));
        assert_eq!(spectrum.get(&1), Some(&1));

        let frequencies = count_frequencies(&[aa, het]);
        assert_eq!(frequencies.get(&3), Some(&1));
        assert_eq!(frequencies.get(&1), Some(&1));

        // two homozygous samples of the same allele: one allele seen 4x
        let frequencies = count_frequencies(&[aa, aa]);
        assert_eq!(frequencies.get(&4), Some(&1));
        assert_eq!(frequencies.len(), 1);
    }

    #[test]
    fn tetraploid_enumeration_is_canonical() {
        let table = GenotypeTable::new(4, candidates(&["A", "G"]));
        assert_eq!(table.len(), 5);
        for genotype in &table.genotypes {
            let mut sorted = genotype.allele_indices.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, genotype.allele_indices);
        }
    }
}
