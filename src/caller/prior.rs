use statrs::function::factorial::ln_factorial;
use statrs::function::gamma::ln_gamma;
use std::collections::BTreeMap;

/// Ewens sampling log-probability of an allele-count spectrum under the
/// infinite-alleles model with scaled mutation rate theta.
///
/// `count_frequencies` maps a multiplicity m to the number of distinct
/// alleles seen exactly m times; N = sum(m * f_m) is the total number of
/// allele copies in the combo and K = sum(f_m) the number of distinct
/// alleles. Spectrum-independent terms are dropped, which leaves the
/// ordering and the normalized posterior unchanged at fixed N.
pub fn ewens_log_prior(count_frequencies: &BTreeMap<usize, usize>, theta: f64) -> f64 {
    let copies: usize = count_frequencies
        .iter()
        .map(|(multiplicity, count)| multiplicity * count)
        .sum();
    let distinct: usize = count_frequencies.values().sum();

    let mut log_prior = ln_gamma(theta) - ln_gamma(theta + copies as f64);
    log_prior += distinct as f64 * theta.ln();
    for (multiplicity, count) in count_frequencies {
        log_prior -= *count as f64 * ln_factorial(*multiplicity as u64);
    }
    log_prior
}
