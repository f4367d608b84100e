use crate::caller::results::LocusCall;
use crate::utils::{safe_exp, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

/// One line of JSON per processed locus, reporting the full posterior
/// summary whether or not the site clears the variant threshold.
pub struct JsonWriter {
    writer: BufWriter<File>,
}

#[derive(Serialize)]
struct LocusRecord<'a> {
    /// 1-based, to match VCF coordinates.
    position: u64,
    sequence: &'a str,
    best_genotype_combo: Vec<ComboEntry>,
    combos_tested: usize,
    best_genotype_combo_prob: f64,
    coverage: usize,
    posterior_normalizer: f64,
    ewens_sampling_probability: f64,
    samples: BTreeMap<&'a str, SampleRecord>,
}

#[derive(Serialize)]
struct ComboEntry {
    sample: String,
    genotype: String,
    log_likelihood: f64,
}

#[derive(Serialize)]
struct SampleRecord {
    best_genotype: String,
    best_genotype_prob: f64,
    coverage: usize,
    marginals: BTreeMap<String, f64>,
}

impl JsonWriter {
    pub fn new(output_path: &str) -> Result<JsonWriter> {
        let file = File::create(output_path)
            .map_err(|e| format!("Invalid JSON output path {}: {}", output_path, e))?;
        Ok(JsonWriter {
            writer: BufWriter::new(file),
        })
    }

    pub fn write(&mut self, call: &LocusCall) -> Result<()> {
        let best_genotype_combo = call
            .best_combo
            .genotypes
            .iter()
            .zip(call.samples.iter())
            .map(|(&(id, log_likelihood), sample)| ComboEntry {
                sample: sample.sample.clone(),
                genotype: call.table.label(id),
                log_likelihood,
            })
            .collect();

        let mut samples = BTreeMap::new();
        for sample in &call.samples {
            let (best_id, best_log_marginal) = sample.best_marginal();
            let marginals = sample
                .marginals
                .iter()
                .map(|(&id, &log_marginal)| (call.table.label(id), safe_exp(log_marginal)))
                .collect();
            samples.insert(
                sample.sample.as_str(),
                SampleRecord {
                    best_genotype: call.table.label(best_id),
                    best_genotype_prob: safe_exp(best_log_marginal),
                    coverage: sample.coverage(),
                    marginals,
                },
            );
        }

        let record = LocusRecord {
            position: call.position + 1,
            sequence: &call.contig,
            best_genotype_combo,
            combos_tested: call.combos_tested,
            best_genotype_combo_prob: call.best_combo_prob,
            coverage: call.coverage,
            posterior_normalizer: safe_exp(call.log_normalizer),
            ewens_sampling_probability: call.ewens_probability,
            samples,
        };

        let line = serde_json::to_string(&record)
            .map_err(|e| format!("Failed to serialize locus record: {}", e))?;
        writeln!(self.writer, "{}", line).map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| e.to_string())
    }
}
