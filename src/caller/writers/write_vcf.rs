//! Defines the `VcfWriter` struct and associated functions for creating and writing results to a VCF file.
//!

use crate::caller::results::LocusCall;
use crate::utils::{safe_exp, Result};
use rust_htslib::{
    bam,
    bcf::{
        self,
        record::{GenotypeAllele, Numeric},
        Format, Record,
    },
};
use std::collections::BTreeSet;
use std::env;

/// Header lines defining the INFO and FORMAT fields for the VCF file.
const VCF_LINES: [&str; 7] = [
    r#"##INFO=<ID=PVAR,Number=1,Type=Float,Description="Posterior probability of variation among the samples">"#,
    r#"##INFO=<ID=ESP,Number=1,Type=Float,Description="Ewens sampling probability of the best genotype combination">"#,
    r#"##INFO=<ID=NC,Number=1,Type=Integer,Description="Number of genotype combinations tested">"#,
    r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Total observation depth">"#,
    r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#,
    r#"##FORMAT=<ID=MP,Number=1,Type=Float,Description="Marginal posterior probability of the genotype">"#,
    r#"##FORMAT=<ID=DP,Number=1,Type=Integer,Description="Observation depth">"#,
];

/// Writes called loci as VCF records: one record per distinct alternate
/// allele in the samples' best marginal genotypes, gated by the
/// P(variant) reporting threshold.
pub struct VcfWriter {
    writer: bcf::Writer,
    roster: Vec<String>,
    min_p_variant: f64,
}

impl VcfWriter {
    pub fn new(
        output_path: &str,
        roster: &[String],
        bam_header: &bam::Header,
        min_p_variant: f64,
    ) -> Result<VcfWriter> {
        let mut vcf_header = bcf::header::Header::new();

        for line in VCF_LINES.iter() {
            vcf_header.push_record(line.as_bytes());
        }

        if let Some(records) = bam_header.to_hashmap().get("SQ") {
            for record in records {
                let contig_line =
                    format!(r#"##contig=<ID={},length={}>"#, record["SN"], record["LN"]);
                vcf_header.push_record(contig_line.as_bytes());
            }
        }

        let line = format!(
            "##{}Version={}",
            env!("CARGO_PKG_NAME"),
            *crate::cli::FULL_VERSION
        );
        vcf_header.push_record(line.as_bytes());

        let args: Vec<String> = env::args().collect();
        let command_line = args.join(" ");
        let line = format!("##{}Command={}", env!("CARGO_PKG_NAME"), command_line);
        vcf_header.push_record(line.as_bytes());

        for sample in roster {
            vcf_header.push_sample(sample.as_bytes());
        }

        let writer = bcf::Writer::from_path(output_path, &vcf_header, false, Format::Vcf)
            .map_err(|_| format!("Invalid VCF output path: {}", output_path))?;

        Ok(VcfWriter {
            writer,
            roster: roster.to_vec(),
            min_p_variant,
        })
    }

    /// Returns whether any record was written; sites below the variant
    /// threshold and sites whose best genotypes carry no alternate are
    /// passed over.
    pub fn write(&mut self, call: &LocusCall) -> Result<bool> {
        if call.p_variant < self.min_p_variant {
            return Ok(false);
        }

        let alternates = distinct_alternates(call);
        for alternate in &alternates {
            let mut record = self.writer.empty_record();
            self.add_locus_info(call, alternate, &mut record)?;
            self.add_sample_info(call, alternate, &mut record)?;
            self.writer
                .write(&record)
                .map_err(|e| format!("Failed to write VCF record: {}", e))?;
        }
        Ok(!alternates.is_empty())
    }

    fn add_locus_info(
        &mut self,
        call: &LocusCall,
        alternate: &str,
        record: &mut Record,
    ) -> Result<()> {
        let rid = self
            .writer
            .header()
            .name2rid(call.contig.as_bytes())
            .map_err(|_| format!("Contig missing from VCF header: {}", call.contig))?;
        record.set_rid(Some(rid));
        record.set_pos(call.position as i64);
        record
            .set_alleles(&[call.ref_base.as_bytes(), alternate.as_bytes()])
            .map_err(|e| e.to_string())?;

        record
            .push_info_float(b"PVAR", &[call.p_variant as f32])
            .map_err(|e| e.to_string())?;
        record
            .push_info_float(b"ESP", &[call.ewens_probability as f32])
            .map_err(|e| e.to_string())?;
        record
            .push_info_integer(b"NC", &[call.combos_tested as i32])
            .map_err(|e| e.to_string())?;
        record
            .push_info_integer(b"DP", &[call.coverage as i32])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn add_sample_info(
        &mut self,
        call: &LocusCall,
        alternate: &str,
        record: &mut Record,
    ) -> Result<()> {
        let mut genotypes = Vec::new();
        let mut marginals = Vec::new();
        let mut depths = Vec::new();

        for sample_name in &self.roster {
            match call.samples.iter().find(|s| &s.sample == sample_name) {
                Some(sample) => {
                    let (id, log_marginal) = sample.best_marginal();
                    for &allele_index in &call.table.genotype(id).allele_indices {
                        let base = &call.table.candidates[allele_index].base;
                        genotypes.push(if *base == call.ref_base {
                            GenotypeAllele::Unphased(0)
                        } else if base == alternate {
                            GenotypeAllele::Unphased(1)
                        } else {
                            GenotypeAllele::UnphasedMissing
                        });
                    }
                    marginals.push(safe_exp(log_marginal) as f32);
                    depths.push(sample.coverage() as i32);
                }
                None => {
                    genotypes.extend(
                        std::iter::repeat(GenotypeAllele::UnphasedMissing).take(call.table.ploidy),
                    );
                    marginals.push(f32::missing());
                    depths.push(i32::missing());
                }
            }
        }

        record.push_genotypes(&genotypes).map_err(|e| e.to_string())?;
        record
            .push_format_float(b"MP", &marginals)
            .map_err(|e| e.to_string())?;
        record
            .push_format_integer(b"DP", &depths)
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Distinct alternate alleles across every sample's best marginal
/// genotype, in lexicographic order.
fn distinct_alternates(call: &LocusCall) -> Vec<String> {
    let mut alternates = BTreeSet::new();
    for sample in &call.samples {
        let (id, _) = sample.best_marginal();
        for allele in call.table.alternate_alleles(id, &call.ref_base) {
            alternates.insert(allele.base.clone());
        }
    }
    alternates.into_iter().collect()
}
