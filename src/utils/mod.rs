mod bam_utils;
mod io_utils;
mod math;
mod output;
mod readers;
mod region;
mod util;

pub use bam_utils::{
    get_bam_header, get_contigs, get_default_sample_name, get_read_group_samples,
    get_sample_roster, is_bam_mapped,
};
pub use io_utils::create_writer;
pub use math::{log_sum_exp, multiset_count, safe_exp};
pub use output::OutputFormat;
pub use readers::{open_bam_reader, open_genome_reader, open_targets_reader};
pub use region::GenomicRegion;
pub use util::{handle_error_and_exit, Result};
