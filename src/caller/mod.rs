pub mod allele;
pub mod combo;
pub mod evaluate;
pub mod genotype;
pub mod likelihood;
pub mod pileup;
pub mod posterior;
pub mod prior;
pub mod reduce;
pub mod results;
pub mod writers;

pub use evaluate::{evaluate, CallParams};
pub use pileup::{plan_regions, stream_pileups_into_channel, LocusPileup};
pub use results::LocusCall;
