use crate::caller::{
    evaluate, plan_regions, stream_pileups_into_channel, CallParams, LocusCall, LocusPileup,
    writers::{JsonWriter, VcfWriter},
};
use crate::cli::CallArgs;
use crate::utils::{
    create_writer, get_bam_header, get_contigs, get_default_sample_name, get_read_group_samples,
    get_sample_roster, is_bam_mapped, open_genome_reader, OutputFormat, Result,
};
use crossbeam_channel::bounded;
use std::thread;

const CHANNEL_BUFFER_SIZE: usize = 2048;

enum Writer {
    Vcf(VcfWriter),
    Json(JsonWriter),
    Silent,
}

impl Writer {
    fn write(&mut self, call: &LocusCall) -> Result<bool> {
        match self {
            Writer::Vcf(writer) => writer.write(call),
            Writer::Json(writer) => writer.write(call).map(|_| true),
            Writer::Silent => Ok(false),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            Writer::Json(writer) => writer.finish(),
            _ => Ok(()),
        }
    }
}

pub fn call(args: CallArgs) -> Result<()> {
    // the genome reader is reopened on the producer thread; opening it
    // here surfaces a missing index before any work starts
    open_genome_reader(&args.genome_path)?;

    let bam_header = get_bam_header(&args.reads_path)?;
    if !is_bam_mapped(&bam_header) {
        return Err("Input BAM is not mapped".into());
    }

    let read_group_samples = get_read_group_samples(&bam_header);
    let default_sample = match &args.sample_name {
        Some(name) => name.clone(),
        None => get_default_sample_name(&args.reads_path)?,
    };
    let roster = get_sample_roster(&read_group_samples, &default_sample);
    log::info!("Calling {} sample(s): {}", roster.len(), roster.join(", "));

    let contigs = get_contigs(&bam_header)?;
    let regions = plan_regions(
        &contigs,
        args.region.as_deref(),
        args.targets_path.as_deref(),
    )?;

    let mut writer = if args.suppress_output {
        Writer::Silent
    } else {
        match args.output_format {
            OutputFormat::Vcf => Writer::Vcf(create_writer(&args.output_prefix, "vcf.gz", |path| {
                VcfWriter::new(path, &roster, &bam_header, args.min_p_variant)
            })?),
            OutputFormat::Json => {
                Writer::Json(create_writer(&args.output_prefix, "json", JsonWriter::new)?)
            }
        }
    };

    let params = CallParams {
        ploidy: args.ploidy,
        min_mapq: args.min_mapq,
        min_baseq: args.min_baseq,
        min_alt_count: args.min_alt_count,
        min_alt_fraction: args.min_alt_fraction,
        theta: args.theta,
        bandwidth: args.band.bandwidth,
        banddepth: args.band.banddepth,
    };

    let (sender, receiver) = bounded::<Result<LocusPileup>>(CHANNEL_BUFFER_SIZE);
    let reads_path = args.reads_path.clone();
    let genome_path = args.genome_path.clone();
    let max_depth = args.max_depth;
    let producer = thread::spawn(move || {
        stream_pileups_into_channel(
            &reads_path,
            &genome_path,
            &regions,
            &read_group_samples,
            &default_sample,
            max_depth,
            sender,
        );
    });

    let mut processed: u64 = 0;
    let mut emitted: u64 = 0;
    for locus in &receiver {
        let locus = locus?;
        if let Some(call) = evaluate(&locus, &params) {
            processed += 1;
            if writer.write(&call)? {
                emitted += 1;
            }
        }
    }
    writer.finish()?;

    producer.join().expect("Pileup thread panicked");
    log::info!("Processed {} loci, emitted {}", processed, emitted);

    Ok(())
}
