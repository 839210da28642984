use bgzip::{BGZFWriter, Compression};
use std::path::PathBuf;

use crate::containers::{TigLoc, TigVector, UnitigCalls, UnitigResult};
use flate2::write::GzEncoder;
use log::{debug, error, info};
use std::fs::File;
use std::io::Write;
use std::io::{self, BufWriter};

/// Converts the unitig result to a pretty JSON document and writes it out along
/// with the provenance table. Both files are created/overwritten in `outdir`.
pub fn write_results(result: &UnitigResult, outdir: String, prefix: String, write_unzipped: bool) {
    debug!("{} unitigs to write", result.unitigs.len());
    let (sources_path, json_path) =
        generate_output_paths(outdir.clone(), prefix.clone(), write_unzipped);
    let calls = UnitigCalls::new(result);
    let json_string = unitig_calls_to_json(&calls);
    if let Err(error) = write_json(json_string, json_path.clone()) {
        error!("Error writing JSON result to outdir {}\n{}", outdir, error);
        std::process::exit(exitcode::IOERR);
    }
    let source_lines = sources_to_lines(&result.sources, &result.unitigs);
    let sources_written = if write_unzipped {
        write_unzipped_sources(&source_lines, sources_path.clone())
    } else {
        write_gzipped_sources(&source_lines, sources_path.clone())
    };
    if let Err(error) = sources_written {
        error!("Error writing sources TSV to outdir {}\n{}", outdir, error);
        std::process::exit(exitcode::IOERR);
    }
    info!("JSON written to {}", json_path);
    info!("Sources written to {}", sources_path);
}

/// Convert the result document into a pretty json String
fn unitig_calls_to_json(calls: &UnitigCalls) -> String {
    match serde_json::to_string_pretty(calls) {
        Ok(json) => json,
        Err(e) => {
            error!("Error serializing unitigs to JSON: {}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

/// Write the json file output
fn write_json(json_string: String, json_name: String) -> std::io::Result<()> {
    let json_outfile = PathBuf::from(json_name);
    let file_handle = File::create(&json_outfile)?;
    if json_outfile.extension().and_then(|ext| ext.to_str()) == Some("gz") {
        let mut gzip_filehandle = GzEncoder::new(file_handle, flate2::Compression::default());
        gzip_filehandle.write_all(json_string.as_bytes())?;
        gzip_filehandle.finish()?;
    } else {
        let mut writer = io::BufWriter::new(file_handle);
        writer.write_all(json_string.as_bytes())?;
        writer.flush()?
    }
    Ok(())
}

/// Given an already-validated directory path with a filename prefix,
/// generate the sources and json filenames for output.
fn generate_output_paths(outdir: String, prefix: String, write_unzipped: bool) -> (String, String) {
    if write_unzipped {
        let sources_filepath = format!("{}/{}.sources.tsv", outdir, prefix);
        let json_filepath = format!("{}/{}.unitigs.json", outdir, prefix);
        (sources_filepath, json_filepath)
    } else {
        let sources_filepath = format!("{}/{}.sources.tsv.gz", outdir, prefix);
        let json_filepath = format!("{}/{}.unitigs.json.gz", outdir, prefix);
        (sources_filepath, json_filepath)
    }
}

fn sources_header() -> String {
    format!(
        "#tigsplit v{}\n#unitig_id\tcontig_id\tbgn\tend\tnum_reads",
        env!("CARGO_PKG_VERSION")
    )
}

/// One tab-delimited line per unitig: where it came from and how many reads it
/// holds after trimming
fn sources_to_lines(sources: &[TigLoc], unitigs: &TigVector) -> Vec<String> {
    sources
        .iter()
        .map(|source| {
            let num_reads = unitigs
                .get(source.unitig_id)
                .map(|tig| tig.ufpath.len())
                .unwrap_or(0);
            format!(
                "{}\t{}\t{}\t{}\t{}",
                source.unitig_id, source.contig_id, source.bgn, source.end, num_reads
            )
        })
        .collect()
}

fn write_unzipped_sources(lines: &[String], sources_name: String) -> std::io::Result<()> {
    let sources_path = PathBuf::from(sources_name);
    let mut sources_file = BufWriter::new(File::create(sources_path)?);
    writeln!(sources_file, "{}", sources_header())?;
    for line in lines {
        writeln!(sources_file, "{}", line)?;
    }
    sources_file.flush()?;
    Ok(())
}

/// Write the provenance table as a BGZF-compressed TSV
fn write_gzipped_sources(lines: &[String], sources_name: String) -> std::io::Result<()> {
    let sources_path = PathBuf::from(sources_name);
    let sources_file = File::create(sources_path)?;

    let mut buf_writer = BufWriter::new(sources_file);
    let mut writer = BGZFWriter::new(&mut buf_writer, Compression::default());

    writer.write_all(format!("{}\n", sources_header()).as_bytes())?;
    for line in lines {
        writer.write_all(format!("{}\n", line).as_bytes())?;
    }
    Ok(())
}
