use std::io::{BufRead, BufReader};

use log::error;

/// An intersection whose similarity to the invaded tig falls below this fraction
/// is treated as repeat noise rather than a real junction
pub const REPEAT_FRACTION: f64 = 0.5;

/// Shortest verified overlap allowed to split another tig
pub const DEFAULT_MIN_INTERSECT_LEN: u32 = 500;

/// Maximum number of breaks a single tig end may contribute
pub const DEFAULT_MAX_PLACEMENTS: u32 = 2;

/// Standard deviations above the mean erate still considered consistent with a tig
pub const DEFAULT_DEVIATION_GRAPH: f64 = 6.0;

/// first two bytes of a gzip file that indicatee the compression algorithm used
const GZIP_INDICATOR: [u8; 2] = [0x1F, 0x8B];

pub fn is_local_file(filepath: &String) -> bool {
    let path = std::path::Path::new(filepath);

    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_file(),
        Err(_) => false,
    }
}

/// Check if a file is a gzipped file from a String path
pub fn is_gzipped(path: &String) -> bool {
    if !is_local_file(path) {
        return false;
    }
    let file_handle = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!("File does not exist: \"{}\"", path);
            error!("{}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    let mut reader = std::io::BufReader::new(file_handle);
    let mut gzip_indicator_bytes = [0; 2];
    let _ = std::io::Read::read_exact(&mut reader, &mut gzip_indicator_bytes);
    gzip_indicator_bytes == GZIP_INDICATOR
}

/// Read a plain text or gzipped text file into vector of Strings by line
pub fn read_file_from_path(file_path: &String) -> Vec<String> {
    if !is_local_file(file_path) {
        error!("File not found {}", file_path);
        std::process::exit(exitcode::NOINPUT);
    }

    let lines_result = match is_gzipped(file_path) {
        true => {
            let bgzf_reader = match rust_htslib::bgzf::Reader::from_path(file_path) {
                Ok(r) => r,
                Err(_) => {
                    error!("Failed to open compressed file {}", file_path);
                    std::process::exit(exitcode::IOERR);
                }
            };
            let reader = BufReader::new(bgzf_reader);
            reader.lines().collect()
        }
        false => {
            let file: std::fs::File = match std::fs::File::open(file_path) {
                Ok(file) => file,
                Err(_) => {
                    error!("File not found {}", file_path);
                    std::process::exit(exitcode::IOERR);
                }
            };
            let reader = BufReader::new(file);
            reader.lines().collect()
        }
    };
    match lines_result {
        Ok(l) => l,
        Err(_) => {
            error!("Failed to read file {}", file_path);
            std::process::exit(exitcode::IOERR);
        }
    }
}

/// Build a tig from (read id, bgn, end) triples without re-sorting them
#[cfg(test)]
pub fn create_test_tig(id: u32, reads: &[(u32, i32, i32)]) -> crate::containers::Unitig {
    let mut tig = crate::containers::Unitig::new(id);
    for (read_id, bgn, end) in reads {
        tig.add_read(crate::containers::ReadPlacement::new(*read_id, *bgn, *end), 0);
    }
    tig
}

/// Build a read store where every listed read has the given length and backbone status
#[cfg(test)]
pub fn create_test_store(
    reads: &[(u32, u32, bool)],
    overlaps: Vec<crate::containers::Overlap>,
    placements: Vec<crate::containers::OverlapPlacement>,
) -> crate::evidence::ReadStore {
    let layout = crate::containers::AssemblyLayout {
        reads: reads
            .iter()
            .map(|(id, length, backbone)| crate::containers::ReadInfo {
                id: *id,
                length: *length,
                backbone: *backbone,
            })
            .collect(),
        contigs: Vec::new(),
        overlaps,
        placements,
    };
    crate::evidence::ReadStore::from_layout(&layout)
}

/// Overlap between two reads with neutral hangs
#[cfg(test)]
pub fn create_test_overlap(a_id: u32, b_id: u32, erate: f64) -> crate::containers::Overlap {
    crate::containers::Overlap {
        a_id,
        b_id,
        a_hang: 0,
        b_hang: 0,
        flipped: false,
        erate,
    }
}
