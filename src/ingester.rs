use flate2::bufread::MultiGzDecoder;
use log::{debug, error};
use std::io::BufReader;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::containers::{AssemblyLayout, ConfusedEdge, TigVector, Unitig};
use crate::utils;
use crate::utils::is_gzipped;

/// Read the assembly snapshot JSON (contigs, reads, overlaps and read placements).
/// Gzipped input, including multi-member bgzip, is detected from the file
/// contents. Terminates on unreadable or malformed input.
pub fn load_layout(layout_path: PathBuf) -> AssemblyLayout {
    let start_time = SystemTime::now();
    let layout_name_str = layout_path.to_string_lossy().to_string();
    let file_handle = match std::fs::File::open(&layout_path) {
        Ok(file) => file,
        Err(e) => {
            error!("Input layout does not exist: \"{}\"", layout_name_str);
            error!("{}", e);
            std::process::exit(exitcode::NOINPUT);
        }
    };
    let reader = BufReader::new(file_handle);
    let layout_result: Result<AssemblyLayout, serde_json::Error> = if is_gzipped(&layout_name_str) {
        let decoder = MultiGzDecoder::new(reader);
        serde_json::from_reader(decoder)
    } else {
        serde_json::from_reader(reader)
    };
    let layout = match layout_result {
        Ok(layout) => layout,
        Err(e) => {
            error!("Error reading layout JSON \"{}\"", layout_name_str);
            error!("{}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    debug!(
        "{} contigs, {} reads, {} overlaps, {} placements in layout",
        layout.contigs.len(),
        layout.reads.len(),
        layout.overlaps.len(),
        layout.placements.len()
    );
    debug!(
        "Layout loading: {}s",
        start_time.elapsed().unwrap_or_default().as_secs()
    );
    layout
}

pub fn parse_layout(json: &str) -> Result<AssemblyLayout, serde_json::Error> {
    serde_json::from_str(json)
}

/// Turn the contig records of a layout into a tig collection. Contig ids must run
/// 0..n with no gaps, and each read may appear in only one contig. Reads are put
/// in position order but keep their contig coordinates, since read placements
/// refer to them.
pub fn build_contigs(layout: &AssemblyLayout) -> Result<TigVector, String> {
    let mut records: Vec<_> = layout.contigs.iter().collect();
    records.sort_by_key(|record| record.id);

    let mut seen_reads = std::collections::HashSet::new();
    let mut tigs = Vec::with_capacity(records.len());
    for (expected_id, record) in records.into_iter().enumerate() {
        if record.id as usize != expected_id {
            return Err(format!(
                "contig ids must be contiguous from 0, found {} where {} was expected",
                record.id, expected_id
            ));
        }
        let mut tig = Unitig::new(record.id);
        tig.is_unassembled = record.unassembled;
        tig.is_repeat = record.repeat;
        for read in record.reads.iter() {
            if !seen_reads.insert(read.id) {
                return Err(format!("read {} is placed in more than one contig", read.id));
            }
            tig.add_read(*read, 0);
        }
        tig.ufpath
            .sort_by_key(|read| (read.position.min(), read.position.max()));
        tigs.push(tig);
    }
    Ok(TigVector::from_unitigs(tigs))
}

/// Load and validate the contigs of a layout, terminating if they are inconsistent
pub fn load_contigs(layout: &AssemblyLayout) -> TigVector {
    match build_contigs(layout) {
        Ok(contigs) => {
            debug!("{} contigs loaded", contigs.len());
            contigs
        }
        Err(e) => {
            error!("Invalid contigs in layout: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    }
}

/// Parse one tab or space delimited confused-edge line: read id, the confused
/// end of that read (5 or 3) and the id of the read causing the confusion
pub fn parse_confused_edge_line(line: &str) -> Result<ConfusedEdge, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(format!("expected 3 fields, found {}", fields.len()));
    }
    let a_id: u32 = fields[0]
        .parse()
        .map_err(|_| format!("non-numeric read id \"{}\"", fields[0]))?;
    let a3p = match fields[1] {
        "3" | "3'" => true,
        "5" | "5'" => false,
        other => return Err(format!("read end must be 5 or 3, found \"{}\"", other)),
    };
    let b_id: u32 = fields[2]
        .parse()
        .map_err(|_| format!("non-numeric read id \"{}\"", fields[2]))?;
    Ok(ConfusedEdge::new(a_id, a3p, b_id))
}

/// Reads the confused-edge table, plain text or bgzip compressed. Blank lines and
/// lines starting with '#' are skipped.
pub fn load_confused_edges(confused_edges_path: String) -> Vec<ConfusedEdge> {
    let lines = utils::read_file_from_path(&confused_edges_path);
    let mut confused_edges = Vec::new();
    for (line_number, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_confused_edge_line(line) {
            Ok(edge) => confused_edges.push(edge),
            Err(e) => {
                error!(
                    "Invalid entry on line {} of confused edges file {}: {}",
                    line_number + 1,
                    confused_edges_path,
                    e
                );
                std::process::exit(exitcode::DATAERR);
            }
        }
    }
    debug!("{} confused edges loaded", confused_edges.len());
    confused_edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::{ContigRecord, ReadPlacement, SeqInterval};
    use std::io::Write;

    fn create_test_layout_json() -> String {
        r#"{
            "reads": [
                {"id": 1, "length": 500, "backbone": true},
                {"id": 2, "length": 600},
                {"id": 3, "length": 400, "backbone": true}
            ],
            "contigs": [
                {"id": 1, "unassembled": true, "reads": [{"id": 3, "position": {"bgn": 0, "end": 400}}]},
                {"id": 0, "reads": [
                    {"id": 2, "position": {"bgn": 900, "end": 300}},
                    {"id": 1, "position": {"bgn": 100, "end": 600}}
                ]}
            ],
            "overlaps": [
                {"a_id": 1, "b_id": 2, "a_hang": 200, "b_hang": 300, "erate": 0.02}
            ]
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_layout() {
        let layout = parse_layout(&create_test_layout_json()).unwrap();
        assert_eq!(layout.reads.len(), 3);
        assert!(!layout.reads[1].backbone);
        assert_eq!(layout.contigs.len(), 2);
        assert!(!layout.overlaps[0].flipped);
        assert!(layout.placements.is_empty());
    }

    #[test]
    fn test_build_contigs_orders_by_id_and_position() {
        let layout = parse_layout(&create_test_layout_json()).unwrap();
        let contigs = build_contigs(&layout).unwrap();
        assert_eq!(contigs.len(), 2);

        let tig = contigs.get(0).unwrap();
        assert_eq!(tig.ufpath[0], ReadPlacement::new(1, 100, 600));
        assert_eq!(tig.ufpath[1].position, SeqInterval::new(900, 300));
        // coordinates are left as given, not rebased
        assert_eq!(tig.length, 900);
        assert_eq!(contigs.ufpath_idx(2), Some(1));
        assert!(contigs.get(1).unwrap().is_unassembled);
        assert_eq!(contigs.in_unitig(3), Some(1));
    }

    #[test]
    fn test_build_contigs_rejects_gap_in_ids() {
        let layout = AssemblyLayout {
            contigs: vec![ContigRecord {
                id: 1,
                unassembled: false,
                repeat: false,
                reads: vec![ReadPlacement::new(1, 0, 100)],
            }],
            ..Default::default()
        };
        assert!(build_contigs(&layout).is_err());
    }

    #[test]
    fn test_build_contigs_rejects_shared_read() {
        let record = ContigRecord {
            id: 0,
            unassembled: false,
            repeat: false,
            reads: vec![ReadPlacement::new(1, 0, 100)],
        };
        let mut second = record.clone();
        second.id = 1;
        let layout = AssemblyLayout {
            contigs: vec![record, second],
            ..Default::default()
        };
        assert!(build_contigs(&layout).is_err());
    }

    #[test]
    fn test_parse_confused_edge_line() {
        assert_eq!(
            parse_confused_edge_line("12\t3\t40"),
            Ok(ConfusedEdge::new(12, true, 40))
        );
        assert_eq!(
            parse_confused_edge_line("12 5' 40"),
            Ok(ConfusedEdge::new(12, false, 40))
        );
        assert!(parse_confused_edge_line("12\t4\t40").is_err());
        assert!(parse_confused_edge_line("12\t3").is_err());
        assert!(parse_confused_edge_line("read12\t3\t40").is_err());
    }

    #[test]
    fn test_load_confused_edges_skips_comments() {
        let path = std::env::temp_dir().join(format!("tigsplit_edges_{}.tsv", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#read_id\tend\tcausing_read_id").unwrap();
            writeln!(file, "4\t5\t9").unwrap();
            writeln!(file).unwrap();
            writeln!(file, "7\t3\t2").unwrap();
        }
        let edges = load_confused_edges(path.to_string_lossy().to_string());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            edges,
            vec![ConfusedEdge::new(4, false, 9), ConfusedEdge::new(7, true, 2)]
        );
    }

    #[test]
    fn test_load_layout_multi_member_gzip() {
        use flate2::write::GzEncoder;

        let path = std::env::temp_dir().join(format!("tigsplit_layout_{}.json.gz", std::process::id()));
        let json = create_test_layout_json();
        let (head, tail) = json.split_at(json.len() / 2);
        {
            let mut file = std::fs::File::create(&path).unwrap();
            for part in [head, tail] {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(part.as_bytes()).unwrap();
                file.write_all(&encoder.finish().unwrap()).unwrap();
            }
        }
        let layout = load_layout(path.clone());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(layout.contigs.len(), 2);
        assert_eq!(layout.overlaps.len(), 1);
    }

    #[test]
    fn test_load_layout_plain() {
        let path = std::env::temp_dir().join(format!("tigsplit_layout_{}.json", std::process::id()));
        std::fs::write(&path, create_test_layout_json()).unwrap();
        let layout = load_layout(path.clone());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(layout.contigs.len(), 2);
    }
}
