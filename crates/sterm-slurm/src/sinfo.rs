//! Parse partition summaries from sinfo.

use crate::types::{CommandFamily, ParseWarning, Partition};
use sterm_parsers::{non_empty_string, parse_duration, parse_memory_mb, split_delimited};

/// sinfo output format:
/// %P - Partition (trailing '*' marks the default)
/// %a - Availability (up/down)
/// %l - Time limit
/// %D - Node count
/// %c - CPUs per node
/// %m - Memory per node (MB)
/// %G - GRES
pub const SINFO_FORMAT: &str = "%P|%a|%l|%D|%c|%m|%G";

const FIELD_COUNT: usize = 7;

fn parse_line(line: &str) -> Result<Partition, String> {
    let fields = split_delimited(line, FIELD_COUNT)?;

    let raw_name = fields[0].trim();
    if raw_name.is_empty() {
        return Err("missing partition name".to_string());
    }
    let is_default = raw_name.ends_with('*');
    let name = raw_name.trim_end_matches('*').to_string();

    let node_count: u32 = fields[3]
        .trim()
        .parse()
        .map_err(|_| format!("bad node count {:?}", fields[3]))?;
    // %c may print a '+' for heterogeneous partitions ("32+")
    let cpus: u32 = fields[4]
        .trim()
        .trim_end_matches('+')
        .parse()
        .map_err(|_| format!("bad cpu count {:?}", fields[4]))?;

    Ok(Partition {
        name,
        is_default,
        avail: fields[1].trim().eq_ignore_ascii_case("up"),
        time_limit: parse_duration(fields[2]),
        node_count,
        cpus,
        memory_mb: parse_memory_mb(fields[5].trim().trim_end_matches('+')),
        gres: non_empty_string(fields[6]).filter(|g| g != "(null)"),
    })
}

/// Parse full sinfo output.
///
/// sinfo emits one row per partition/state group; rows sharing a name
/// are merged by summing node counts and keeping the first row's
/// per-node figures.
pub fn parse_sinfo_output(stdout: &str) -> (Vec<Partition>, Vec<ParseWarning>) {
    let mut partitions: Vec<Partition> = Vec::new();
    let mut warnings = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(row) => {
                if let Some(existing) = partitions.iter_mut().find(|p| p.name == row.name) {
                    existing.node_count += row.node_count;
                } else {
                    partitions.push(row);
                }
            }
            Err(reason) => {
                warnings.push(ParseWarning::new(CommandFamily::Hardware, line, reason))
            }
        }
    }

    (partitions, warnings)
}
