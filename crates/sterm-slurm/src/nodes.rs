//! Parse per-node hardware details from `scontrol show nodes`.
//!
//! Output is a sequence of records of whitespace-separated key=value
//! tokens; a new record begins at each NodeName= token. Both the
//! multi-line block form and the one-line (-o) form parse the same way.

use crate::types::{CommandFamily, Node, NodeState, ParseWarning};
use std::collections::HashMap;
use sterm_parsers::non_empty_string;

fn build_node(fields: &HashMap<&str, &str>, record: &str) -> Result<Node, String> {
    let name = fields
        .get("NodeName")
        .filter(|v| !v.is_empty())
        .ok_or("missing NodeName")?;

    let cpus: u32 = fields
        .get("CPUTot")
        .ok_or("missing CPUTot")?
        .parse()
        .map_err(|_| format!("bad CPUTot in {:?}", record))?;

    let partitions = fields
        .get("Partitions")
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Node {
        name: name.to_string(),
        state: fields
            .get("State")
            .map(|v| NodeState::parse(v))
            .unwrap_or(NodeState::Other("UNKNOWN".to_string())),
        cpus,
        memory_mb: fields.get("RealMemory").and_then(|v| v.parse().ok()),
        free_mem_mb: fields.get("FreeMem").and_then(|v| v.parse().ok()),
        gres: fields
            .get("Gres")
            .and_then(|v| non_empty_string(v))
            .filter(|g| g != "(null)"),
        load: fields.get("CPULoad").and_then(|v| v.parse().ok()),
        partitions,
    })
}

/// Parse full `scontrol show nodes` output.
pub fn parse_nodes_output(stdout: &str) -> (Vec<Node>, Vec<ParseWarning>) {
    let mut nodes = Vec::new();
    let mut warnings = Vec::new();

    // Split the token stream into records at NodeName= boundaries.
    let mut records: Vec<Vec<&str>> = Vec::new();
    for token in stdout.split_whitespace() {
        if token.starts_with("NodeName=") {
            records.push(Vec::new());
        }
        if let Some(record) = records.last_mut() {
            record.push(token);
        }
    }

    for tokens in &records {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        for token in tokens {
            if let Some((key, value)) = token.split_once('=') {
                fields.insert(key, value);
            }
        }
        let record = tokens.join(" ");
        match build_node(&fields, &record) {
            Ok(node) => nodes.push(node),
            Err(reason) => {
                warnings.push(ParseWarning::new(CommandFamily::Hardware, &record, reason))
            }
        }
    }

    (nodes, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "\
NodeName=node01 Arch=x86_64 CoresPerSocket=16
   CPUAlloc=8 CPUTot=32 CPULoad=7.42
   Gres=gpu:a100:4
   RealMemory=256000 FreeMem=180000
   Partitions=gpu,batch
   State=MIXED

NodeName=node02 Arch=x86_64 CoresPerSocket=16
   CPUAlloc=0 CPUTot=32 CPULoad=0.01
   Gres=(null)
   RealMemory=128000 FreeMem=127000
   Partitions=batch
   State=IDLE
";

    #[test]
    fn test_parse_blocks() {
        let (nodes, warnings) = parse_nodes_output(BLOCK);
        assert!(warnings.is_empty());
        assert_eq!(nodes.len(), 2);

        let n1 = &nodes[0];
        assert_eq!(n1.name, "node01");
        assert_eq!(n1.state, NodeState::Mixed);
        assert_eq!(n1.cpus, 32);
        assert_eq!(n1.memory_mb, Some(256000));
        assert_eq!(n1.free_mem_mb, Some(180000));
        assert_eq!(n1.gres.as_deref(), Some("gpu:a100:4"));
        assert_eq!(n1.load, Some(7.42));
        assert_eq!(n1.partitions, vec!["gpu", "batch"]);

        let n2 = &nodes[1];
        assert_eq!(n2.state, NodeState::Idle);
        assert!(n2.gres.is_none());
    }

    #[test]
    fn test_one_line_form() {
        let output = "NodeName=node03 CPUTot=8 RealMemory=16000 State=DRAINED Partitions=debug\n";
        let (nodes, warnings) = parse_nodes_output(output);
        assert!(warnings.is_empty());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].state, NodeState::Drained);
        assert!(nodes[0].free_mem_mb.is_none());
    }

    #[test]
    fn test_missing_cputot_drops_record() {
        let output = "NodeName=node04 State=IDLE\nNodeName=node05 CPUTot=4 State=IDLE\n";
        let (nodes, warnings) = parse_nodes_output(output);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "node05");
        assert_eq!(warnings.len(), 1);
    }
}
