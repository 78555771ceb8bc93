//! Line-delimited JSON readers and writers for trace and CFG records.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::IngestError;
use crate::record::{CfgBlock, CfgEdge, CfgPath, FuncSummary, PpCoverage, PathSummary, TraceInst};

fn read_lines(path: &Path) -> Result<Vec<(usize, serde_json::Value)>, IngestError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: display.clone(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| IngestError::Io {
            path: display.clone(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|source| IngestError::MalformedJson {
                path: display.clone(),
                line: idx + 1,
                source,
            })?;
        out.push((idx + 1, value));
    }
    Ok(out)
}

fn validate_trace_inst(path: &str, line: usize, inst: &TraceInst) -> Result<(), IngestError> {
    if let Some(use_tys) = &inst.use_tys {
        if use_tys.len() != inst.uses.len() {
            return Err(IngestError::UseTypeLengthMismatch {
                path: path.to_string(),
                line,
                uses_len: inst.uses.len(),
                use_tys_len: use_tys.len(),
            });
        }
    }
    if let Some(tx) = &inst.tx {
        if tx.which >= inst.uses.len() {
            return Err(IngestError::TransmitterIndexOutOfBounds {
                path: path.to_string(),
                line,
                which: tx.which,
                uses_len: inst.uses.len(),
            });
        }
    }
    Ok(())
}

/// Load trace instruction records from a trace NDJSON file.
///
/// Enforces the `pp`-uniqueness-per-function invariant and the
/// `use_tys`/`uses` length and `tx.which` bounds invariants from the record
/// model; a violation is fatal to the offending record but the loader keeps
/// reading the rest of the file.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceInst>, IngestError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let mut insts = Vec::new();
    let mut seen_pp: HashMap<(String, String), ()> = HashMap::new();
    for (line, value) in read_lines(path)? {
        let inst: TraceInst =
            serde_json::from_value(value).map_err(|source| IngestError::MalformedJson {
                path: display.clone(),
                line,
                source,
            })?;
        validate_trace_inst(&display, line, &inst)?;
        let key = (inst.function.clone(), inst.pp.clone());
        if seen_pp.insert(key, ()).is_some() {
            tracing::warn!(
                path = %display,
                line,
                fn_ = %inst.function,
                pp = %inst.pp,
                "duplicate program point within function"
            );
        }
        insts.push(inst);
    }
    Ok(insts)
}

/// Load `trace_index` records from a trace-index NDJSON file.
pub fn load_trace_index(
    path: impl AsRef<Path>,
) -> Result<Vec<crate::record::TraceIndex>, IngestError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let mut out = Vec::new();
    for (line, value) in read_lines(path)? {
        if value.get("kind").and_then(|k| k.as_str()) != Some("trace_index") {
            continue;
        }
        let rec = serde_json::from_value(value).map_err(|source| IngestError::MalformedJson {
            path: display.clone(),
            line,
            source,
        })?;
        out.push(rec);
    }
    Ok(out)
}

/// Load `func_summary` records from a CFG NDJSON file.
pub fn load_func_summary(path: impl AsRef<Path>) -> Result<Vec<FuncSummary>, IngestError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let mut out = Vec::new();
    for (line, value) in read_lines(path)? {
        if value.get("kind").and_then(|k| k.as_str()) != Some("func_summary") {
            continue;
        }
        let rec = serde_json::from_value(value).map_err(|source| IngestError::MalformedJson {
            path: display.clone(),
            line,
            source,
        })?;
        out.push(rec);
    }
    Ok(out)
}

/// All CFG-side record kinds, bucketed by `kind`.
#[derive(Debug, Clone, Default)]
pub struct CfgBundle {
    pub blocks: Vec<CfgBlock>,
    pub edges: Vec<CfgEdge>,
    pub paths: Vec<CfgPath>,
    pub summaries: Vec<PathSummary>,
    pub pp_coverage: Vec<PpCoverage>,
}

/// Load the CFG NDJSON file, dispatching each record on its `kind` field.
/// Unrecognized kinds (`run_summary` and anything future) are skipped rather
/// than rejected, since this crate does not consume them.
pub fn load_cfg(path: impl AsRef<Path>) -> Result<CfgBundle, IngestError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let mut bundle = CfgBundle::default();
    for (line, value) in read_lines(path)? {
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| IngestError::MissingField {
                path: display.clone(),
                line,
                field: "kind",
            })?;
        macro_rules! parse_into {
            ($target:expr) => {
                serde_json::from_value(value).map_err(|source| IngestError::MalformedJson {
                    path: display.clone(),
                    line,
                    source,
                })?
            };
        }
        match kind {
            "block" => bundle.blocks.push(parse_into!(value)),
            "edge" => bundle.edges.push(parse_into!(value)),
            "path" => bundle.paths.push(parse_into!(value)),
            "path_summary" => bundle.summaries.push(parse_into!(value)),
            "pp_coverage" => bundle.pp_coverage.push(parse_into!(value)),
            "func_summary" | "run_summary" => {}
            other => {
                return Err(IngestError::UnrecognizedKind {
                    path: display.clone(),
                    line,
                    kind: other.to_string(),
                })
            }
        }
    }
    Ok(bundle)
}

/// Trace + CFG inputs loaded together, for convenience.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub trace: Vec<TraceInst>,
    pub cfg: CfgBundle,
}

pub fn load_inputs(
    trace_path: impl AsRef<Path>,
    cfg_path: impl AsRef<Path>,
) -> Result<Inputs, IngestError> {
    Ok(Inputs {
        trace: load_trace(trace_path)?,
        cfg: load_cfg(cfg_path)?,
    })
}

/// Group trace instructions by function name, preserving trace order.
pub fn trace_by_fn(trace: &[TraceInst]) -> HashMap<String, Vec<TraceInst>> {
    let mut out: HashMap<String, Vec<TraceInst>> = HashMap::new();
    for inst in trace {
        out.entry(inst.function.clone()).or_default().push(inst.clone());
    }
    out
}

/// Append one record as a line of NDJSON to `writer`.
pub fn write_record<T: serde::Serialize>(
    writer: &mut impl Write,
    record: &T,
) -> Result<(), IngestError> {
    let line = serde_json::to_string(record).map_err(|source| IngestError::MalformedJson {
        path: "<output>".to_string(),
        line: 0,
        source,
    })?;
    writer
        .write_all(line.as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .map_err(|source| IngestError::Io {
            path: "<output>".to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_trace_instructions() {
        let f = write_temp(
            "{\"fn\":\"f\",\"bb\":\"b0\",\"pp\":\"p0\",\"op\":\"add\",\"def\":\"d\",\"uses\":[\"const:i32:1\",\"const:i32:2\"],\"def_ty\":\"i32\"}\n",
        );
        let insts = load_trace(f.path()).unwrap();
        assert_eq!(insts.len(), 1);
        assert_eq!(insts[0].op, "add");
        assert_eq!(insts[0].def_id.as_deref(), Some("d"));
    }

    #[test]
    fn rejects_use_tys_length_mismatch() {
        let f = write_temp(
            "{\"fn\":\"f\",\"bb\":\"b0\",\"pp\":\"p0\",\"op\":\"add\",\"uses\":[\"a\",\"b\"],\"use_tys\":[\"i32\"]}\n",
        );
        let err = load_trace(f.path()).unwrap_err();
        assert!(matches!(err, IngestError::UseTypeLengthMismatch { .. }));
    }

    #[test]
    fn rejects_transmitter_index_out_of_bounds() {
        let f = write_temp(
            "{\"fn\":\"f\",\"bb\":\"b0\",\"pp\":\"p0\",\"op\":\"call\",\"uses\":[\"a\"],\"tx\":{\"kind\":\"leak\",\"which\":2}}\n",
        );
        let err = load_trace(f.path()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::TransmitterIndexOutOfBounds { .. }
        ));
    }

    #[test]
    fn skips_blank_lines() {
        let f = write_temp("\n\n{\"fn\":\"f\",\"bb\":\"b0\",\"pp\":\"p0\",\"op\":\"add\",\"uses\":[]}\n\n");
        let insts = load_trace(f.path()).unwrap();
        assert_eq!(insts.len(), 1);
    }

    #[test]
    fn loads_cfg_bundle_by_kind() {
        let f = write_temp(concat!(
            "{\"kind\":\"block\",\"fn\":\"f\",\"bb\":\"b0\",\"succs\":[\"b1\"]}\n",
            "{\"kind\":\"path\",\"fn\":\"f\",\"path_id\":0,\"bbs\":[\"b0\"]}\n",
            "{\"kind\":\"pp_coverage\",\"fn\":\"f\",\"pp\":\"p0\",\"path_count\":1,\"path_ids\":[0],\"truncated\":false}\n",
        ));
        let bundle = load_cfg(f.path()).unwrap();
        assert_eq!(bundle.blocks.len(), 1);
        assert_eq!(bundle.paths.len(), 1);
        assert_eq!(bundle.pp_coverage.len(), 1);
    }

    #[test]
    fn round_trips_trace_inst() {
        let inst = TraceInst {
            function: "f".to_string(),
            bb: "b0".to_string(),
            pp: "p0".to_string(),
            op: "add".to_string(),
            def_id: Some("d".to_string()),
            uses: vec!["const:i32:1".to_string(), "const:i32:2".to_string()],
            tx: None,
            def_ty: Some("i32".to_string()),
            use_tys: None,
            icmp_pred: None,
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &inst).unwrap();
        let back: TraceInst = serde_json::from_str(
            std::str::from_utf8(&buf).unwrap().trim(),
        )
        .unwrap();
        assert_eq!(inst, back);
    }

    proptest::proptest! {
        #[test]
        fn round_trips_arbitrary_trace_inst(
            function in "[a-z][a-z0-9_]{0,8}",
            bb in "b[0-9]{1,3}",
            pp in "p[0-9]{1,3}",
            op in "[a-z]{2,10}",
            def_id in proptest::option::of("[a-z][a-z0-9_]{0,6}"),
            use_count in 0usize..4,
        ) {
            let uses: Vec<String> = (0..use_count).map(|i| format!("const:i32:{i}")).collect();
            let use_tys = if use_count > 0 { Some(vec!["i32".to_string(); use_count]) } else { None };
            let inst = TraceInst {
                function,
                bb,
                pp,
                op,
                def_id,
                uses,
                tx: None,
                def_ty: Some("i32".to_string()),
                use_tys,
                icmp_pred: None,
            };
            let mut buf = Vec::new();
            write_record(&mut buf, &inst).unwrap();
            let back: TraceInst =
                serde_json::from_str(std::str::from_utf8(&buf).unwrap().trim()).unwrap();
            proptest::prop_assert_eq!(inst, back);
        }
    }
}
