//! Dependency graph (§4.J) — parses a Mermaid-flavoured text graph into
//! forward/reverse adjacency maps, used by `fire` to order repository
//! operations.
//!
//! No teacher module reads graph text; grounded instead on the other pack
//! example that does line-oriented, keyword-aware text parsing into a
//! `HashMap<String, Vec<String>>` adjacency structure, adapted to Mermaid's
//! arrow vocabulary rather than that source's own syntax.

use std::collections::{HashMap, HashSet};

use crate::error::MistletoeError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub forward: HashMap<String, Vec<String>>,
    pub reverse: HashMap<String, Vec<String>>,
}

impl Graph {
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

const ARROWS: &[&str] = &["<-->", "-.->", "==>", "-->"];

const STRUCTURAL_PREFIXES: &[&str] = &["graph ", "graph\t", "flowchart", "subgraph", "end"];

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn leading_id(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !is_id_char(c)).unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some((&s[..end], &s[end..]))
    }
}

fn strip_line_comment(line: &str) -> &str {
    match line.find("%%") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn is_structural(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty()
        || trimmed.starts_with("```")
        || STRUCTURAL_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Parse a single edge line into `(from, to, arrow)`, ignoring any trailing
/// edge label (`A -->|some label| B`) and any leading/trailing whitespace.
fn parse_edge(line: &str) -> Option<(String, String, &'static str)> {
    let (from, rest) = leading_id(line.trim_start())?;
    let rest = rest.trim_start();

    let arrow = *ARROWS.iter().find(|a| rest.starts_with(**a))?;
    let mut rest = &rest[arrow.len()..];

    if let Some(stripped) = rest.strip_prefix('|') {
        let close = stripped.find('|')?;
        rest = &stripped[close + 1..];
    }

    let (to, _) = leading_id(rest.trim_start())?;
    Some((from.to_string(), to.to_string(), arrow))
}

/// Parse Mermaid-style graph text into forward and reverse adjacency maps.
/// Unrecognised lines (comments, fences, structural keywords, blank lines)
/// are silently skipped rather than rejected — §4.J treats the format as
/// best-effort extraction, not a strict grammar.
pub fn parse(text: &str) -> Graph {
    let mut forward: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse: HashMap<String, Vec<String>> = HashMap::new();

    for raw_line in text.lines() {
        let line = strip_line_comment(raw_line);
        if is_structural(line) {
            continue;
        }

        if let Some((from, to, arrow)) = parse_edge(line) {
            let fwd = forward.entry(from.clone()).or_default();
            if !fwd.contains(&to) {
                fwd.push(to.clone());
            }
            let rev = reverse.entry(to.clone()).or_default();
            if !rev.contains(&from) {
                rev.push(from.clone());
            }

            // `<-->` is bidirectional: record the reverse edge too (§4.J).
            if arrow == "<-->" {
                let fwd_back = forward.entry(to.clone()).or_default();
                if !fwd_back.contains(&from) {
                    fwd_back.push(from.clone());
                }
                let rev_back = reverse.entry(from).or_default();
                if !rev_back.contains(&to) {
                    rev_back.push(to);
                }
            }
        }
    }

    Graph { forward, reverse }
}

/// Validate that every id mentioned in the graph is a known repository id
/// (§4.J "graph validation"); returns the first unknown id found, in the
/// order repositories were declared forward-then-reverse.
pub fn validate(graph: &Graph, valid_ids: &HashSet<String>) -> Result<(), MistletoeError> {
    let mut all_ids: Vec<&String> = graph.forward.keys().chain(graph.forward.values().flatten()).collect();
    all_ids.sort();
    all_ids.dedup();

    for id in all_ids {
        if !valid_ids.contains(id) {
            return Err(MistletoeError::UserInputRequired {
                detail: format!("dependency graph references unknown repository {id:?}"),
            });
        }
    }
    Ok(())
}
