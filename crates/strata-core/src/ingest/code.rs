//! AST/Code adapter (§4.6, §8 scenario 5).
//!
//! The AST parser itself (tree-sitter or a regex fallback) is out of scope
//! (SPEC_FULL.md §0); this adapter consumes its structured output —
//! [`ModuleRecord`]/[`SymbolRecord`] — and upserts a `Module` node plus its
//! `Class`/`Function`/`Interface` children, wiring `DEFINES`/`IMPORTS`/
//! `INHERITS`/`IMPLEMENTS`/`MEMBER_OF` edges. Incremental: a Module whose
//! current file hash equals the stored `body_hash` is skipped entirely, so
//! re-ingesting unchanged files creates zero new nodes (§4.6, §8).

use serde_json::{json, Value};

use crate::identity;
use crate::memory::Strata;
use crate::model::{Edge, EdgeType, Properties};

use super::{IngestReport, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSymbolKind {
    Class,
    Function,
    Interface,
}

impl CodeSymbolKind {
    fn label(self) -> &'static str {
        match self {
            CodeSymbolKind::Class => "Class",
            CodeSymbolKind::Function => "Function",
            CodeSymbolKind::Interface => "Interface",
        }
    }
}

/// One symbol nested inside a source file, as handed over by the external
/// parser (§4.6 "AST/Code").
#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub qualified_name: String,
    pub kind: CodeSymbolKind,
    pub content: String,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    /// Qualified name of the enclosing `Class`, for a `Function` that is a method (`MEMBER_OF`).
    pub member_of: Option<String>,
    /// Qualified names of base classes (`INHERITS`).
    pub inherits: Vec<String>,
    /// Qualified names of implemented interfaces (`IMPLEMENTS`).
    pub implements: Vec<String>,
}

/// One source file, as handed over by the external parser.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub file_path: String,
    pub content: String,
    /// File paths of modules this file imports (`IMPORTS`).
    pub imports: Vec<String>,
    pub symbols: Vec<SymbolRecord>,
}

fn module_id(file_path: &str) -> String {
    identity::code_symbol_id(file_path, file_path, "Module")
}

/// Ingests one parsed source file. Re-ingesting the same bytes is a no-op
/// (§4.6 `body_hash`, §8 "Incremental AST").
pub fn ingest_code_file(strata: &Strata, record: &ModuleRecord) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let module_id = module_id(&record.file_path);
    let body_hash = identity::content_hash(&record.content);

    if let Some(existing) = strata.store().get_node(&module_id)? {
        if existing.properties.get("body_hash") == Some(&Value::String(body_hash.clone())) {
            report.nodes_skipped += 1;
            return Ok(report);
        }
    }

    let mut module_props = Properties::new();
    module_props.insert("body_hash".to_string(), json!(body_hash));
    module_props.insert("file_path".to_string(), json!(record.file_path));

    strata.add_memory(
        &record.file_path,
        &record.content,
        &["Module", "Code"],
        Some(module_props),
        None,
        None,
        Some(module_id.clone()),
    )?;
    report.nodes_ingested += 1;

    for import_path in &record.imports {
        let imported_id = module_id_for(import_path);
        if strata.store().get_node(&imported_id)?.is_some() {
            strata.store().add_edge(&Edge::new(module_id.clone(), imported_id, EdgeType::Imports))?;
            report.edges_created += 1;
        }
    }

    for symbol in &record.symbols {
        if symbol.qualified_name.is_empty() {
            report.warn(format!("{}: symbol with an empty qualified name, skipping", record.file_path));
            continue;
        }
        let symbol_id = identity::code_symbol_id(&record.file_path, &symbol.qualified_name, symbol.kind.label());
        let mut props = Properties::new();
        props.insert("file_path".to_string(), json!(record.file_path));
        props.insert("qualified_name".to_string(), json!(symbol.qualified_name));
        if let Some(start) = symbol.line_start {
            props.insert("line_start".to_string(), json!(start));
        }
        if let Some(end) = symbol.line_end {
            props.insert("line_end".to_string(), json!(end));
        }

        strata.add_memory(
            &symbol.qualified_name,
            &symbol.content,
            &[symbol.kind.label(), "Code"],
            Some(props),
            None,
            None,
            Some(symbol_id.clone()),
        )?;
        report.nodes_ingested += 1;

        strata.store().add_edge(&Edge::new(module_id.clone(), symbol_id.clone(), EdgeType::Defines))?;
        report.edges_created += 1;

        if let Some(parent) = &symbol.member_of {
            let parent_id = identity::code_symbol_id(&record.file_path, parent, "Class");
            if strata.store().get_node(&parent_id)?.is_some() {
                strata.store().add_edge(&Edge::new(symbol_id.clone(), parent_id, EdgeType::MemberOf))?;
                report.edges_created += 1;
            }
        }

        for base in &symbol.inherits {
            if let Some(base_id) = resolve_symbol_by_name(strata, &record.file_path, base, "Class")? {
                strata.store().add_edge(&Edge::new(symbol_id.clone(), base_id, EdgeType::Inherits))?;
                report.edges_created += 1;
            }
        }
        for iface in &symbol.implements {
            if let Some(iface_id) = resolve_symbol_by_name(strata, &record.file_path, iface, "Interface")? {
                strata.store().add_edge(&Edge::new(symbol_id.clone(), iface_id, EdgeType::Implements))?;
                report.edges_created += 1;
            }
        }
    }

    Ok(report)
}

fn module_id_for(file_path: &str) -> String {
    module_id(file_path)
}

/// Resolves a bare class/interface name (as referenced from `inherits`/
/// `implements`, which may not carry a file path) to a node id: tries the
/// same file first, then falls back to a title match anywhere in the graph.
fn resolve_symbol_by_name(
    strata: &Strata,
    file_path: &str,
    name: &str,
    label: &str,
) -> Result<Option<String>> {
    let same_file_id = identity::code_symbol_id(file_path, name, label);
    if strata.store().get_node(&same_file_id)?.is_some() {
        return Ok(Some(same_file_id));
    }
    Ok(strata.store().find_by_title(name)?.map(|n| n.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;

    fn sample() -> ModuleRecord {
        ModuleRecord {
            file_path: "src/cache.rs".to_string(),
            content: "struct Cache; impl Cache { fn evict(&mut self) {} }".to_string(),
            imports: vec![],
            symbols: vec![
                SymbolRecord {
                    qualified_name: "Cache".to_string(),
                    kind: CodeSymbolKind::Class,
                    content: "struct Cache;".to_string(),
                    line_start: Some(1),
                    line_end: Some(1),
                    member_of: None,
                    inherits: vec![],
                    implements: vec![],
                },
                SymbolRecord {
                    qualified_name: "Cache::evict".to_string(),
                    kind: CodeSymbolKind::Function,
                    content: "fn evict(&mut self) {}".to_string(),
                    line_start: Some(2),
                    line_end: Some(2),
                    member_of: Some("Cache".to_string()),
                    inherits: vec![],
                    implements: vec![],
                },
            ],
        }
    }

    #[test]
    fn ingests_module_and_children_with_edges() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        let report = ingest_code_file(&strata, &sample()).unwrap();
        assert_eq!(report.nodes_ingested, 3); // module + class + function
        assert!(report.edges_created >= 2); // DEFINES x2 (+ MEMBER_OF)

        let module_id = module_id("src/cache.rs");
        let neighbors = strata
            .graph()
            .neighbors(&module_id, crate::model::Direction::Outgoing, Some(&[EdgeType::Defines]))
            .unwrap();
        assert_eq!(neighbors.len(), 2);
    }

    #[test]
    fn reingesting_unchanged_file_creates_no_new_nodes() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        ingest_code_file(&strata, &sample()).unwrap();
        let before = strata.store().all_node_ids().unwrap().len();
        let report = ingest_code_file(&strata, &sample()).unwrap();
        assert_eq!(report.nodes_ingested, 0);
        assert_eq!(report.nodes_skipped, 1);
        assert_eq!(strata.store().all_node_ids().unwrap().len(), before);
    }

    #[test]
    fn modified_file_is_reingested() {
        let strata = Strata::open_in_memory(StrataConfig::default()).unwrap();
        ingest_code_file(&strata, &sample()).unwrap();
        let mut modified = sample();
        modified.content.push_str(" // changed");
        let report = ingest_code_file(&strata, &modified).unwrap();
        assert!(report.nodes_ingested > 0);
    }
}
