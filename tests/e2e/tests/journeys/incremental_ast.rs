//! §8 scenario 5: incremental AST ingest skips unchanged files and re-ingests
//! changed ones.

use strata_core::ingest::{ingest_code_file, CodeSymbolKind, ModuleRecord, SymbolRecord};
use strata_e2e_tests::harness::TestDatabaseManager;

fn module() -> ModuleRecord {
    ModuleRecord {
        file_path: "m.py".to_string(),
        content: "class Greeter:\n    def hello(self):\n        pass\n".to_string(),
        imports: vec![],
        symbols: vec![
            SymbolRecord {
                qualified_name: "Greeter".to_string(),
                kind: CodeSymbolKind::Class,
                content: "class Greeter:".to_string(),
                line_start: Some(1),
                line_end: Some(1),
                member_of: None,
                inherits: vec![],
                implements: vec![],
            },
            SymbolRecord {
                qualified_name: "Greeter::hello".to_string(),
                kind: CodeSymbolKind::Function,
                content: "def hello(self): pass".to_string(),
                line_start: Some(2),
                line_end: Some(3),
                member_of: Some("Greeter".to_string()),
                inherits: vec![],
                implements: vec![],
            },
        ],
    }
}

#[test]
fn unchanged_reingest_is_a_noop_and_edited_file_is_reingested() {
    let db = TestDatabaseManager::new_temp();

    let first = ingest_code_file(&db.strata, &module()).unwrap();
    assert_eq!(first.nodes_ingested, 3); // module + class + function

    let before = db.node_count();
    let repeat = ingest_code_file(&db.strata, &module()).unwrap();
    assert_eq!(repeat.nodes_ingested, 0);
    assert_eq!(db.node_count(), before);

    let mut edited = module();
    edited.content.push_str("    # one more line\n");
    let changed = ingest_code_file(&db.strata, &edited).unwrap();
    assert!(changed.nodes_ingested > 0);
}
