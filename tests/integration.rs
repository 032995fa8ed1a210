//! End-to-end integration tests for semix.
//!
//! These tests exercise the full path from triples through the resource
//! builder, the matching pipeline and the index to query execution.

use std::sync::Arc;

use semix::document::Document;
use semix::graph::{Concept, SPLIT_URL};
use semix::index::{DEFAULT_BUFFER_SIZE, Entry, Index};
use semix::kb::{Triples, TurtleParser};
use semix::memory::Memory;
use semix::query::Query;
use semix::resolve::Resolver;
use semix::resource::Resource;
use semix::rule::Rule;
use semix::search::Searcher;
use semix::stream::Pipeline;
use semix::traits::{AmbiguityPolicy, Trait, Traits};

fn count(index: &Index, url: &str) -> usize {
    let mut n = 0;
    index
        .get(url, |_| {
            n += 1;
            true
        })
        .unwrap();
    n
}

fn concept(resource: &Resource, url: &str) -> Arc<Concept> {
    Arc::clone(resource.graph().find(url).unwrap())
}

fn entry(concept: &str, relation: &str) -> Entry {
    Entry {
        concept_url: concept.into(),
        relation_url: relation.into(),
        origin_url: concept.into(),
        token: "t".into(),
        path: "doc".into(),
        begin: 1,
        end: 2,
        distance: 0,
        ambiguous: false,
    }
}

#[test]
fn transitive_relations_are_indexed() {
    let mut triples = Triples::new()
        .add("A", "p", "B")
        .add("B", "p", "C")
        .add("A", "label", "a")
        .add("B", "label", "b")
        .add("C", "label", "c");
    let traits = Traits::new()
        .with(Trait::Transitive, ["p"])
        .with(Trait::Distinct, ["label"]);
    let resource = Resource::build(&mut triples, &traits).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
    let tokens = Pipeline::new(&resource)
        .index(vec![Document::string("doc", "a, b oder c")], &index)
        .unwrap();
    assert_eq!(tokens.len(), 3);

    assert_eq!(count(&index, "A"), 1);
    assert_eq!(count(&index, "B"), 2);
    assert_eq!(count(&index, "C"), 3);
    assert_eq!(count(&index, "D"), 0);

    // the indirect entries of C come from A (by closure) and B
    let q = Query::parse("?(p({C}))").unwrap();
    let mut origins: Vec<String> = q.execute(&index).unwrap().into_iter().map(|e| e.origin_url).collect();
    origins.sort();
    assert_eq!(origins, vec!["A", "B"]);
    index.close().unwrap();
}

#[test]
fn split_ambiguous_labels() {
    let mut triples = Triples::new()
        .add("A", "label", "split-name")
        .add("B", "label", "split-name");
    let traits = Traits::new().with(Trait::Distinct, ["label"]);
    let resource = Resource::build(&mut triples, &traits).unwrap();

    let split = resource.graph().find("A-B").unwrap();
    let entry = resource.dictionary()["split name"];
    assert!(entry.ambiguous);
    assert_eq!(Some(entry.id), split.id());
    assert!(entry.encode() < 0);

    assert!(split.is_ambiguous());
    let graph = resource.graph();
    let mut edges: Vec<(&str, &str)> = split
        .edges()
        .iter()
        .map(|e| (graph.url_of(e.p), graph.url_of(e.o)))
        .collect();
    edges.sort();
    assert_eq!(edges, vec![(SPLIT_URL, "A"), (SPLIT_URL, "B")]);
}

#[test]
fn merged_ambiguous_labels_keep_common_edges() {
    let mut triples = Triples::new()
        .add("A1", "PA", "a")
        .add("A2", "PA", "a")
        .add("A1", "PB", "b")
        .add("A2", "PC", "c")
        .add("A1", "label", "name")
        .add("A2", "label", "name");
    let traits = Traits::new()
        .with(Trait::Distinct, ["label"])
        .with_policy(AmbiguityPolicy::Merge);
    let resource = Resource::build(&mut triples, &traits).unwrap();

    let merged = resource.lookup("name").unwrap();
    assert_eq!(merged.url(), "A1-A2");
    assert!(!merged.is_ambiguous());
    let graph = resource.graph();
    let edges: Vec<(&str, &str)> = merged
        .edges()
        .iter()
        .map(|e| (graph.url_of(e.p), graph.url_of(e.o)))
        .collect();
    assert_eq!(edges, vec![("PA", "a")]);
}

#[test]
fn queries_over_a_stored_index() {
    let dir = tempfile::TempDir::new().unwrap();
    let index = Index::open(dir.path(), 2).unwrap();
    index
        .put_entries(vec![
            entry("A", "R"),
            entry("A", "S"),
            entry("B", "R"),
            entry("B", "S"),
            entry("A", ""),
            entry("B", ""),
        ])
        .unwrap();
    index.flush().unwrap();

    let run = |src: &str| {
        let mut got: Vec<String> = Query::parse(src)
            .unwrap()
            .execute(&index)
            .unwrap()
            .iter()
            .map(|e| format!("{}{}", e.concept_url, e.relation_url))
            .collect();
        got.sort();
        got
    };
    assert_eq!(run("?({R,S}({A,B}))"), vec!["AR", "AS", "BR", "BS"]);
    assert_eq!(run("?(!{S}({A,B}))"), vec!["AR", "BR"]);
    assert_eq!(run("?({}({A,B}))"), vec!["A", "B"]);
    assert_eq!(run("?(*(*))"), vec!["AR", "AS", "BR", "BS"]);
    index.close().unwrap();
}

#[test]
fn frequency_resolver_follows_the_memory() {
    let mut triples = Triples::new().add("A", "label", "x").add("B", "label", "x");
    let traits = Traits::new().with(Trait::Distinct, ["label"]);
    let resource = Resource::build(&mut triples, &traits).unwrap();
    let ambiguous = resource.lookup("x").unwrap();
    let (a, b) = (concept(&resource, "A"), concept(&resource, "B"));

    let mut memory = Memory::new(3, Arc::clone(resource.graph()));
    for c in [&a, &b, &b] {
        memory.push(Arc::clone(c));
    }
    let r = Resolver::Frequency;
    assert_eq!(r.resolve(&ambiguous, &memory).unwrap().url(), "B");
    memory.push(Arc::clone(&a));
    memory.push(Arc::clone(&a));
    assert_eq!(r.resolve(&ambiguous, &memory).unwrap().url(), "A");
}

#[test]
fn rules_evaluate_to_truth_values() {
    let lookup = |name: &str| match name {
        "a" => Some(1u32),
        "b" => Some(2),
        "c" => Some(3),
        _ => None,
    };
    let graph = Arc::new(semix::graph::Graph::new());
    let memory = Memory::new(1, graph);
    for src in ["pow(1*2,2+1)=8", r#"min({"a","b","c"})=1"#] {
        let rule = Rule::compile(src, &lookup).unwrap();
        assert_eq!(rule.execute(&memory), 1.0, "{src}");
    }
}

#[test]
fn pipeline_resolves_homographs_from_context() {
    let kb = r#"
@prefix x: <http://x/> .
x:money-bank x:label "bank", "money" ; x:broader x:finance .
x:river-bank x:label "bank", "river" ; x:broader x:nature .
"#;
    let traits = Traits::new()
        .with(Trait::Distinct, ["http://x/label"])
        .with(Trait::Transitive, ["http://x/broader"]);
    let resource = Resource::build(&mut TurtleParser::new(kb.as_bytes()), &traits).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
    let text = "the money went to the bank";
    let tokens = Pipeline::new(&resource)
        .with_resolver(Resolver::Frequency, 10)
        .index(vec![Document::string("doc", text)], &index)
        .unwrap();
    let urls: Vec<&str> = tokens.iter().filter_map(|t| t.concept.as_deref()).map(|c| c.url()).collect();
    assert_eq!(urls, vec!["http://x/money-bank", "http://x/money-bank"]);

    let searcher = Searcher::new(&resource);
    let resolve = |ident: &str| searcher.resolve_ident(ident);
    let q = Query::parse_with("?(broader({finance}))", &resolve).unwrap();
    let entries = q.execute(&index).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.origin_url == "http://x/money-bank" && !e.ambiguous));
    assert!(q.execute(&index).unwrap().iter().all(|e| e.path == "doc"));

    // without a resolver both meanings are indexed, flagged as ambiguous
    let dir = tempfile::TempDir::new().unwrap();
    let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
    Pipeline::new(&resource)
        .index(vec![Document::string("doc", "the bank")], &index)
        .unwrap();
    for src in [
        "?({}({http://x/money-bank,http://x/river-bank}))",
        "?*({}({http://x/money-bank,http://x/river-bank}))",
    ] {
        let entries = Query::parse(src).unwrap().execute(&index).unwrap();
        assert_eq!(entries.len(), 2, "{src}");
        assert!(entries.iter().all(|e| e.ambiguous), "{src}");
    }
}

#[test]
fn stored_fuzzy_and_ambiguous_entries_are_returned() {
    let dir = tempfile::TempDir::new().unwrap();
    let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
    let mut ambiguous = entry("C", "R");
    ambiguous.ambiguous = true;
    let mut fuzzy = entry("C", "R");
    fuzzy.distance = 1;
    index.put_entries(vec![ambiguous, fuzzy, entry("C", "R")]).unwrap();
    index.flush().unwrap();

    let got = Query::parse("?({R}({C}))").unwrap().execute(&index).unwrap();
    assert_eq!(got.len(), 3);
    assert_eq!(
        got.iter().map(|e| (e.distance, e.ambiguous)).collect::<Vec<_>>(),
        vec![(0, true), (1, false), (0, false)]
    );
    index.close().unwrap();
}
