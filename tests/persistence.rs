//! Persistence tests for semix.
//!
//! These tests verify that index entries, the URL register and the compiled
//! resource survive a close + reopen cycle.

use semix::document::{self, Document};
use semix::index::storage::{ENTRY_SUFFIX, REGISTER_FILE, file_name};
use semix::index::{DEFAULT_BUFFER_SIZE, Entry, Index};
use semix::kb::Triples;
use semix::query::Query;
use semix::resource::Resource;
use semix::stream::{self, Pipeline};
use semix::traits::{Trait, Traits};

fn resource() -> Resource {
    let mut triples = Triples::new()
        .add("http://x/sun", "http://x/label", "sun")
        .add("http://x/sun", "http://x/is-a", "http://x/star")
        .add("http://x/star", "http://x/label", "star");
    let traits = Traits::new().with(Trait::Distinct, ["http://x/label"]);
    Resource::build(&mut triples, &traits).unwrap()
}

fn entries(index: &Index, query: &str) -> Vec<Entry> {
    Query::parse(query).unwrap().execute(index).unwrap()
}

#[test]
fn index_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let r = resource();

    // First session: index a document and close.
    {
        let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
        Pipeline::new(&r)
            .index(vec![Document::string("first", "the sun is a star")], &index)
            .unwrap();
        index.close().unwrap();
    }

    assert!(dir.path().join(REGISTER_FILE).exists());
    let star_file = file_name("http://x/star");
    assert_eq!(star_file, format!("x.star{ENTRY_SUFFIX}"));
    assert!(dir.path().join(&star_file).exists(), "{star_file}");

    // Second session: entries are back, and new ones are appended.
    {
        let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
        let star = entries(&index, "?({}({http://x/star}))");
        assert_eq!(star.len(), 1);
        assert_eq!(star[0].path, "first");
        assert_eq!(star[0].token, "star");
        let via = entries(&index, "?(*({http://x/star}))");
        assert_eq!(via.len(), 1);
        assert_eq!(via[0].relation_url, "http://x/is-a");
        assert_eq!(via[0].origin_url, "http://x/sun");

        Pipeline::new(&r)
            .index(vec![Document::string("second", "a star")], &index)
            .unwrap();
        index.close().unwrap();
    }

    // Third session: both documents are visible, in write order.
    let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
    let paths: Vec<String> = entries(&index, "?({}({http://x/star}))")
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert_eq!(paths, vec!["first", "second"]);
    assert_eq!(
        index.urls().unwrap(),
        vec!["http://x/star".to_string(), "http://x/sun".to_string()]
    );
    index.close().unwrap();
}

#[test]
fn entry_offsets_point_into_the_normalised_text() {
    let dir = tempfile::TempDir::new().unwrap();
    let r = resource();
    let doc = document::create_dump(dir.path(), "upload", "text/plain", "Look: the sun!").unwrap();
    let name = doc.path().to_string();
    assert!(document::is_dump(&name));

    let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
    Pipeline::new(&r).index(vec![doc], &index).unwrap();
    index.close().unwrap();

    let index = Index::open(dir.path(), DEFAULT_BUFFER_SIZE).unwrap();
    let sun = entries(&index, "?({}({http://x/sun}))");
    assert_eq!(sun.len(), 1);
    assert_eq!(sun[0].path, name);

    let text = stream::normalized(document::open_dump(dir.path(), &name)).unwrap().token;
    assert_eq!(&text[sun[0].begin..sun[0].end], "sun");
    let ctx = semix::index::context(&name, &text, sun[0].begin, sun[0].end, 4).unwrap();
    assert_eq!(ctx.before, "the ");
    assert_eq!(ctx.matched, "sun");

    let raw = document::read_dump(dir.path(), &name).unwrap();
    assert_eq!(raw, b"Look: the sun!");
    index.close().unwrap();
}

#[test]
fn resource_cache_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kb.cache");
    let r = resource();
    r.write_cache(&path).unwrap();
    let cached = Resource::read_cache(&path).unwrap();

    let run = |res: &Resource| -> Vec<String> {
        Pipeline::new(res)
            .run(vec![Document::string("d", "sun and star")])
            .unwrap()
            .iter()
            .filter_map(|t| t.concept.as_ref().map(|c| c.url().to_string()))
            .collect()
    };
    assert_eq!(run(&cached), run(&r));
    assert_eq!(run(&cached), vec!["http://x/sun", "http://x/star"]);
}
