//! Splicer scenarios over synthetic dumps on disk.

use std::fs;

use mwdumptools::iohandlers::{InputHandler, OutputHandler};
use mwdumptools::splice::{parse_fspecs, Splicer};

fn page(id: i64) -> String {
    format!(
        "  <page>\n    <title>Page {id}</title>\n    <ns>0</ns>\n    <id>{id}</id>\n    \
         <revision>\n      <id>{rev}</id>\n      <text xml:space=\"preserve\">text of page \
         {id}</text>\n    </revision>\n  </page>\n",
        rev = id * 10
    )
}

fn dump(ids: &[i64]) -> String {
    let mut text = String::from(
        "<mediawiki xmlns=\"http://www.mediawiki.org/xml/export-0.10/\">\n  <siteinfo>\n    \
         <sitename>Testwiki</sitename>\n  </siteinfo>\n",
    );
    for &id in ids {
        text.push_str(&page(id));
    }
    text.push_str("</mediawiki>\n");
    text
}

fn has_page(text: &str, id: i64) -> bool {
    text.contains(&format!("<title>Page {id}</title>"))
}

#[test]
fn single_range_upper_bound_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("dump.xml");
    fs::write(&in_path, dump(&[1, 5, 12, 17, 20, 25])).unwrap();

    let out_path = dir.path().join("out.xml");
    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let mut out = OutputHandler::create(Some(&out_path), false).unwrap();
    Splicer::new(false, false)
        .run_single(&mut input, &mut out, 12, Some(20))
        .unwrap();
    out.close().unwrap();

    let text = fs::read_to_string(&out_path).unwrap();
    assert!(text.starts_with("<mediawiki"));
    assert!(text.contains("<sitename>Testwiki</sitename>"));
    assert!(has_page(&text, 12));
    assert!(has_page(&text, 17));
    assert!(!has_page(&text, 1));
    assert!(!has_page(&text, 5));
    assert!(!has_page(&text, 20), "end id is exclusive");
    assert!(!has_page(&text, 25));
    assert!(text.ends_with("</mediawiki>\n"));
    // the header appears exactly once
    assert_eq!(text.matches("<mediawiki").count(), 1);
}

#[test]
fn open_ended_range_runs_to_eof() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("dump.xml");
    fs::write(&in_path, dump(&[1, 5, 12])).unwrap();

    let out_path = dir.path().join("out.xml");
    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let mut out = OutputHandler::create(Some(&out_path), false).unwrap();
    Splicer::new(false, false)
        .run_single(&mut input, &mut out, 5, None)
        .unwrap();
    out.close().unwrap();

    let text = fs::read_to_string(&out_path).unwrap();
    assert!(!has_page(&text, 1));
    assert!(has_page(&text, 5));
    assert!(has_page(&text, 12));
}

#[test]
fn noheader_nofooter() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("dump.xml");
    fs::write(&in_path, dump(&[3, 4])).unwrap();

    let out_path = dir.path().join("out.xml");
    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let mut out = OutputHandler::create(Some(&out_path), false).unwrap();
    Splicer::new(true, true)
        .run_single(&mut input, &mut out, 1, None)
        .unwrap();
    out.close().unwrap();

    let text = fs::read_to_string(&out_path).unwrap();
    assert!(!text.contains("<mediawiki"));
    assert!(!text.contains("</mediawiki>"));
    assert!(text.trim_start().starts_with("<page>"));
    assert!(has_page(&text, 3));
    assert!(has_page(&text, 4));
}

#[test]
fn multi_output_hands_page_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("dump.xml");
    fs::write(&in_path, dump(&[1, 5, 12, 17, 20, 25])).unwrap();

    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let specs = parse_fspecs("first.xml:1:13;second.xml:13:").unwrap();
    Splicer::new(false, false)
        .run_multi(&mut input, dir.path(), &specs)
        .unwrap();

    let first = fs::read_to_string(dir.path().join("first.xml")).unwrap();
    assert!(first.starts_with("<mediawiki"));
    assert!(has_page(&first, 1));
    assert!(has_page(&first, 5));
    assert!(has_page(&first, 12));
    // page 17 triggered the end of the first range and belongs to the next
    assert!(!has_page(&first, 17));
    assert!(first.ends_with("</mediawiki>\n"));

    let second = fs::read_to_string(dir.path().join("second.xml")).unwrap();
    assert!(second.starts_with("<mediawiki"), "saved header re-emitted");
    assert!(has_page(&second, 17), "carried page flushed into its range");
    assert!(has_page(&second, 20));
    assert!(has_page(&second, 25));
    assert!(!has_page(&second, 12));
    assert!(second.ends_with("</mediawiki>\n"));
}

#[test]
fn multi_output_compressed_files() {
    use std::io::Read;

    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("dump.xml");
    fs::write(&in_path, dump(&[2, 9, 11])).unwrap();

    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let specs = parse_fspecs("a.xml.bz2:1:10;b.xml.bz2:10:").unwrap();
    Splicer::new(false, false)
        .run_multi(&mut input, dir.path(), &specs)
        .unwrap();

    let mut first = String::new();
    bzip2::read::MultiBzDecoder::new(fs::File::open(dir.path().join("a.xml.bz2")).unwrap())
        .read_to_string(&mut first)
        .unwrap();
    assert!(has_page(&first, 2));
    assert!(has_page(&first, 9));
    assert!(!has_page(&first, 11));

    let mut second = String::new();
    bzip2::read::MultiBzDecoder::new(fs::File::open(dir.path().join("b.xml.bz2")).unwrap())
        .read_to_string(&mut second)
        .unwrap();
    assert!(has_page(&second, 11));
}
