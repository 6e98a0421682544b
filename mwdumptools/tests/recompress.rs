//! Recompressor stream-rotation and index scenarios.

use std::fs;
use std::io::Read;

use mwdumptools::iohandlers::{InputHandler, OutputHandler};
use mwdumptools::recompress::Recompressor;

fn page(id: i64) -> String {
    format!(
        "  <page>\n    <title>Page {id}</title>\n    <ns>0</ns>\n    <id>{id}</id>\n    \
         <revision>\n      <id>{rev}</id>\n      <text xml:space=\"preserve\">text of page \
         {id}</text>\n    </revision>\n  </page>\n",
        rev = id * 10
    )
}

fn pages_only(ids: &[i64]) -> String {
    let mut text = String::new();
    for &id in ids {
        text.push_str(&page(id));
    }
    text.push_str("</mediawiki>\n");
    text
}

fn full_dump(ids: &[i64]) -> String {
    let mut text = String::from(
        "<mediawiki xmlns=\"http://www.mediawiki.org/xml/export-0.10/\">\n  <siteinfo>\n    \
         <sitename>Testwiki</sitename>\n  </siteinfo>\n",
    );
    text.push_str(&pages_only(ids));
    text
}

fn parse_index(text: &str) -> Vec<(u64, i64, String)> {
    text.lines()
        .map(|line| {
            let mut fields = line.splitn(3, ':');
            (
                fields.next().unwrap().parse().unwrap(),
                fields.next().unwrap().parse().unwrap(),
                fields.next().unwrap().to_string(),
            )
        })
        .collect()
}

#[test]
fn headerless_input_indexes_from_offset_zero() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("pages.xml");
    fs::write(&in_path, pages_only(&[1, 2, 3, 4, 5, 6])).unwrap();

    let out_path = dir.path().join("out.xml");
    let index_path = dir.path().join("out.index");

    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let mut out = OutputHandler::create(Some(&out_path), false).unwrap();
    let mut index = OutputHandler::create(Some(&index_path), false).unwrap();
    Recompressor::new(2)
        .run(&mut input, &mut out, Some(&mut index))
        .unwrap();
    out.close().unwrap();
    index.close().unwrap();

    // plain output is a straight copy
    assert_eq!(
        fs::read_to_string(&out_path).unwrap(),
        pages_only(&[1, 2, 3, 4, 5, 6])
    );

    // six pages at two per stream give three index lines, offsets strictly
    // increasing from zero
    let index = parse_index(&fs::read_to_string(&index_path).unwrap());
    assert_eq!(index.len(), 3);
    assert_eq!(index[0].0, 0);
    assert!(index[0].0 < index[1].0 && index[1].0 < index[2].0);
    assert_eq!(
        index.iter().map(|e| e.1).collect::<Vec<_>>(),
        vec![1, 3, 5]
    );
    assert_eq!(index[0].2, "Page 1");
}

#[test]
fn compressed_output_streams_start_at_indexed_offsets() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("dump.xml");
    let dump = full_dump(&[10, 11, 12, 13, 14, 15]);
    fs::write(&in_path, &dump).unwrap();

    let out_path = dir.path().join("out.xml.bz2");
    let index_path = dir.path().join("out.index");

    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let mut out = OutputHandler::create(Some(&out_path), false).unwrap();
    let mut index = OutputHandler::create(Some(&index_path), false).unwrap();
    Recompressor::new(2)
        .run(&mut input, &mut out, Some(&mut index))
        .unwrap();
    out.close().unwrap();
    index.close().unwrap();

    // the concatenated streams decompress back to the input
    let compressed = fs::read(&out_path).unwrap();
    let mut rebuilt = String::new();
    bzip2::read::MultiBzDecoder::new(&compressed[..])
        .read_to_string(&mut rebuilt)
        .unwrap();
    assert_eq!(rebuilt, dump);

    let index = parse_index(&fs::read_to_string(&index_path).unwrap());
    assert_eq!(index.len(), 3);
    assert_eq!(
        index.iter().map(|e| e.1).collect::<Vec<_>>(),
        vec![10, 12, 14]
    );
    // the siteinfo header went into its own stream, so the first page
    // stream starts past it
    assert!(index[0].0 > 0);
    // every indexed offset is the start of a bzip2 stream
    for (offset, _, _) in &index {
        assert_eq!(&compressed[*offset as usize..*offset as usize + 3], b"BZh");
    }
}

#[test]
fn compressed_index_file() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("pages.xml");
    fs::write(&in_path, pages_only(&[4, 8])).unwrap();

    let out_path = dir.path().join("out.xml");
    let index_path = dir.path().join("index.txt.bz2");

    let mut input = InputHandler::open(Some(&in_path)).unwrap();
    let mut out = OutputHandler::create(Some(&out_path), false).unwrap();
    let mut index = OutputHandler::create(Some(&index_path), false).unwrap();
    Recompressor::new(5)
        .run(&mut input, &mut out, Some(&mut index))
        .unwrap();
    out.close().unwrap();
    index.close().unwrap();

    let mut text = String::new();
    bzip2::read::MultiBzDecoder::new(fs::File::open(&index_path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let index = parse_index(&text);
    assert_eq!(index.len(), 1);
    assert_eq!(index[0], (0, 4, "Page 4".to_string()));
}
