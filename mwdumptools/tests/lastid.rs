//! Last-id scans over synthetic compressed dumps.

use std::io::Write;

use bzip2::write::BzEncoder;
use bzip2::Compression;

use mwdumptools::lastid::{find_last_id, IdKind};

fn page(id: i64, filler_words: usize) -> String {
    let mut text = format!(
        "  <page>\n    <title>Page {id}</title>\n    <ns>0</ns>\n    <id>{id}</id>\n    \
         <revision>\n      <id>{rev}</id>\n      <text xml:space=\"preserve\">",
        rev = id * 10
    );
    for word in 0..filler_words {
        text.push_str(&format!("w{id}x{word} "));
    }
    text.push_str("</text>\n    </revision>\n  </page>\n");
    text
}

fn dump(ids: &[i64], filler_words: usize) -> Vec<u8> {
    let mut text = String::from(
        "<mediawiki xmlns=\"http://www.mediawiki.org/xml/export-0.10/\">\n  <siteinfo>\n    \
         <sitename>Testwiki</sitename>\n  </siteinfo>\n",
    );
    for &id in ids {
        text.push_str(&page(id, filler_words));
    }
    text.push_str("</mediawiki>\n");
    text.into_bytes()
}

fn compress(data: &[u8], level: u32) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn single_block_file() {
    let file = compress(&dump(&[7, 23, 42], 4), 9);
    assert_eq!(find_last_id(&file, IdKind::Page), Some(42));
    assert_eq!(find_last_id(&file, IdKind::Rev), Some(420));
}

#[test]
fn multi_block_file() {
    // enough filler for several 100k blocks at level 1
    let ids: Vec<i64> = (1..=300).collect();
    let file = compress(&dump(&ids, 100), 1);
    assert_eq!(find_last_id(&file, IdKind::Page), Some(300));
    assert_eq!(find_last_id(&file, IdKind::Rev), Some(3000));
}

#[test]
fn corrupt_final_block_falls_back_to_intact_blocks() {
    let ids: Vec<i64> = (1..=300).collect();
    let file = compress(&dump(&ids, 100), 1);

    // cut deep into the last block: the trailer is gone and the final
    // block no longer decodes, but earlier blocks are intact
    let truncated = &file[..file.len() * 4 / 5];
    let id = find_last_id(truncated, IdKind::Page).expect("ids from intact blocks");
    assert!((1..=300).contains(&id));

    // idempotence
    assert_eq!(find_last_id(truncated, IdKind::Page), Some(id));
}

#[test]
fn no_ids_at_all() {
    let file = compress(b"nothing xml-ish in here, just text\n", 9);
    assert_eq!(find_last_id(&file, IdKind::Page), None);
    assert_eq!(find_last_id(&file, IdKind::Rev), None);
}

#[test]
fn page_id_found_even_when_revision_id_comes_first_in_window() {
    // a small dump where revision ids outnumber page ids; the page scan
    // must keep matching group two, not the revision ids
    let mut text = String::from("<mediawiki>\n  <siteinfo>\n  </siteinfo>\n");
    text.push_str(&page(42, 2));
    text.push_str("</mediawiki>\n");
    let file = compress(text.as_bytes(), 9);
    assert_eq!(find_last_id(&file, IdKind::Page), Some(42));
}
