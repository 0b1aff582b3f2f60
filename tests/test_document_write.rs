//! Integration tests for document assembly.
//!
//! Each test builds a document through the streaming API and checks the
//! produced bytes with a minimal scanner: startxref is resolved, the xref
//! table is parsed, and offsets are verified to land on `N G obj` headers.

use chrono::{TimeZone, Utc};
use pdf_scribe::{Dictionary, Document, DocumentConfig, Object};

/// Config with a pinned creation date so outputs are reproducible.
fn fixed_config() -> DocumentConfig {
    let date = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    DocumentConfig::default().with_info_entry("CreationDate", Object::date(date))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Parse the startxref footer into the xref table offset.
fn startxref(bytes: &[u8]) -> usize {
    let marker = b"startxref\n";
    let pos = rfind(bytes, marker).expect("startxref missing");
    let rest = &bytes[pos + marker.len()..];
    let end = rest.iter().position(|&b| b == b'\n').unwrap();
    std::str::from_utf8(&rest[..end]).unwrap().parse().unwrap()
}

/// Parse the xref table into `(offset, generation, kind)` entries.
fn xref_entries(bytes: &[u8]) -> Vec<(usize, u16, u8)> {
    let table = startxref(bytes);
    assert_eq!(&bytes[table..table + 5], b"xref\n");

    let header_end = find(bytes, b"\n", table + 5).unwrap();
    let header = std::str::from_utf8(&bytes[table + 5..header_end]).unwrap();
    let mut parts = header.split(' ');
    assert_eq!(parts.next(), Some("0"));
    let entry_count: usize = parts.next().unwrap().parse().unwrap();

    let mut entries = Vec::with_capacity(entry_count);
    let mut pos = header_end + 1;
    for _ in 0..entry_count {
        let line = &bytes[pos..pos + 20];
        let offset = std::str::from_utf8(&line[0..10]).unwrap().parse().unwrap();
        let gen = std::str::from_utf8(&line[11..16]).unwrap().parse().unwrap();
        entries.push((offset, gen, line[17]));
        pos += 20;
    }
    entries
}

/// Parse `/Size` out of the trailer dictionary.
fn trailer_size(bytes: &[u8]) -> i64 {
    let trailer = rfind(bytes, b"trailer\n").expect("trailer missing");
    let size = find(bytes, b"/Size ", trailer).expect("/Size missing");
    let digits: Vec<u8> = bytes[size + 6..]
        .iter()
        .copied()
        .take_while(|b| b.is_ascii_digit())
        .collect();
    std::str::from_utf8(&digits).unwrap().parse().unwrap()
}

mod file_structure_tests {
    use super::*;

    #[test]
    fn test_minimal_document_layout() {
        let mut doc = Document::with_config(
            fixed_config().with_auto_first_page(false).with_compress(false),
            Vec::new(),
        )
        .unwrap();
        doc.add_page(612.0, 792.0).unwrap();
        let bytes = doc.finish().unwrap();

        // header plus binary marker comment of four high bytes
        assert!(bytes.starts_with(b"%PDF-1.3\n%"));
        assert!(bytes[10..14].iter().all(|&b| b >= 0x80));
        assert_eq!(bytes[14], b'\n');

        assert!(bytes.ends_with(b"\n%%EOF\n"));
        assert_eq!(count(&bytes, b"\nxref\n"), 1);
    }

    #[test]
    fn test_xref_offsets_point_at_object_headers() {
        let mut doc = Document::with_config(fixed_config(), Vec::new()).unwrap();
        let extra = doc.ref_with(Object::dict(vec![("Kind", Object::name("Extra"))]));
        doc.end(extra).unwrap();
        let bytes = doc.finish().unwrap();

        let entries = xref_entries(&bytes);
        assert_eq!(entries[0], (0, 65535, b'f'));

        for (number, (offset, gen, kind)) in entries.iter().enumerate().skip(1) {
            assert_eq!(*kind, b'n');
            let expected = format!("{} {} obj", number, gen);
            assert_eq!(
                &bytes[*offset..*offset + expected.len()],
                expected.as_bytes(),
                "xref entry {} does not point at its object",
                number
            );
        }
    }

    #[test]
    fn test_trailer_size_matches_xref() {
        let mut doc = Document::with_config(
            fixed_config().with_auto_first_page(false),
            Vec::new(),
        )
        .unwrap();
        doc.add_page(612.0, 792.0).unwrap();
        let bytes = doc.finish().unwrap();

        let entries = xref_entries(&bytes);
        assert_eq!(trailer_size(&bytes) as usize, entries.len());
    }

    #[test]
    fn test_trailer_names_root_info_and_id() {
        let bytes = Document::with_config(fixed_config(), Vec::new())
            .unwrap()
            .finish()
            .unwrap();
        let content = String::from_utf8_lossy(&bytes);

        assert!(content.contains("/Root 3 0 R"));
        assert!(content.contains("/Info 1 0 R"));
        assert!(content.contains("/ID [<"));
        // both ID halves are identical
        let id_pos = content.find("/ID [<").unwrap();
        let tail = &content[id_pos + 6..];
        let first = &tail[..32];
        assert_eq!(&tail[35..67], first);
    }

    #[test]
    fn test_emission_order_does_not_have_to_match_numbering() {
        let mut doc = Document::with_config(fixed_config(), Vec::new()).unwrap();
        let a = doc.ref_with(Object::dict(vec![("Kind", Object::name("A"))]));
        let b = doc.ref_with(Object::dict(vec![("Kind", Object::name("B"))]));

        // end the later allocation first
        doc.end(b).unwrap();
        doc.end(a).unwrap();
        let bytes = doc.finish().unwrap();

        let entries = xref_entries(&bytes);
        let (offset_a, _, _) = entries[a.id as usize];
        let (offset_b, _, _) = entries[b.id as usize];
        assert!(offset_b < offset_a);

        let header_a = format!("{} 0 obj", a.id);
        assert_eq!(&bytes[offset_a..offset_a + header_a.len()], header_a.as_bytes());
    }

    #[test]
    fn test_output_is_reproducible() {
        let build = || {
            Document::with_config(fixed_config().with_title("Same"), Vec::new())
                .unwrap()
                .finish()
                .unwrap()
        };
        assert_eq!(build(), build());
    }
}

mod stream_tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_compressed_stream_round_trips() {
        let payload = vec![b'A'; 10_000];

        let mut doc = Document::with_config(fixed_config(), Vec::new()).unwrap();
        let content = doc.ref_with(Dictionary::new());
        doc.write(content, &payload).unwrap();
        doc.end(content).unwrap();
        let bytes = doc.finish().unwrap();

        let header = format!("{} 0 obj", content.id);
        let obj_pos = find(&bytes, header.as_bytes(), 0).unwrap();
        let text = String::from_utf8_lossy(&bytes[obj_pos..obj_pos + 200]);
        assert!(text.contains("/Filter /FlateDecode"));

        let length_pos = find(&bytes, b"/Length ", obj_pos).unwrap();
        let digits: Vec<u8> = bytes[length_pos + 8..]
            .iter()
            .copied()
            .take_while(|b| b.is_ascii_digit())
            .collect();
        let length: usize = std::str::from_utf8(&digits).unwrap().parse().unwrap();
        assert!(length < payload.len());

        let data_pos = find(&bytes, b"stream\n", obj_pos).unwrap() + 7;
        let data = &bytes[data_pos..data_pos + length];
        assert_eq!(&bytes[data_pos + length..data_pos + length + 11], &b"\nendstream\n"[..]);

        let mut inflated = Vec::new();
        flate2::read::ZlibDecoder::new(data)
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, payload);
    }

    #[test]
    fn test_uncompressed_stream_is_verbatim() {
        let mut doc = Document::with_config(
            fixed_config().with_compress(false),
            Vec::new(),
        )
        .unwrap();
        let content = doc.ref_with(Dictionary::new());
        doc.write(content, b"q 1 0 0 1 72 720 cm Q").unwrap();
        doc.end(content).unwrap();
        let bytes = doc.finish().unwrap();

        let content_str = String::from_utf8_lossy(&bytes);
        assert!(content_str.contains("/Length 21"));
        assert!(content_str.contains("stream\nq 1 0 0 1 72 720 cm Q\nendstream"));
        assert!(!content_str.contains("FlateDecode"));
    }

    #[test]
    fn test_stream_written_in_chunks() {
        let mut doc = Document::with_config(
            fixed_config().with_compress(false),
            Vec::new(),
        )
        .unwrap();
        let content = doc.ref_with(Dictionary::new());
        doc.write(content, b"first ").unwrap();
        doc.write(content, b"second").unwrap();
        doc.end(content).unwrap();
        let bytes = doc.finish().unwrap();

        assert!(String::from_utf8_lossy(&bytes).contains("stream\nfirst second\nendstream"));
    }
}

mod metadata_tests {
    use super::*;

    #[test]
    fn test_info_strings_in_output() {
        let bytes = Document::with_config(
            fixed_config().with_title("Test Document").with_author("Test Author"),
            Vec::new(),
        )
        .unwrap()
        .finish()
        .unwrap();
        let content = String::from_utf8_lossy(&bytes);

        assert!(content.contains("/Title (Test Document)"));
        assert!(content.contains("/Author (Test Author)"));
        assert!(content.contains("/CreationDate (D:20240115103000Z)"));
    }

    #[test]
    fn test_wide_title_is_utf16_with_bom() {
        let bytes = Document::with_config(
            fixed_config().with_title("Snow\u{2603}"),
            Vec::new(),
        )
        .unwrap()
        .finish()
        .unwrap();

        // BOM followed by the escaped UTF-16BE unit for "S"
        let needle = [0xFE, 0xFF, b'\\', b'0', b'0', b'0', b'S'];
        assert!(find(&bytes, &needle, 0).is_some());
    }

    #[test]
    fn test_producer_defaults_present() {
        let bytes = Document::with_config(fixed_config(), Vec::new())
            .unwrap()
            .finish()
            .unwrap();
        let content = String::from_utf8_lossy(&bytes);
        assert!(content.contains("/Producer (pdf_scribe"));
    }

    #[test]
    fn test_document_saved_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("document.pdf");

        let mut doc = Document::create(path.clone(), fixed_config()).unwrap();
        let content = doc.ref_with(Dictionary::new());
        doc.write(content, b"BT ET").unwrap();
        doc.end(content).unwrap();
        doc.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.3\n"));
        let entries = xref_entries(&bytes);
        assert!(entries.len() > 1);
    }
}
