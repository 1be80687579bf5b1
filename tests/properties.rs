//! Property tests over randomly generated flat directory trees, checking
//! the resumption and budget invariants against a reference full
//! serialization.

use std::fs;

use proptest::collection::vec as pvec;
use proptest::prelude::*;
use tarindex::entry::RECORD_SIZE;
use tarindex::index::build_index_file;
use tarindex::reader::IndexReader;

fn build_tree(sizes: &[usize]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    for (i, size) in sizes.iter().enumerate() {
        fs::write(dir.path().join(format!("f{i}.bin")), vec![b'a'; *size]).unwrap();
    }
    let index_path = dir.path().join("index.bin");
    build_index_file(dir.path(), &index_path).unwrap();
    (dir, index_path)
}

fn full_serialization(index_path: &std::path::Path) -> Vec<u8> {
    let mut reader = IndexReader::open(index_path, None).unwrap();
    let mut out = Vec::new();
    reader.write_tar(&mut out, None).unwrap();
    out
}

proptest! {
    #[test]
    fn byte_exact_resumption(sizes in pvec(0usize..300, 0..4)) {
        let (_dir, index_path) = build_tree(&sizes);
        let full = full_serialization(&index_path);
        let total = full.len() as u64;

        for &p in &[0, total / 3, total / 2, total] {
            let mut reader = IndexReader::open(&index_path, None).unwrap();
            let mut tail = Vec::new();
            reader.seek_and_write(None, p, 0, &mut tail, None).unwrap();
            prop_assert_eq!(&tail[..], &full[p as usize..]);
        }
    }

    #[test]
    fn budget_correctness(sizes in pvec(0usize..300, 0..4), frac in 0u64..100) {
        let (_dir, index_path) = build_tree(&sizes);
        let full = full_serialization(&index_path);
        let total = full.len() as u64;

        let p = (total * frac) / 100;
        let m = (total - p) / 2;

        let mut reader = IndexReader::open(&index_path, None).unwrap();
        let mut got = Vec::new();
        reader.seek_and_write(None, p, p + m, &mut got, None).unwrap();

        prop_assert_eq!(got.len() as u64, m);
        prop_assert_eq!(&got[..], &full[p as usize..(p + m) as usize]);
    }

    #[test]
    fn length_correctness(sizes in pvec(0usize..300, 0..4)) {
        let (_dir, index_path) = build_tree(&sizes);
        let reader = IndexReader::open(&index_path, None).unwrap();
        let full = full_serialization(&index_path);
        prop_assert_eq!(reader.size(), full.len() as u64);
    }

    #[test]
    fn index_record_width(sizes in pvec(0usize..300, 0..6)) {
        let (_dir, index_path) = build_tree(&sizes);
        let len = fs::metadata(&index_path).unwrap().len();
        // header record + one record per listed entry (root dir + files)
        let n_entries = sizes.len() + 1;
        prop_assert_eq!(len, (RECORD_SIZE * (1 + n_entries)) as u64);
        prop_assert_eq!(len % RECORD_SIZE as u64, 0);
    }

    #[test]
    fn monotone_cumulative_offsets(sizes in pvec(0usize..300, 1..6)) {
        let (_dir, index_path) = build_tree(&sizes);
        let bytes = fs::read(&index_path).unwrap();
        // skip the header record; read each entry record's 8-byte LE offset
        let mut prev = 0u64;
        let mut offset = RECORD_SIZE;
        while offset < bytes.len() {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[offset..offset + 8]);
            let stored = u64::from_le_bytes(buf);
            prop_assert!(stored >= prev);
            prev = stored;
            offset += RECORD_SIZE;
        }
    }
}

#[test]
fn second_seek_always_fails() {
    let (_dir, index_path) = build_tree(&[10, 20]);
    let mut reader = IndexReader::open(&index_path, None).unwrap();
    reader.seek_byte(0).unwrap();
    assert!(matches!(
        reader.seek_byte(1),
        Err(tarindex::Error::NoSeek)
    ));
}
