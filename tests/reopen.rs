//! Reopen behavior: persistence across close/open cycles, header
//! precedence over open-time parameters, and rejection of damaged files.

use std::io::{Seek, SeekFrom, Write};

use tempfile::tempdir;
use treeline::{BTreeIndex, Error};

#[test]
fn reopened_tree_serves_identical_results() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");
    let keys: Vec<String> = (0..120).map(|i| format!("key{i:03}")).collect();

    {
        let mut index = BTreeIndex::open(&path, 2, 8).unwrap();
        for (i, key) in keys.iter().enumerate() {
            index.put(key.as_bytes(), i as u64).unwrap();
        }
        for key in keys.iter().step_by(3) {
            index.remove(key.as_bytes()).unwrap();
        }
        index.sync().unwrap();
    }

    let index = BTreeIndex::open(&path, 2, 8).unwrap();
    assert_eq!(index.size(), 80);
    for (i, key) in keys.iter().enumerate() {
        let expected = if i % 3 == 0 { None } else { Some(i as u64) };
        assert_eq!(index.get(key.as_bytes()).unwrap(), expected, "key {key}");
    }
}

#[test]
fn reopen_preserves_structure_and_free_stack() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");

    let (root_keys, children, free, node_count) = {
        let mut index = BTreeIndex::open(&path, 2, 8).unwrap();
        for key in ["a", "b", "c", "d"] {
            index.put(key.as_bytes(), 1).unwrap();
        }
        index.remove(b"a").unwrap();
        index.remove(b"c").unwrap();
        (
            index.keys_of(0).unwrap(),
            index.children_of(0).unwrap(),
            index.free_nodes().unwrap(),
            index.node_count(),
        )
    };

    let index = BTreeIndex::open(&path, 2, 8).unwrap();
    assert_eq!(index.keys_of(0).unwrap(), root_keys);
    assert_eq!(index.children_of(0).unwrap(), children);
    assert_eq!(index.free_nodes().unwrap(), free);
    assert_eq!(index.node_count(), node_count);
}

#[test]
fn header_parameters_win_over_open_arguments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");
    {
        let mut index = BTreeIndex::open(&path, 2, 8).unwrap();
        index.put(b"a", 1).unwrap();
    }

    let index = BTreeIndex::open(&path, 64, 32).unwrap();

    assert_eq!(index.degree(), 2);
    assert_eq!(index.key_size(), 8);
    assert_eq!(index.max_keys_per_node(), 3);
    assert_eq!(index.min_keys_per_node(), 1);
    assert_eq!(index.max_children_per_node(), 4);
    assert_eq!(index.get(b"a").unwrap(), Some(1));
}

#[test]
fn open_rejects_bad_parameters_before_touching_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");

    assert!(matches!(
        BTreeIndex::open(&path, 1, 8),
        Err(Error::InvalidParam { .. })
    ));
    assert!(matches!(
        BTreeIndex::open(&path, 2, 7),
        Err(Error::InvalidParam { .. })
    ));
    assert!(matches!(
        BTreeIndex::open(&path, 2, 136),
        Err(Error::InvalidParam { .. })
    ));
    assert!(!path.exists());
}

#[test]
fn open_rejects_file_with_trailing_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");
    drop(BTreeIndex::open(&path, 2, 8).unwrap());

    let mut raw = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    raw.write_all(&[0xAB; 17]).unwrap();
    drop(raw);

    assert!(matches!(
        BTreeIndex::open(&path, 2, 8),
        Err(Error::Corrupt { .. })
    ));
}

#[test]
fn open_rejects_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");
    std::fs::write(&path, [2u8; 40]).unwrap();

    assert!(matches!(
        BTreeIndex::open(&path, 2, 8),
        Err(Error::Corrupt { .. })
    ));
}

#[test]
fn open_rejects_corrupt_root_counts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");
    drop(BTreeIndex::open(&path, 2, 8).unwrap());

    // child_count 5 with key_count 0 cannot be a valid node shape
    let mut raw = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    raw.seek(SeekFrom::Start(20)).unwrap();
    raw.write_all(&5u32.to_be_bytes()).unwrap();
    drop(raw);

    assert!(matches!(
        BTreeIndex::open(&path, 2, 8),
        Err(Error::Corrupt { .. })
    ));
}

#[test]
fn existing_empty_file_is_initialized_in_place() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.btree");
    std::fs::File::create(&path).unwrap();

    let mut index = BTreeIndex::open(&path, 2, 8).unwrap();
    index.put(b"a", 1).unwrap();

    assert_eq!(index.size(), 1);
    assert_eq!(index.node_count(), 1);
}
