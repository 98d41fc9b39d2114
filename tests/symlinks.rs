mod common;

use common::*;
use contentmon::fs::mock::MockFileSystem;
use contentmon::types::RawEvent;

fn linked_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/data/v1/a.json", b"v1".to_vec());
    fs.add_symlink("/cfg", "/data/v1");
    fs
}

#[test]
fn canonical_reports_map_to_logical_path() {
    let fixture = Fixture::started(&["/cfg/a.json"], linked_tree());
    assert_eq!(fixture.recorder.drain(), vec![changed("/cfg/a.json", b"v1")]);

    fixture.fs.add_file("/data/v1/a.json", b"v2".to_vec());
    fixture.control.emit(vec![RawEvent::file("/data/v1/a.json")]);

    assert_eq!(fixture.drain(), vec![changed("/cfg/a.json", b"v2")]);
}

#[test]
fn delete_of_canonical_path_resolves_through_seeded_alias() {
    let fixture = Fixture::started(&["/cfg/a.json"], linked_tree());
    fixture.recorder.drain();

    // No event for this path was seen before it vanished.
    fixture.fs.remove_file("/data/v1/a.json");
    fixture.control.emit(vec![RawEvent::file("/data/v1/a.json")]);
    assert_eq!(fixture.drain(), vec![removed("/cfg/a.json")]);

    // The alias was consumed; a second report for the gone path is unknown.
    fixture.control.emit(vec![RawEvent::file("/data/v1/a.json")]);
    assert!(fixture.drain().is_empty());
}

#[test]
fn literal_delete_report_for_logical_path() {
    let fs = MockFileSystem::new();
    fs.add_file("/cfg/a.json", b"x".to_vec());
    let fixture = Fixture::started(&["/cfg/a.json"], fs);
    fixture.recorder.drain();

    fixture.fs.remove_file("/cfg/a.json");
    fixture.control.emit(vec![RawEvent::file("/cfg/a.json")]);
    assert_eq!(fixture.drain(), vec![removed("/cfg/a.json")]);
}

#[test]
fn retargeted_link_is_picked_up_by_fault_resync() {
    let fixture = Fixture::started(&["/cfg/a.json"], linked_tree());
    fixture.recorder.drain();

    // Atomic swap of the whole directory: the stream sees nothing useful.
    fixture.fs.add_file("/data/v2/a.json", b"v2".to_vec());
    fixture.fs.add_symlink("/cfg", "/data/v2");
    fixture.control.emit(vec![RawEvent::new(
        "/cfg",
        contentmon::types::EventFlags::ROOT_CHANGED,
    )]);

    assert_eq!(fixture.drain(), vec![changed("/cfg/a.json", b"v2")]);
}
