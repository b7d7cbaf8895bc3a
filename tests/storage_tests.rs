//! Tests for the write-through persistence sink
//!
//! Verifies the per-record mount/open/write/close/unmount cycle, the exact
//! on-disk line format, payload escaping, and partial-failure isolation.

mod common;

use common::FakeStorage;
use lora_telemetry::storage::PersistenceSink;
use lora_telemetry::types::{LogRecord, Packet, StorageError};

fn sink(storage: FakeStorage) -> PersistenceSink<FakeStorage> {
    PersistenceSink::new(storage, "0:", "packets.txt")
}

// ============================================================================
// Line format
// ============================================================================

#[test]
fn two_records_produce_exactly_two_lines() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    let mut sink = sink(storage);

    sink.append_record(&LogRecord::new(1, "A")).unwrap();
    sink.append_record(&LogRecord::new(2, "B")).unwrap();

    assert_eq!(
        handle.inner.borrow().file,
        "Packet Num: 1, Contents: A\nPacket Num: 2, Contents: B\n"
    );
}

#[test]
fn each_record_performs_an_independent_mount_cycle() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    let mut sink = sink(storage);

    sink.append_record(&LogRecord::new(1, "A")).unwrap();
    sink.append_record(&LogRecord::new(2, "B")).unwrap();

    let inner = handle.inner.borrow();
    assert_eq!(inner.mount_calls, 2);
    assert_eq!(inner.open_calls, 2);
    assert_eq!(inner.write_calls, 2);
    assert_eq!(inner.close_calls, 2);
    assert_eq!(inner.unmount_calls, 2);
    assert!(!inner.mounted, "volume left mounted between records");
}

#[test]
fn record_from_packet_carries_the_session_sequence() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    let mut sink = sink(storage);

    let packet = Packet::from_bytes(b"Hello");
    sink.append_record(&LogRecord::from_packet(7, &packet))
        .unwrap();

    assert_eq!(
        handle.inner.borrow().file,
        "Packet Num: 7, Contents: Hello\n"
    );
}

// ============================================================================
// Escaping
// ============================================================================

#[test]
fn embedded_newlines_cannot_break_line_boundaries() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    let mut sink = sink(storage);

    sink.append_record(&LogRecord::new(1, "line1\nline2\r"))
        .unwrap();
    sink.append_record(&LogRecord::new(2, "B")).unwrap();

    let inner = handle.inner.borrow();
    assert_eq!(
        inner.file,
        "Packet Num: 1, Contents: line1\\nline2\\r\nPacket Num: 2, Contents: B\n"
    );
    // Exactly one physical line per record
    assert_eq!(inner.file.matches('\n').count(), 2);
}

#[test]
fn backslashes_are_escaped_so_escapes_stay_reversible() {
    let record = LogRecord::new(3, "a\\nb");
    assert_eq!(record.payload_text(), "a\\\\nb");
}

#[test]
fn non_printable_bytes_are_hex_escaped() {
    let packet = Packet::from_bytes(&[0x00, b'O', b'K', 0xFF]);
    let record = LogRecord::from_packet(4, &packet);
    assert_eq!(record.payload_text(), "\\x00OK\\xFF");
}

// ============================================================================
// Failure handling and unwind
// ============================================================================

#[test]
fn mount_failure_is_stage_tagged_and_clean() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    handle.inner.borrow_mut().fail_mount = Some(13);
    let mut sink = sink(storage);

    assert_eq!(
        sink.append_record(&LogRecord::new(1, "A")),
        Err(StorageError::MountFailed(13))
    );
    let inner = handle.inner.borrow();
    // Nothing past the failed stage ran
    assert_eq!(inner.open_calls, 0);
    assert_eq!(inner.unmount_calls, 0);
}

#[test]
fn open_failure_still_unmounts() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    handle.inner.borrow_mut().fail_open = Some(4);
    let mut sink = sink(storage);

    assert_eq!(
        sink.append_record(&LogRecord::new(1, "A")),
        Err(StorageError::OpenFailed(4))
    );
    let inner = handle.inner.borrow();
    assert_eq!(inner.unmount_calls, 1);
    assert!(!inner.mounted);
}

#[test]
fn write_failure_still_closes_and_unmounts() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    handle.inner.borrow_mut().fail_write_on_call = Some((1, 9));
    let mut sink = sink(storage);

    assert_eq!(
        sink.append_record(&LogRecord::new(1, "A")),
        Err(StorageError::WriteFailed(9))
    );
    let inner = handle.inner.borrow();
    assert_eq!(inner.close_calls, 1);
    assert_eq!(inner.unmount_calls, 1);
    assert!(!inner.mounted);
}

#[test]
fn short_write_is_reported_with_counts() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    handle.inner.borrow_mut().short_write_on_call = Some((1, 5));
    let mut sink = sink(storage);

    let record = LogRecord::new(1, "A");
    let expected = record.format_line().len();
    assert_eq!(
        sink.append_record(&record),
        Err(StorageError::ShortWrite {
            written: 5,
            expected,
        })
    );
}

#[test]
fn close_failure_after_good_write_is_its_own_stage() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    handle.inner.borrow_mut().fail_close = Some(2);
    let mut sink = sink(storage);

    assert_eq!(
        sink.append_record(&LogRecord::new(1, "A")),
        Err(StorageError::CloseFailed(2))
    );
    let inner = handle.inner.borrow();
    // The payload reached the medium and the volume was released
    assert_eq!(inner.file, "Packet Num: 1, Contents: A\n");
    assert_eq!(inner.unmount_calls, 1);
}

#[test]
fn a_failed_record_does_not_block_later_records() {
    let storage = FakeStorage::new();
    let handle = storage.clone();
    handle.inner.borrow_mut().fail_write_on_call = Some((2, 9));
    let mut sink = sink(storage);

    sink.append_record(&LogRecord::new(1, "first")).unwrap();
    assert_eq!(
        sink.append_record(&LogRecord::new(2, "second")),
        Err(StorageError::WriteFailed(9))
    );
    sink.append_record(&LogRecord::new(3, "third")).unwrap();

    let inner = handle.inner.borrow();
    // The first record is intact and the third landed after the failure
    assert_eq!(
        inner.file,
        "Packet Num: 1, Contents: first\nPacket Num: 3, Contents: third\n"
    );
    assert_eq!(inner.mount_calls, 3);
    assert_eq!(inner.unmount_calls, 3);
}
