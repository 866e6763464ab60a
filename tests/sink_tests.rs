use ring_logger::{FileSink, LineFormat, LogArg, LogMessage, LoggerError, MessageSink};
use std::fs;
use tempfile::tempdir;

fn message(stream_id: u32, args: &[LogArg]) -> LogMessage {
    let mut msg = LogMessage::new(stream_id, "val=%d", args);
    msg.timestamp = 123;
    msg.producer_id = 4;
    msg
}

#[test]
fn test_write_to_unopened_stream_fails_without_creating_file() {
    let dir = tempdir().unwrap();
    let sink = FileSink::default();
    let opened = dir.path().join("log_1.log");
    sink.open(1, &opened).unwrap();

    let err = sink.write(&message(9, &[LogArg::U64(1)])).unwrap_err();
    assert!(matches!(err, LoggerError::UnknownStream(9)));
    sink.flush_and_close_all().unwrap();

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(entries, vec![opened.clone()], "No output file should appear for an unknown stream");
    assert_eq!(fs::read_to_string(&opened).unwrap(), "");
}

#[test]
fn test_line_is_on_disk_before_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("live.log");
    let sink = FileSink::default();
    sink.open(1, &path).unwrap();

    sink.write(&message(1, &[LogArg::U64(9)])).unwrap();
    assert!(sink.is_open(1));
    assert_eq!(fs::read_to_string(&path).unwrap(), "[123][T4] 9\n");

    sink.write(&message(1, &[LogArg::U64(10)])).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "[123][T4] 9\n[123][T4] 10\n");
    sink.flush_and_close_all().unwrap();
}

#[test]
fn test_lines_are_appended_per_stream() {
    let dir = tempdir().unwrap();
    let sink = FileSink::default();
    let one = dir.path().join("log_one.log");
    let two = dir.path().join("log_two.log");
    sink.open(1, &one).unwrap();
    sink.open(2, &two).unwrap();

    sink.write(&message(1, &[LogArg::I64(-5), LogArg::inline("AAPL")])).unwrap();
    sink.write(&message(2, &[LogArg::F64(0.5), LogArg::Addr(255)])).unwrap();
    sink.write(&message(1, &[])).unwrap();
    sink.flush_and_close_all().unwrap();

    assert_eq!(fs::read_to_string(&one).unwrap(), "[123][T4] -5 AAPL\n[123][T4]\n");
    assert_eq!(fs::read_to_string(&two).unwrap(), "[123][T4] 0.500000 0xff\n");
}

#[test]
fn test_open_appends_to_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("existing.log");
    fs::write(&path, "previous run\n").unwrap();

    let sink = FileSink::default();
    sink.open(1, &path).unwrap();
    sink.write(&message(1, &[LogArg::U64(7)])).unwrap();
    sink.flush_and_close_all().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "previous run\n[123][T4] 7\n");
}

#[test]
fn test_flush_and_close_all_clears_streams() {
    let dir = tempdir().unwrap();
    let sink = FileSink::default();
    sink.open(1, dir.path().join("a.log")).unwrap();
    assert!(sink.is_open(1));

    sink.flush_and_close_all().unwrap();
    assert!(!sink.is_open(1));
    assert!(matches!(
        sink.write(&message(1, &[])),
        Err(LoggerError::UnknownStream(1))
    ));
}

#[test]
fn test_reopen_redirects_stream() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.log");
    let second = dir.path().join("second.log");
    let sink = FileSink::default();

    sink.open(1, &first).unwrap();
    sink.write(&message(1, &[LogArg::U64(1)])).unwrap();
    sink.open(1, &second).unwrap();
    sink.write(&message(1, &[LogArg::U64(2)])).unwrap();
    assert_eq!(sink.path_of(1), Some(second.clone()));
    sink.close(1).unwrap();

    assert_eq!(fs::read_to_string(&first).unwrap(), "[123][T4] 1\n");
    assert_eq!(fs::read_to_string(&second).unwrap(), "[123][T4] 2\n");
    assert!(matches!(sink.close(1), Err(LoggerError::UnknownStream(1))));
}

#[test]
fn test_open_failure_is_io_error() {
    let dir = tempdir().unwrap();
    let sink = FileSink::default();
    let missing = dir.path().join("no_such_dir").join("x.log");
    let err = sink.open(3, &missing).unwrap_err();
    assert!(matches!(err, LoggerError::Io { stream_id: 3, .. }));
    assert!(!sink.is_open(3));
}

#[test]
fn test_templated_sink() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("templated.log");
    let sink = FileSink::new(LineFormat::Templated, 2);
    sink.open(1, &path).unwrap();
    sink.write(&message(1, &[LogArg::U64(42)])).unwrap();
    sink.flush_and_close_all().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "[123][T4] val=42\n");
}
