use chrono::NaiveDate;
use edi_codec::{
    to_string, DateFormat, Entry, Error, Grammar, Path, Picture, ReadQueue, Reader, TokenKind,
    WriterOptions,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn path(text: &str) -> Path {
    text.parse().unwrap()
}

fn string_entry(at: &str, value: &str) -> Entry {
    Entry::new(path(at), TokenKind::String, Some(value.to_string()))
}

#[test]
fn test_read_discards_preceding_entries() {
    let mut queue: ReadQueue = vec![
        string_entry("A[0][0]", "x"),
        string_entry("A[1][0]", "y"),
        string_entry("A[1][1]", "z"),
    ]
    .into();

    assert_eq!(queue.read_as_string(&path("A[1][0]")), Some("y".to_string()));
    assert!(!queue.contains_path(&path("A[0][0]")));
    assert!(queue.contains_path(&path("A[1][1]")));
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_missing_path_leaves_queue_intact() {
    let mut queue: ReadQueue = vec![string_entry("A[0][0]", "x")].into();
    assert_eq!(queue.read_as_string(&path("B[0][0]")), None);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.read_as_i32(&path("B[0][0]")).unwrap(), None);
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_absent_index_matches_zero() {
    let mut queue: ReadQueue = vec![string_entry("DTM[0][0]", "137")].into();
    assert!(queue.contains_path(&path("DTM[0]")));
    assert_eq!(queue.read_as_i64(&path("DTM[0]")).unwrap(), Some(137));
}

#[test]
fn test_structural_entries_do_not_match() {
    let mut queue: ReadQueue = vec![
        Entry::new(path("A[1]"), TokenKind::ElementStart, None),
        Entry::new(path("A[1][0]"), TokenKind::Null, None),
    ]
    .into();
    assert!(queue.contains_path(&path("A[1][0]")));
    assert_eq!(queue.read_as_string(&path("A[1][0]")), None);
    assert!(queue.is_empty());
}

#[test]
fn test_typed_reads_over_a_segment() {
    let grammar = Grammar::edifact();
    let text = to_string(grammar.clone(), WriterOptions::compact(), |w| {
        w.write_segment_name("LIN")?;
        w.write_value("ZZ0042")?;
        w.write_token(TokenKind::ElementStart)?;
        let picture: Picture = "9(3)V9(2)".parse()?;
        let amount = Decimal::from_str("12.345").unwrap();
        w.write_value_with(amount, Some(&picture), None)?;
        w.write_token(TokenKind::ElementStart)?;
        w.write_value(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())?;
        w.write_token(TokenKind::ElementStart)?;
        w.write_value(true)
    })
    .unwrap();
    assert_eq!(text, "LIN+ZZ0042+012.35+20240229000000+1'");

    let mut reader = Reader::new(&text, grammar.clone());
    let mut queue = reader.read_segment().unwrap().unwrap();

    assert_eq!(queue.read_as_i32(&path("LIN[0][0]")).unwrap(), Some(42));
    assert_eq!(
        queue
            .read_as_decimal(&path("LIN[1][0]"), None, grammar.decimal_mark())
            .unwrap(),
        Some(Decimal::from_str("12.35").unwrap())
    );
    let date = queue.read_as_date(&path("LIN[2][0]"), None).unwrap().unwrap();
    assert_eq!(date.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    assert_eq!(queue.read_as_bool(&path("LIN[3][0]")).unwrap(), Some(true));
}

#[test]
fn test_implied_decimal_point() {
    let picture: Picture = "9(1)V9(2)".parse().unwrap();
    let mut queue: ReadQueue = vec![string_entry("MOA[0][1]", "1042")].into();
    let value = queue
        .read_as_decimal(&path("MOA[0][1]"), Some(&picture), None)
        .unwrap();
    assert_eq!(value, Some(Decimal::from_str("10.42").unwrap()));
}

#[test]
fn test_date_with_pattern() {
    let format = DateFormat::new("yyMMdd").unwrap();
    let mut queue: ReadQueue = vec![string_entry("DTM[0][1]", "101012")].into();
    let date = queue
        .read_as_date(&path("DTM[0][1]"), Some(&format))
        .unwrap()
        .unwrap();
    assert_eq!(date.date(), NaiveDate::from_ymd_opt(2010, 10, 12).unwrap());
}

#[test]
fn test_format_errors_carry_path() {
    let mut queue: ReadQueue = vec![
        string_entry("QTY[0][1]", "12a"),
        string_entry("QTY[0][2]", "9999999999"),
        string_entry("QTY[1][0]", "maybe"),
    ]
    .into();

    let err = queue.read_as_i64(&path("QTY[0][1]")).unwrap_err();
    assert!(matches!(err, Error::Format { .. }));
    assert_eq!(err.path(), Some("QTY[0][1]"));

    let err = queue.read_as_i32(&path("QTY[0][2]")).unwrap_err();
    assert_eq!(err.path(), Some("QTY[0][2]"));

    let err = queue.read_as_bool(&path("QTY[1][0]")).unwrap_err();
    assert_eq!(err.path(), Some("QTY[1][0]"));
}

#[test]
fn test_lookahead_window_from_reader() {
    let mut reader = Reader::new("BGM+220+PO1'DTM+137:20240229:102'", Grammar::edifact());
    let mut window = reader.lookahead(64).unwrap();

    assert!(window.contains_path(&path("DTM[0][1]")));
    assert_eq!(
        window.read_as_string(&path("DTM[0][1]")),
        Some("20240229".to_string())
    );
    assert!(!window.contains_path(&path("BGM[1][0]")));
    assert_eq!(window.read_as_string(&path("DTM[0][2]")), Some("102".to_string()));
    assert_eq!(
        window.peek().map(|e| e.token()),
        Some(TokenKind::SegmentTerminator)
    );
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_integer_reads_are_culture_invariant() {
    let mut queue: ReadQueue = vec![
        string_entry("QTY[0][0]", "+ZZ1200"),
        string_entry("QTY[0][1]", "1,200"),
        string_entry("QTY[0][2]", "1.200"),
    ]
    .into();

    assert_eq!(queue.read_as_i64(&path("QTY[0][0]")).unwrap(), Some(1200));
    assert!(matches!(
        queue.read_as_i32(&path("QTY[0][1]")),
        Err(Error::Format { .. })
    ));
    assert!(matches!(
        queue.read_as_i64(&path("QTY[0][2]")),
        Err(Error::Format { .. })
    ));
}
