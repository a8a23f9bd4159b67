use sheet_review::downloader::{export_file_name, to_xlsx};
use sheet_review::loader::load_file;
use sheet_review::review::{self, Command, Outcome};
use sheet_review::{APPROVAL_COLUMN, Approval, CellValue, DecodeError, ReviewError, Session, Table};
use std::fs;
use tempfile::tempdir;

fn orders_table() -> Table {
    Table::new(
        vec!["order".into(), "total".into(), "approved".into()],
        vec![
            vec![CellValue::Number(1001.0), CellValue::Number(19.5), CellValue::text("yes")],
            vec![CellValue::Number(1002.0), CellValue::Number(7.0), CellValue::text("no")],
            vec![CellValue::Number(1003.0), CellValue::Empty, CellValue::text("maybe")],
            vec![CellValue::Number(1004.0), CellValue::Number(42.0), CellValue::text("no")],
        ],
    )
    .unwrap()
}

#[test]
fn test_review_and_export_through_files() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("orders.xlsx");
    fs::write(&input, to_xlsx(&orders_table(), "Orders").unwrap()).unwrap();

    let decoded = load_file(&input, None).unwrap();
    assert_eq!(decoded.sheet, "Orders");
    assert_eq!(decoded.sheet_names, vec!["Orders"]);

    let mut session = Session::load(decoded.table);
    assert!(!session.approval_column_added());
    assert_eq!(session.row_count(), 4);

    // An unrecognised marker is left alone and counted on neither side
    let before = review::summary(&session);
    assert_eq!(before.approved, 1);
    assert_eq!(before.not_approved, 2);
    assert_eq!(before.changed, 0);

    review::apply(&mut session, Command::JumpTo(3)).unwrap();
    assert_eq!(review::current_approval(&session).unwrap(), Approval::No);
    assert_eq!(
        session.approval_at(2).unwrap(),
        &CellValue::text("maybe")
    );
    let outcome = review::apply(&mut session, Command::SetApproval("yes".into())).unwrap();
    assert_eq!(outcome, Outcome::ApprovalUpdated(Approval::Yes));

    review::apply(&mut session, Command::First).unwrap();
    let outcome = review::apply(&mut session, Command::SetApproval("yes".into())).unwrap();
    assert_eq!(outcome, Outcome::ApprovalUnchanged);

    let after = review::summary(&session);
    assert_eq!(after.approved, 2);
    assert_eq!(after.not_approved, 2);
    assert_eq!(after.changed, 1);

    let output = dir.path().join(export_file_name("orders.xlsx"));
    fs::write(&output, to_xlsx(session.working(), "Orders").unwrap()).unwrap();

    let reloaded = load_file(&output, Some("Orders")).unwrap();
    let table = reloaded.table;
    assert_eq!(table.columns(), session.working().columns());
    assert_eq!(table.cell(2, APPROVAL_COLUMN), Some(&CellValue::text("yes")));
    assert_eq!(table.cell(2, "total"), Some(&CellValue::Empty));
    assert_eq!(table.cell(0, "total"), Some(&CellValue::Number(19.5)));
    assert_eq!(table.cell(3, "order"), Some(&CellValue::Number(1004.0)));
}

#[test]
fn test_invalid_values_leave_session_untouched() {
    let mut session = Session::load(orders_table());
    review::last(&mut session);

    let err = review::apply(&mut session, Command::SetApproval("YES".into())).unwrap_err();
    assert!(matches!(err, ReviewError::InvalidValue(_)));
    assert_eq!(session.cursor(), 3);
    assert_eq!(session.changed_count(), 0);

    let err = session.set_approval(10, "yes").unwrap_err();
    assert!(matches!(
        err,
        ReviewError::IndexOutOfRange { index: 10, row_count: 4 }
    ));
}

#[test]
fn test_load_file_errors() {
    let dir = tempdir().unwrap();

    let csv = dir.path().join("orders.csv");
    fs::write(&csv, "order,total\n1,2\n").unwrap();
    assert!(matches!(
        load_file(&csv, None),
        Err(DecodeError::UnsupportedFormat { .. })
    ));

    let missing = dir.path().join("missing.xlsx");
    assert!(matches!(load_file(&missing, None), Err(DecodeError::Io(_))));

    let workbook = dir.path().join("orders.xlsx");
    fs::write(&workbook, to_xlsx(&orders_table(), "Orders").unwrap()).unwrap();
    assert!(matches!(
        load_file(&workbook, Some("Returns")),
        Err(DecodeError::SheetNotFound { .. })
    ));
}
