//! Session facade tests: sheet management, CSV import/export, and input
//! validation.

use pretty_assertions::assert_eq;
use sheetlens::error::SheetError;
use sheetlens::model::CellValue;
use sheetlens::session::WorkbookSession;

#[test]
fn test_sheet_lifecycle() {
    let mut session = WorkbookSession::new();
    session.add_sheet("Data").unwrap();
    session.add_sheet("Summary").unwrap();

    // Duplicate names are rejected case-insensitively.
    let err = session.add_sheet("data").unwrap_err();
    assert!(matches!(err, SheetError::DuplicateSheet(_)));
    let err = session.add_sheet("").unwrap_err();
    assert!(matches!(err, SheetError::InvalidInput(_)));

    session.rename_sheet("Summary", "Totals").unwrap();
    assert!(session.get_cell("Totals", 1, 1).is_ok());
    assert!(session.get_cell("Summary", 1, 1).is_err());

    session.delete_sheet("Totals").unwrap();
    let err = session.delete_sheet("Totals").unwrap_err();
    assert!(matches!(err, SheetError::SheetNotFound(_)));
}

#[test]
fn test_csv_import_and_export() {
    let mut session = WorkbookSession::new();
    session
        .add_sheet_from_csv("Data", "name,count\nwidget,3\ngadget,4.5\n")
        .unwrap();

    assert_eq!(
        session.get_cell("Data", 1, 1).unwrap().value,
        CellValue::Text("name".to_string())
    );
    assert_eq!(
        session.get_cell("Data", 2, 2).unwrap().value,
        CellValue::Number(3.0)
    );
    assert_eq!(
        session.get_cell("Data", 3, 2).unwrap().value,
        CellValue::Number(4.5)
    );

    let csv = session.to_csv("Data").unwrap();
    assert_eq!(csv, "name,count\nwidget,3\ngadget,4.5\n");
}

#[test]
fn test_csv_round_trip_preserves_grid() {
    let source = "a,b,c\n1,2,3\n";
    let mut session = WorkbookSession::new();
    session.add_sheet_from_csv("S", source).unwrap();
    assert_eq!(session.to_csv("S").unwrap(), source);
}

#[test]
fn test_cell_display_and_type_tags() {
    let mut session = WorkbookSession::new();
    session.add_sheet("S").unwrap();
    session.set_cell("S", 1, 1, CellValue::Number(2.5)).unwrap();
    session
        .set_cell("S", 1, 2, CellValue::Text("hi".to_string()))
        .unwrap();
    session.set_cell("S", 1, 3, CellValue::Bool(true)).unwrap();

    let number = session.get_cell("S", 1, 1).unwrap();
    assert_eq!(number.value.display(), "2.5");
    assert_eq!(number.value.type_tag(), "number");

    assert_eq!(session.get_cell("S", 1, 2).unwrap().value.type_tag(), "text");
    assert_eq!(
        session.get_cell("S", 1, 3).unwrap().value.type_tag(),
        "boolean"
    );

    // Untouched cells read back as empty, not as an error.
    let empty = session.get_cell("S", 9, 9).unwrap();
    assert_eq!(empty.value, CellValue::Empty);
    assert!(empty.formula.is_none());
}

#[test]
fn test_sheet_names_are_case_insensitive() {
    let mut session = WorkbookSession::new();
    session.add_sheet("Sheet1").unwrap();
    session
        .set_cell("SHEET1", 1, 1, CellValue::Number(1.0))
        .unwrap();
    assert_eq!(
        session.get_cell("sheet1", 1, 1).unwrap().value,
        CellValue::Number(1.0)
    );
}
