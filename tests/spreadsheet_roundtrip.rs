use calamine::{Data, DataType, Reader, open_workbook_auto};
use order_soupis::config::Config;
use order_soupis::inventory::read_inventory;
use order_soupis::lines::{PageTokens, PositionedToken};
use order_soupis::spreadsheet::write_table;
use order_soupis::tables::{Cell, Table};
use order_soupis::{Error, Pipeline};
use std::path::Path;

fn read_back(path: &Path) -> Vec<Vec<Data>> {
    let mut wb = open_workbook_auto(path).unwrap();
    let range = wb.worksheet_range_at(0).unwrap().unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

fn order_pages() -> Vec<PageTokens> {
    let lines = [
        "Saténové obliečky - Luna 2 ks",
        "rozmery: 1x 70/90 + 1x 140/200",
        "Bavlnené obliečky - Kvet 1 ks",
        "rozmery: 2x 70/90 + 1x 140/200",
        "Osuška - Froté 5 ks",
        "rozmery: 70/140",
    ];
    let tokens = lines
        .iter()
        .enumerate()
        .map(|(i, l)| PositionedToken::new(*l, 50.0 + i as f64 * 15.0, 10.0))
        .collect();
    vec![PageTokens { number: 1, tokens }]
}

fn inventory_table(rows: Vec<Vec<Cell>>) -> Table {
    Table {
        headers: vec![
            "Kód".into(),
            "Alias".into(),
            "Popis".into(),
            "Sklad".into(),
            "Po odečtu".into(),
        ],
        rows,
    }
}

#[test]
fn test_order_tables_written_and_readable() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(Config::default()).unwrap();
    let outcome = pipeline.evaluate(&order_pages(), None).unwrap();
    let files = pipeline.write(&outcome, dir.path(), "digest".into()).unwrap();

    assert!(files.inventory.is_none());
    let bedding = read_back(&files.bedding);
    assert_eq!(bedding[0][0], Data::String("Typ produktu".into()));
    // header, Bavlnené, Saténové, totals
    assert_eq!(bedding.len(), 4);
    assert_eq!(bedding[1][0], Data::String("Bavlnené obliečky".into()));
    assert_eq!(bedding[3][0], Data::String("CELKEM".into()));
    // 70/90: 2 + 2, 140/200: 1 + 2
    assert_eq!(bedding[3][3].as_f64(), Some(4.0));
    assert_eq!(bedding[3][4].as_f64(), Some(3.0));
    assert_eq!(bedding[3][5].as_f64(), Some(7.0));

    let other = read_back(&files.other);
    assert_eq!(other.len(), 2);
    assert_eq!(other[1][0], Data::String("Osuška".into()));

    // no temp files left behind
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_rerun_overwrites_with_identical_content() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(Config::default()).unwrap();
    let outcome = pipeline.evaluate(&order_pages(), None).unwrap();

    let first = pipeline.write(&outcome, dir.path(), "d".into()).unwrap();
    let before = read_back(&first.bedding);
    let again = pipeline.evaluate(&order_pages(), None).unwrap();
    let second = pipeline.write(&again, dir.path(), "d".into()).unwrap();

    assert_eq!(first, second);
    assert_eq!(before, read_back(&second.bedding));
}

#[test]
fn test_inventory_decrement_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let inv_path = dir.path().join("sklad.xlsx");
    write_table(
        &inventory_table(vec![
            vec![
                Cell::text("A1"),
                Cell::text("Saténové obliečky Luna"),
                Cell::text("set"),
                Cell::Int(50),
                Cell::Empty,
            ],
            vec![
                Cell::text("A2"),
                Cell::text("obliečky variant: 140x200"),
                Cell::Empty,
                Cell::Int(20),
                Cell::Empty,
            ],
            vec![
                Cell::text("A3"),
                Cell::text("Vankúš"),
                Cell::Empty,
                Cell::text("n/a"),
                Cell::Empty,
            ],
        ]),
        &inv_path,
    )
    .unwrap();

    let sheet = read_inventory(&inv_path).unwrap();
    assert_eq!(sheet.width, 5);

    let pipeline = Pipeline::new(Config::default()).unwrap();
    let outcome = pipeline.evaluate(&order_pages(), Some(inv_path.as_path())).unwrap();
    let reconciled = outcome.reconciled.as_ref().unwrap();
    assert_eq!(reconciled.matched_rows, 2);
    assert_eq!(reconciled.unmatched_rows, 1);

    let files = pipeline.write(&outcome, dir.path(), "d".into()).unwrap();
    let rows = read_back(files.inventory.as_ref().unwrap());
    assert_eq!(rows[0][1], Data::String("Alias".into()));
    // Luna: 2 sets
    assert_eq!(rows[1][4].as_f64(), Some(48.0));
    // "obliečky" matches Luna (2) and Kvet (1)
    assert_eq!(rows[2][4].as_f64(), Some(17.0));
    // unmatched, non-numeric stock
    assert_eq!(rows[3][4].as_f64(), Some(0.0));
}

#[test]
fn test_narrow_inventory_aborts_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let inv_path = dir.path().join("narrow.xlsx");
    write_table(
        &Table {
            headers: vec!["Kód".into(), "Alias".into(), "Popis".into(), "Sklad".into()],
            rows: vec![vec![
                Cell::text("A1"),
                Cell::text("Luna"),
                Cell::Empty,
                Cell::Int(5),
            ]],
        },
        &inv_path,
    )
    .unwrap();

    let pipeline = Pipeline::new(Config::default()).unwrap();
    let err = pipeline
        .evaluate(&order_pages(), Some(inv_path.as_path()))
        .unwrap_err();
    assert!(matches!(err, Error::MalformedInventory(_)));

    let written = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(written, 1);
}
