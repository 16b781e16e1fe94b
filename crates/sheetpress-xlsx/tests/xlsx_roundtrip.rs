use std::io::Cursor;

use pretty_assertions::assert_eq;
use sheetpress_core::style::{Color, FillStyle, HorizontalAlignment, Style};
use sheetpress_core::{
    Anchor, AnchorPoint, CellRange, CellValue, Extent, Media, Picture, Position, Workbook,
};
use sheetpress_xlsx::{XlsxReader, XlsxWriter};

fn roundtrip(workbook: &Workbook) -> Workbook {
    let mut buf = Vec::new();
    XlsxWriter::write(workbook, Cursor::new(&mut buf)).unwrap();
    XlsxReader::read(Cursor::new(buf)).unwrap()
}

#[test]
fn values_styles_and_layout_survive() {
    let mut workbook = Workbook::new();
    {
        let ws = workbook.worksheet_mut(0).unwrap();
        let header = Style::new()
            .bold(true)
            .fill(FillStyle::solid(Color::from_hex("FFCC00").unwrap()))
            .horizontal_alignment(HorizontalAlignment::Center);
        ws.set_cell_at(0, 0, CellValue::string("Invoice"), &header).unwrap();
        ws.set_cell_value("A2", 12.5).unwrap();
        ws.set_cell_value("B2", "  spaced  ").unwrap();
        ws.set_cell_value_at(
            2,
            0,
            CellValue::Formula {
                text: "A2*2".into(),
                cached_value: Some(Box::new(CellValue::Number(25.0))),
            },
        )
        .unwrap();
        ws.set_cell_style("D4", &Style::new().italic(true)).unwrap();
        ws.merge_cells(&CellRange::parse("A1:C1").unwrap()).unwrap();
        ws.set_row_height(0, 28.5);
        ws.set_row_hidden(7, true);
        ws.set_column_width(0, 24.0);
        ws.set_column_hidden(5, true);
    }
    workbook.add_worksheet_with_name("Hidden").unwrap();
    workbook.worksheet_mut(1).unwrap().set_visible(false);

    let read = roundtrip(&workbook);
    assert_eq!(read.sheet_count(), 2);

    let ws = read.worksheet(0).unwrap();
    assert_eq!(ws.get_value_at(0, 0), CellValue::string("Invoice"));
    assert_eq!(ws.get_value_at(1, 0), CellValue::Number(12.5));
    assert_eq!(ws.get_value_at(1, 1), CellValue::string("  spaced  "));
    assert_eq!(
        ws.get_value_at(2, 0),
        CellValue::Formula {
            text: "A2*2".into(),
            cached_value: Some(Box::new(CellValue::Number(25.0))),
        }
    );

    let header = ws.cell_style_at(0, 0);
    assert!(header.font.bold);
    assert_eq!(header.alignment.horizontal, HorizontalAlignment::Center);
    assert!(ws.cell_style("D4").unwrap().font.italic);
    assert!(ws.get_value("D4").unwrap().is_empty());

    assert_eq!(ws.merged_regions(), &[CellRange::parse("A1:C1").unwrap()]);
    assert_eq!(ws.custom_row_height(0), Some(28.5));
    assert!(ws.is_row_hidden(7));
    assert_eq!(ws.custom_column_width(0), Some(24.0));
    assert!(ws.is_column_hidden(5));

    assert!(!read.worksheet(1).unwrap().is_visible());
}

#[test]
fn pictures_survive_with_shared_media() {
    let mut workbook = Workbook::empty();
    let logo = workbook.add_media(Media::new(vec![0x89, b'P', b'N', b'G', 1, 2, 3], "png"));
    let photo = workbook.add_media(Media::new(vec![0xFF, 0xD8, 0xFF], "jpeg"));

    let mut first = sheetpress_core::Worksheet::new("First");
    first.add_picture(Picture::new(
        logo,
        "Logo",
        Anchor::TwoCell {
            from: AnchorPoint::new(1, 1).with_offsets(9525, 9525),
            to: AnchorPoint::new(4, 3),
        },
    ));
    first.add_picture(Picture::new(
        photo,
        "Photo",
        Anchor::OneCell {
            from: AnchorPoint::new(6, 0),
            ext: Extent { cx: 1_905_000, cy: 952_500 },
        },
    ));
    let mut second = sheetpress_core::Worksheet::new("Second");
    second.add_picture(Picture::new(
        logo,
        "Logo again",
        Anchor::Absolute {
            pos: Position { x: 0, y: 0 },
            ext: Extent { cx: 100, cy: 100 },
        },
    ));
    workbook.add_existing_worksheet(first).unwrap();
    workbook.add_existing_worksheet(second).unwrap();

    let read = roundtrip(&workbook);

    assert_eq!(read.media().len(), 2);
    let first = read.worksheet(0).unwrap();
    let second = read.worksheet(1).unwrap();
    assert_eq!(first.pictures().len(), 2);
    assert_eq!(first.pictures()[0].anchor, workbook.worksheet(0).unwrap().pictures()[0].anchor);
    assert_eq!(first.pictures()[1].anchor, workbook.worksheet(0).unwrap().pictures()[1].anchor);
    assert_eq!(second.pictures()[0].name, "Logo again");

    // The same image used on two sheets is still one media entry
    assert_eq!(first.pictures()[0].media, second.pictures()[0].media);
    let bytes = &read.media().get(first.pictures()[1].media).unwrap().data;
    assert_eq!(&bytes[..], &[0xFF, 0xD8, 0xFF]);
}

#[test]
fn write_file_and_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xlsx");

    let mut workbook = Workbook::new();
    workbook
        .worksheet_mut(0)
        .unwrap()
        .set_cell_value("C3", "on disk")
        .unwrap();

    XlsxWriter::write_file(&workbook, &path).unwrap();
    let read = XlsxReader::read_file(&path).unwrap();
    assert_eq!(
        read.worksheet(0).unwrap().get_value("C3").unwrap(),
        CellValue::string("on disk")
    );
}
