//! Asset discovery tests against synthetic workbook packages.
//!
//! Fixtures are written with the zip writer rather than checked-in binary
//! files, so each test states exactly which parts the package contains.

use pretty_assertions::assert_eq;
use sheetlens::assets::{AssetResolver, MacroKind};
use std::io::Write;
use zip::write::SimpleFileOptions;

fn package(entries: &[(&str, &[u8])]) -> tempfile::TempPath {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
    file.into_temp_path()
}

const WORKBOOK_XML: &[u8] = br#"<workbook xmlns:r="r">
    <sheets><sheet name="Dashboard" sheetId="1" r:id="rId1"/></sheets>
  </workbook>"#;

const WORKBOOK_RELS: &[u8] = br#"<Relationships>
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  </Relationships>"#;

const SHEET_RELS: &[u8] = br#"<Relationships>
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>
  </Relationships>"#;

const DRAWING_XML: &[u8] = br#"<xdr:wsDr xmlns:xdr="x" xmlns:a="a" xmlns:c="c" xmlns:r="r">
    <xdr:twoCellAnchor>
      <xdr:from><xdr:col>1</xdr:col><xdr:row>1</xdr:row></xdr:from>
      <xdr:to><xdr:col>5</xdr:col><xdr:row>12</xdr:row></xdr:to>
      <xdr:graphicFrame>
        <xdr:nvGraphicFramePr><xdr:cNvPr id="2" name="Revenue Chart"/></xdr:nvGraphicFramePr>
        <a:graphic><a:graphicData><c:chart r:id="rId1"/></a:graphicData></a:graphic>
      </xdr:graphicFrame>
    </xdr:twoCellAnchor>
    <xdr:oneCellAnchor>
      <xdr:from><xdr:col>7</xdr:col><xdr:row>0</xdr:row></xdr:from>
      <xdr:pic>
        <xdr:nvPicPr><xdr:cNvPr id="3" name="Logo"/></xdr:nvPicPr>
        <xdr:blipFill><a:blip r:embed="rId2"/></xdr:blipFill>
      </xdr:pic>
    </xdr:oneCellAnchor>
  </xdr:wsDr>"#;

const DRAWING_RELS: &[u8] = br#"<Relationships>
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart1.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
  </Relationships>"#;

const CHART_XML: &[u8] = br#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea>
    <c:layout/>
    <c:barChart>
      <c:ser><c:tx><c:strRef><c:f>Dashboard!$B$1</c:f><c:strCache><c:v>Revenue</c:v></c:strCache></c:strRef></c:tx></c:ser>
      <c:ser><c:val/></c:ser>
    </c:barChart>
  </c:plotArea></c:chart></c:chartSpace>"#;

fn full_package() -> tempfile::TempPath {
    package(&[
        ("xl/workbook.xml", WORKBOOK_XML),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", b"<worksheet/>"),
        ("xl/worksheets/_rels/sheet1.xml.rels", SHEET_RELS),
        ("xl/drawings/drawing1.xml", DRAWING_XML),
        ("xl/drawings/_rels/drawing1.xml.rels", DRAWING_RELS),
        ("xl/charts/chart1.xml", CHART_XML),
        ("xl/media/image1.png", b"\x89PNG\r\n"),
        (
            "xl/vbaProject.bin",
            b"\x01\x02Attribute VB_Name = \"ThisWorkbook\"\r\nAttribute VB_Name = \"Helpers\"\r\n",
        ),
    ])
}

#[test]
fn test_charts_resolved_through_relationships() {
    let path = full_package();
    let mut resolver = AssetResolver::for_file(path.to_path_buf());

    let charts = resolver.charts().to_vec();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].sheet, "Dashboard");
    assert_eq!(charts[0].name, "Revenue Chart");
    assert_eq!(charts[0].chart_type, "bar");
    assert_eq!(charts[0].anchor, "B2:F13");
    assert_eq!(charts[0].series, vec!["Revenue", "Series 2"]);

    // Memoized: a second query returns the same answer without re-reading.
    assert_eq!(resolver.charts(), charts.as_slice());
}

#[test]
fn test_images_with_media_type() {
    let path = full_package();
    let mut resolver = AssetResolver::for_file(path.to_path_buf());

    let images = resolver.images();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].sheet, "Dashboard");
    assert_eq!(images[0].name, "Logo");
    assert_eq!(images[0].anchor, "H1");
    assert_eq!(images[0].media_type, "image/png");
}

#[test]
fn test_macro_modules_scanned_and_classified() {
    let path = full_package();
    let mut resolver = AssetResolver::for_file(path.to_path_buf());

    let macros = resolver.macros();
    assert_eq!(macros.len(), 2);
    assert_eq!(macros[0].project, "VBAProject");
    assert_eq!(macros[0].name, "ThisWorkbook");
    assert_eq!(macros[0].kind, MacroKind::Document);
    assert_eq!(macros[1].name, "Helpers");
    assert_eq!(macros[1].kind, MacroKind::Standard);
}

#[test]
fn test_package_without_assets_is_empty_not_an_error() {
    let path = package(&[
        ("xl/workbook.xml", WORKBOOK_XML),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", b"<worksheet/>"),
    ]);
    let mut resolver = AssetResolver::for_file(path.to_path_buf());
    assert!(resolver.charts().is_empty());
    assert!(resolver.images().is_empty());
    assert!(resolver.macros().is_empty());
}

#[test]
fn test_broken_package_degrades_to_empty() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"this is not a zip archive").unwrap();

    let mut resolver = AssetResolver::for_file(file.path());
    assert!(resolver.charts().is_empty());
    assert!(resolver.images().is_empty());
    assert!(resolver.macros().is_empty());
}

#[test]
fn test_dangling_chart_relationship_skipped() {
    // Drawing references rId1 but the chart part is missing from the zip.
    let path = package(&[
        ("xl/workbook.xml", WORKBOOK_XML),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", b"<worksheet/>"),
        ("xl/worksheets/_rels/sheet1.xml.rels", SHEET_RELS),
        ("xl/drawings/drawing1.xml", DRAWING_XML),
        ("xl/drawings/_rels/drawing1.xml.rels", DRAWING_RELS),
        ("xl/media/image1.png", b"\x89PNG\r\n"),
    ]);
    let mut resolver = AssetResolver::for_file(path.to_path_buf());
    assert!(resolver.charts().is_empty());
    // The image half of the drawing still resolves.
    assert_eq!(resolver.images().len(), 1);
}
