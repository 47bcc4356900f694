//! Builders for the minimal workbook and document packages used by the tests.
use quick_xml::escape::escape;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

const ODF_NAMESPACES: &str = concat!(
    r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" "#,
    r#"xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" "#,
    r#"xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" "#,
    r#"xmlns:calcext="urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0" "#,
    r#"office:version="1.2""#,
);
const WORD_NAMESPACE: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

/// Writes a zip archive with the given entries in order.
pub(crate) fn write_zip(path: &Path, entries: &[(&str, &[u8], CompressionMethod)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content, method) in entries {
        let options = SimpleFileOptions::default().compression_method(*method);
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// Reads back every entry of an archive: (name, content, compression method).
pub(crate) fn read_entries(path: &Path) -> Vec<(String, Vec<u8>, CompressionMethod)> {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|index| {
            let mut entry = zip.by_index(index).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_owned(), content, entry.compression())
        })
        .collect()
}

/// Reads one entry of an archive as text.
pub(crate) fn read_entry(path: &Path, name: &str) -> String {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut content = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut content).unwrap();
    content
}

/// Writes an `.xlsx` workbook. Each sheet is given as its name and the `<row>`
/// elements of its `sheetData`. Style 1 is the built-in date format.
pub(crate) fn write_xlsx(path: &Path, sheets: &[(&str, &str)], shared_strings: &[&str]) {
    let mut workbook = String::from(r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#);
    let mut relationships = String::from(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    let mut parts = Vec::new();
    for (index, (name, rows)) in sheets.iter().enumerate() {
        let number = index + 1;
        workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{number}" r:id="rId{number}"/>"#, escape(*name)));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{number}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{number}.xml"/>"#
        ));
        parts.push((
            format!("xl/worksheets/sheet{number}.xml"),
            format!("<worksheet><sheetData>{rows}</sheetData></worksheet>"),
        ));
    }
    workbook.push_str("</sheets></workbook>");
    relationships.push_str("</Relationships>");

    let strings: String = shared_strings
        .iter()
        .map(|string| format!("<si><t>{}</t></si>", escape(*string)))
        .collect();
    let shared_strings = format!(r#"<sst count="{0}" uniqueCount="{0}">{strings}</sst>"#, shared_strings.len());
    let styles = r#"<styleSheet><cellStyleXfs><xf numFmtId="22"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#;

    let mut entries: Vec<(&str, &[u8], CompressionMethod)> = vec![
        ("[Content_Types].xml", b"<Types/>".as_slice(), CompressionMethod::Deflated),
        ("xl/workbook.xml", workbook.as_bytes(), CompressionMethod::Deflated),
        ("xl/_rels/workbook.xml.rels", relationships.as_bytes(), CompressionMethod::Deflated),
        ("xl/sharedStrings.xml", shared_strings.as_bytes(), CompressionMethod::Deflated),
        ("xl/styles.xml", styles.as_bytes(), CompressionMethod::Deflated),
    ];
    for (name, content) in &parts {
        entries.push((name.as_str(), content.as_bytes(), CompressionMethod::Deflated));
    }
    write_zip(path, &entries);
}

/// Writes an `.ods` spreadsheet whose `office:spreadsheet` element holds `tables`.
pub(crate) fn write_ods_content(path: &Path, tables: &str) {
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content {ODF_NAMESPACES}><office:body><office:spreadsheet>{tables}</office:spreadsheet></office:body></office:document-content>"#
    );
    write_odf(path, "application/vnd.oasis.opendocument.spreadsheet", &[("content.xml", content.as_str())]);
}

/// Writes an `.ods` spreadsheet of string cells, one table per sheet.
pub(crate) fn write_ods(path: &Path, sheets: &[(&str, &[&[&str]])]) {
    let mut tables = String::new();
    for (name, rows) in sheets {
        tables.push_str(&format!(r#"<table:table table:name="{}">"#, escape(*name)));
        for row in rows.iter() {
            tables.push_str("<table:table-row>");
            for value in row.iter() {
                if value.is_empty() {
                    tables.push_str("<table:table-cell/>");
                } else {
                    tables.push_str(&format!(
                        r#"<table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell>"#,
                        escape(*value)
                    ));
                }
            }
            tables.push_str("</table:table-row>");
        }
        tables.push_str("</table:table>");
    }
    write_ods_content(path, &tables);
}

/// Writes a `.docx` document whose body holds `body`, with an optional header part.
pub(crate) fn write_docx(path: &Path, body: &str, header: Option<&str>) {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document {WORD_NAMESPACE}><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );
    let header = header.map(|header| format!("<w:hdr {WORD_NAMESPACE}>{header}</w:hdr>"));
    let mut entries: Vec<(&str, &[u8], CompressionMethod)> = vec![
        ("[Content_Types].xml", br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#.as_slice(), CompressionMethod::Deflated),
        ("_rels/.rels", b"<Relationships/>".as_slice(), CompressionMethod::Deflated),
        ("word/document.xml", document.as_bytes(), CompressionMethod::Deflated),
        ("word/styles.xml", b"<w:styles/>".as_slice(), CompressionMethod::Deflated),
        ("word/media/image1.png", &[0x89u8, b'P', b'N', b'G', 0, 1, 2, 3][..], CompressionMethod::Stored),
    ];
    if let Some(header) = &header {
        entries.push(("word/header1.xml", header.as_bytes(), CompressionMethod::Deflated));
    }
    write_zip(path, &entries);
}

/// Writes an `.odt` document whose `office:text` element holds `body`.
pub(crate) fn write_odt(path: &Path, body: &str) {
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content {ODF_NAMESPACES}><office:body><office:text>{body}</office:text></office:body></office:document-content>"#
    );
    let styles = format!("<office:document-styles {ODF_NAMESPACES}/>");
    write_odf(path, "application/vnd.oasis.opendocument.text", &[("content.xml", content.as_str()), ("styles.xml", styles.as_str())]);
}

fn write_odf(path: &Path, mime_type: &str, parts: &[(&str, &str)]) {
    let manifest = format!(
        r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0"><manifest:file-entry manifest:full-path="/" manifest:media-type="{mime_type}"/></manifest:manifest>"#
    );
    let mut entries: Vec<(&str, &[u8], CompressionMethod)> = vec![
        ("mimetype", mime_type.as_bytes(), CompressionMethod::Stored),
        ("META-INF/manifest.xml", manifest.as_bytes(), CompressionMethod::Deflated),
    ];
    for (name, content) in parts {
        entries.push((*name, content.as_bytes(), CompressionMethod::Deflated));
    }
    write_zip(path, &entries);
}
