//! Document conversions between PDF, DOCX and plain text.
//!
//! DOCX files are ZIP archives; text lives in `word/document.xml` as `<w:t>`
//! runs inside `<w:p>` paragraphs. PDFs are read and written with lopdf,
//! using the built-in Helvetica font so no font files are needed.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::{read_input, ConvertError};

/// Paragraphs of one page. A paragraph may contain `\n` line breaks.
pub type Page = Vec<String>;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
const LEADING: i64 = 15;
const FONT_SIZE: i64 = 11;
/// Column at which lines are wrapped when rendering to PDF.
pub const WRAP_COLUMNS: usize = 80;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING + 1) as usize;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const PAGE_BREAK_XML: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

// ---------------------------------------------------------------------------
// Conversion routines
// ---------------------------------------------------------------------------

pub fn pdf_to_docx(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let pages: Vec<Page> = pdf_page_texts(input)?
        .iter()
        .map(|text| split_paragraphs(text))
        .collect();
    write_docx(output, &pages)
}

pub fn pdf_to_txt(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let pages = pdf_page_texts(input)?;
    let text = pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    std::fs::write(output, text)?;
    Ok(())
}

pub fn docx_to_txt(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let data = read_input(input)?;
    let paragraphs = docx_paragraphs(&data)?;
    std::fs::write(output, paragraphs.join("\n"))?;
    Ok(())
}

pub fn docx_to_pdf(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let data = read_input(input)?;
    let paragraphs = docx_paragraphs(&data)?;
    let lines: Vec<String> = paragraphs
        .iter()
        .flat_map(|p| p.split('\n'))
        .flat_map(|line| wrap_line(line, WRAP_COLUMNS))
        .collect();
    write_pdf(output, &lines)
}

pub fn txt_to_docx(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let data = read_input(input)?;
    let text = decode_text(&data);
    let pages: Vec<Page> = text
        .split('\x0c')
        .map(split_paragraphs)
        .filter(|page| !page.is_empty())
        .collect();
    write_docx(output, &pages)
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

/// Decode text bytes, tolerating invalid UTF-8 and a leading BOM.
fn decode_text(data: &[u8]) -> String {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    String::from_utf8_lossy(data).replace("\r\n", "\n").replace('\r', "\n")
}

/// Group consecutive non-blank lines into paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

/// Word-wrap a single line. Words longer than `width` are split.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split_at = word.char_indices().nth(width).map(|(i, _)| i).unwrap_or(word.len());
            lines.push(word[..split_at].to_string());
            word = &word[split_at..];
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

// ---------------------------------------------------------------------------
// DOCX
// ---------------------------------------------------------------------------

/// Extract paragraph texts from DOCX bytes. Empty paragraphs are skipped.
pub fn docx_paragraphs(data: &[u8]) -> Result<Vec<String>, ConvertError> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| ConvertError::library("docx read", format!("not a valid ZIP: {e}")))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| ConvertError::library("docx read", "missing word/document.xml"))?
        .read_to_string(&mut document_xml)
        .map_err(|e| ConvertError::library("docx read", e))?;

    Ok(paragraphs_from_xml(&document_xml))
}

/// Walk Word XML and collect the text of each `<w:p>`.
fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut paragraph_text = String::new();
    let mut in_paragraph = false;
    let mut in_text_element = false;

    let mut chars = xml.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            let is_closing = chars.next_if_eq(&'/').is_some();

            let mut tag = String::new();
            while let Some(next) = chars.next_if(|n| !matches!(n, '>' | ' ' | '/')) {
                tag.push(next);
            }

            let mut is_self_closing = false;
            for next in chars.by_ref() {
                if next == '>' {
                    break;
                }
                is_self_closing = next == '/';
            }

            if is_closing {
                match tag.as_str() {
                    "w:p" => {
                        let text = paragraph_text.trim();
                        if in_paragraph && !text.is_empty() {
                            paragraphs.push(text.to_string());
                        }
                        in_paragraph = false;
                        paragraph_text.clear();
                    }
                    "w:t" => in_text_element = false,
                    _ => {}
                }
            } else {
                match tag.as_str() {
                    "w:p" if !is_self_closing => {
                        in_paragraph = true;
                        paragraph_text.clear();
                    }
                    "w:t" => in_text_element = !is_self_closing,
                    "w:br" | "w:cr" if in_paragraph => paragraph_text.push('\n'),
                    "w:tab" if in_paragraph => paragraph_text.push('\t'),
                    _ => {}
                }
            }
        } else if in_text_element && in_paragraph {
            if c == '&' {
                let mut entity = String::new();
                while let Some(next) = chars.next_if(|n| *n != ';') {
                    entity.push(next);
                }
                chars.next_if_eq(&';');
                paragraph_text.push_str(&decode_entity(&entity));
            } else {
                paragraph_text.push(c);
            }
        }
    }

    let text = paragraph_text.trim();
    if in_paragraph && !text.is_empty() {
        paragraphs.push(text.to_string());
    }

    paragraphs
}

fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse().ok()
            } else {
                None
            };
            match code.and_then(char::from_u32) {
                Some(ch) => ch.to_string(),
                None => format!("&{entity};"),
            }
        }
    }
}

/// Escape text for a `<w:t>` element, dropping characters XML 1.0 forbids.
fn xml_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\t' => result.push(' '),
            c if c < ' ' || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            _ => result.push(c),
        }
    }
    result
}

fn paragraph_xml(paragraph: &str) -> String {
    let runs = paragraph
        .split('\n')
        .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, xml_text(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>");
    format!("<w:p><w:r>{runs}</w:r></w:p>")
}

fn document_xml(pages: &[Page]) -> String {
    let mut body = String::new();
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            body.push_str(PAGE_BREAK_XML);
        }
        for paragraph in page {
            body.push_str(&paragraph_xml(paragraph));
        }
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    )
}

/// Write a minimal WordprocessingML package.
pub fn write_docx(output: &Path, pages: &[Page]) -> Result<(), ConvertError> {
    let file = File::create(output)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("word/document.xml", document_xml(pages)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)
            .map_err(|e| ConvertError::library("docx write", e))?;
        zip.write_all(body.as_bytes())?;
    }
    zip.finish().map_err(|e| ConvertError::library("docx write", e))?;

    debug!("Wrote DOCX with {} page(s) to {:?}", pages.len(), output);
    Ok(())
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

/// Text of every page, in page order.
pub fn pdf_page_texts(input: &Path) -> Result<Vec<String>, ConvertError> {
    let doc = Document::load(input).map_err(|e| ConvertError::library("pdf read", e))?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(ConvertError::library("pdf read", "document has no pages"));
    }

    page_numbers
        .into_iter()
        .map(|n| {
            doc.extract_text(&[n])
                .map_err(|e| ConvertError::library("pdf text extraction", format!("page {n}: {e}")))
        })
        .collect()
}

/// Split lines into pages of at most `LINES_PER_PAGE`. Always at least one page.
fn paginate(lines: &[String]) -> Vec<&[String]> {
    if lines.is_empty() {
        return vec![&[]];
    }
    lines.chunks(LINES_PER_PAGE).collect()
}

/// Encode a line for a WinAnsi Type1 font. Unmappable characters become `?`.
fn win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\t' => b' ',
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn page_content(lines: &[String]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        if !line.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(FONT_SIZE)],
            ));
            operations.push(Operation::new("Td", vec![Object::Integer(MARGIN), Object::Integer(y)]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(line))]));
            operations.push(Operation::new("ET", vec![]));
        }
        y -= LEADING;
    }
    Content { operations }
}

/// Render lines onto US-letter pages.
pub fn write_pdf(output: &Path, lines: &[String]) -> Result<(), ConvertError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let pages = paginate(lines);
    let mut kids = Vec::with_capacity(pages.len());
    for page_lines in &pages {
        let content = page_content(page_lines)
            .encode()
            .map_err(|e| ConvertError::library("pdf write", e))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(output).map_err(|e| ConvertError::library("pdf write", e))?;

    debug!("Wrote PDF with {} page(s) to {:?}", page_count, output);
    Ok(())
}
