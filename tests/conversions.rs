//! End-to-end tests of the conversion dispatcher on real files.
//!
//! Only pure-Rust routines run here; ffmpeg-backed ones are in `media.rs`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filerelay::convert::document::{self, docx_paragraphs};
use filerelay::convert::image::convert_image;
use filerelay::convert::{
    route, ConvertError, ConvertSettings, Converter, Format, ImageOptions, MATRIX,
};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

fn converter() -> (TempDir, Converter) {
    let dir = tempfile::tempdir().unwrap();
    let converter = Converter::new(ConvertSettings::new(dir.path().join("temp"))).unwrap();
    (dir, converter)
}

fn temp_entries(converter: &Converter) -> usize {
    std::fs::read_dir(converter.temp_dir()).unwrap().count()
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn write_input(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_matrix_pairs_all_route() {
    for entry in MATRIX {
        assert!(!entry.targets.is_empty(), "{} has no targets", entry.source);
        for &target in entry.targets {
            assert_ne!(entry.source, target);
            assert!(route(entry.source, target).is_some(), "{} -> {target}", entry.source);
        }
    }
    assert!(!MATRIX.iter().any(|e| e.targets.contains(&Format::Jpeg)));
}

#[test]
fn test_unsupported_pair_creates_no_file() {
    let (dir, converter) = converter();
    let input = write_input(dir.path(), "clip.mp3", b"ID3");

    let err = converter.convert(&input, Format::Mp3, Format::Pdf).unwrap_err();
    assert!(matches!(err, ConvertError::Unsupported { from: Format::Mp3, to: Format::Pdf }));
    assert_eq!(err.kind(), "unsupported");
    assert_eq!(temp_entries(&converter), 0);
}

#[test]
fn test_zero_byte_jpg_fails_without_output() {
    let (dir, converter) = converter();
    let input = write_input(dir.path(), "empty.jpg", b"");

    let err = converter.convert(&input, Format::Jpg, Format::Png).unwrap_err();
    assert!(matches!(err, ConvertError::Library { .. }), "got {err:?}");
    assert_eq!(temp_entries(&converter), 0);
    assert!(input.exists());
}

#[test]
fn test_corrupt_docx_fails_without_output() {
    let (dir, converter) = converter();
    let input = write_input(dir.path(), "broken.docx", b"PK\x03\x04 definitely not a zip");

    let err = converter.convert(&input, Format::Docx, Format::Txt).unwrap_err();
    assert!(matches!(err, ConvertError::Library { .. }), "got {err:?}");
    assert_eq!(temp_entries(&converter), 0);
}

#[test]
fn test_missing_input_is_library_error_on_every_route() {
    let (dir, converter) = converter();
    let pairs = [
        (Format::Png, Format::Jpg),
        (Format::Docx, Format::Txt),
        (Format::Pdf, Format::Txt),
        (Format::Txt, Format::Docx),
        (Format::Wav, Format::Mp3),
    ];
    for (source, target) in pairs {
        let input = dir.path().join(format!("gone.{source}"));
        let err = converter.convert(&input, source, target).unwrap_err();
        assert_eq!(err.kind(), "library", "{source} -> {target}: {err:?}");
    }
    assert_eq!(temp_entries(&converter), 0);

    let missing = dir.path().join("gone");
    let out = dir.path().join("out");
    let direct = [
        document::docx_to_txt(&missing, &out),
        document::docx_to_pdf(&missing, &out),
        document::txt_to_docx(&missing, &out),
        document::pdf_to_txt(&missing, &out),
        document::pdf_to_docx(&missing, &out),
        convert_image(&missing, &out, Format::Png, &ImageOptions::default()),
    ];
    for result in direct {
        assert!(matches!(result, Err(ConvertError::Library { .. })), "got {result:?}");
    }
}

#[test]
fn test_png_with_alpha_to_jpg_to_png_is_opaque() {
    let (dir, converter) = converter();

    let mut img = RgbaImage::new(8, 8);
    for (x, _, pixel) in img.enumerate_pixels_mut() {
        *pixel = if x < 4 { Rgba([0, 0, 0, 0]) } else { Rgba([200, 30, 30, 255]) };
    }
    let input = dir.path().join("logo.png");
    DynamicImage::ImageRgba8(img).save_with_format(&input, ImageFormat::Png).unwrap();

    let jpg = converter.convert(&input, Format::Png, Format::Jpg).unwrap();
    assert_eq!(jpg.file_name(), "converted.jpg");
    let png = converter.convert(jpg.path(), Format::Jpg, Format::Png).unwrap();

    let back = image::open(png.path()).unwrap();
    assert!(!back.color().has_alpha());
    let [r, g, b, a] = back.get_pixel(1, 4).0;
    assert_eq!(a, 255);
    assert!(r > 240 && g > 240 && b > 240, "transparent area should be white, got {r},{g},{b}");

    let kept = png.path().to_path_buf();
    drop(jpg);
    drop(png);
    assert!(!kept.exists());
    assert_eq!(temp_entries(&converter), 0);
}

#[test]
fn test_jpeg_background_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = ConvertSettings::new(dir.path().join("temp"));
    settings.image = ImageOptions { jpeg_background: [0, 0, 0], jpeg_quality: 90 };
    let converter = Converter::new(settings).unwrap();

    let input = dir.path().join("clear.png");
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0])))
        .save_with_format(&input, ImageFormat::Png)
        .unwrap();

    let jpg = converter.convert(&input, Format::Png, Format::Jpg).unwrap();
    let [r, g, b, _] = image::open(jpg.path()).unwrap().get_pixel(2, 2).0;
    assert!(r < 15 && g < 15 && b < 15, "expected black, got {r},{g},{b}");
}

#[test]
fn test_webp_round_trip_keeps_dimensions() {
    let (dir, converter) = converter();
    let input = dir.path().join("photo.jpeg");
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(13, 7, Rgba([10, 120, 200, 255])))
        .to_rgb8()
        .save_with_format(&input, ImageFormat::Jpeg)
        .unwrap();

    let webp = converter.convert(&input, Format::Jpeg, Format::Webp).unwrap();
    let png = converter.convert(webp.path(), Format::Webp, Format::Png).unwrap();
    assert_eq!(image::open(png.path()).unwrap().dimensions(), (13, 7));
}

#[test]
fn test_three_page_txt_to_docx_keeps_text() {
    let (dir, converter) = converter();
    let text = "Quarterly report\n\nRevenue grew.\x0cSecond page\nwith two lines\x0cThird page";
    let input = write_input(dir.path(), "report.txt", text.as_bytes());

    let docx = converter.convert(&input, Format::Txt, Format::Docx).unwrap();
    let paragraphs = docx_paragraphs(&std::fs::read(docx.path()).unwrap()).unwrap();
    assert_eq!(normalize(&paragraphs.join("\n")), normalize(&text.replace('\x0c', "\n")));

    let xml_pages = {
        let file = std::fs::File::open(docx.path()).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("word/document.xml").unwrap(), &mut xml).unwrap();
        xml.matches(r#"w:type="page""#).count()
    };
    assert_eq!(xml_pages, 2);
}

#[test]
fn test_docx_to_pdf_to_txt() {
    let (dir, converter) = converter();
    let text = "Invoice number 42\n\nTotal due: 100 EUR\n\nThank you";
    let input = write_input(dir.path(), "invoice.txt", text.as_bytes());

    let docx = converter.convert(&input, Format::Txt, Format::Docx).unwrap();
    let pdf = converter.convert(docx.path(), Format::Docx, Format::Pdf).unwrap();
    let pages = lopdf::Document::load(pdf.path()).unwrap().get_pages().len();
    assert_eq!(pages, 1);

    let txt = converter.convert(pdf.path(), Format::Pdf, Format::Txt).unwrap();
    let extracted = normalize(&std::fs::read_to_string(txt.path()).unwrap());
    for word in ["Invoice", "42", "Total", "100", "EUR", "Thank"] {
        assert!(extracted.contains(word), "{word:?} missing from {extracted:?}");
    }
}

#[test]
fn test_long_docx_paginates_pdf() {
    let (dir, converter) = converter();
    let text: String = (1..=120).map(|i| format!("Line {i}\n")).collect();
    let input = write_input(dir.path(), "long.txt", text.as_bytes());

    let docx = converter.convert(&input, Format::Txt, Format::Docx).unwrap();
    let pdf = converter.convert(docx.path(), Format::Docx, Format::Pdf).unwrap();
    assert!(lopdf::Document::load(pdf.path()).unwrap().get_pages().len() >= 3);
}

#[test]
fn test_concurrent_conversions_use_distinct_outputs() {
    let (dir, converter) = converter();
    let converter = Arc::new(converter);

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let converter = Arc::clone(&converter);
            let input = dir.path().join(format!("in-{i}.png"));
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([i * 20, 0, 0, 255])))
                .save_with_format(&input, ImageFormat::Png)
                .unwrap();
            std::thread::spawn(move || converter.convert(&input, Format::Png, Format::Webp).unwrap())
        })
        .collect();

    let outputs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let mut paths: Vec<PathBuf> = outputs.iter().map(|o| o.path().to_path_buf()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 8);
    assert!(paths.iter().all(|p| p.exists()));

    drop(outputs);
    assert_eq!(temp_entries(&converter), 0);
}
