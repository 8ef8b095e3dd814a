//! File formats and the conversion matrix.
//!
//! The matrix is a static table: for each source format, the ordered list
//! of formats it may be converted into. Nothing here touches the filesystem.

use std::fmt;
use std::path::Path;

/// A file-type tag used to pick conversion routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    Pdf,
    Docx,
    Txt,
    Jpg,
    Jpeg,
    Png,
    Webp,
    Mp3,
    Wav,
    Ogg,
    Mp4,
}

/// Broad grouping used by the bot menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    Document,
    Image,
    Audio,
    Video,
}

impl Format {
    pub const ALL: [Format; 11] = [
        Format::Pdf,
        Format::Docx,
        Format::Txt,
        Format::Jpg,
        Format::Jpeg,
        Format::Png,
        Format::Webp,
        Format::Mp3,
        Format::Wav,
        Format::Ogg,
        Format::Mp4,
    ];

    /// Lowercase file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Txt => "txt",
            Format::Jpg => "jpg",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Mp3 => "mp3",
            Format::Wav => "wav",
            Format::Ogg => "ogg",
            Format::Mp4 => "mp4",
        }
    }

    /// Uppercase label for buttons and messages.
    pub fn label(self) -> &'static str {
        match self {
            Format::Pdf => "PDF",
            Format::Docx => "DOCX",
            Format::Txt => "TXT",
            Format::Jpg => "JPG",
            Format::Jpeg => "JPEG",
            Format::Png => "PNG",
            Format::Webp => "WEBP",
            Format::Mp3 => "MP3",
            Format::Wav => "WAV",
            Format::Ogg => "OGG",
            Format::Mp4 => "MP4",
        }
    }

    pub fn family(self) -> FormatFamily {
        match self {
            Format::Pdf | Format::Docx | Format::Txt => FormatFamily::Document,
            Format::Jpg | Format::Jpeg | Format::Png | Format::Webp => FormatFamily::Image,
            Format::Mp3 | Format::Wav | Format::Ogg => FormatFamily::Audio,
            Format::Mp4 => FormatFamily::Video,
        }
    }

    /// MIME type used when delivering a converted file.
    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Pdf => "application/pdf",
            Format::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Format::Txt => "text/plain",
            Format::Jpg | Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Webp => "image/webp",
            Format::Mp3 => "audio/mpeg",
            Format::Wav => "audio/wav",
            Format::Ogg => "audio/ogg",
            Format::Mp4 => "video/mp4",
        }
    }

    /// Parse an extension such as `"PDF"`, `".docx"` or `"jpeg"`.
    pub fn from_extension(ext: &str) -> Option<Format> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        Format::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Detect the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Format> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    /// Best-effort detection from a MIME type, for uploads without a usable name.
    pub fn from_mime(mime: &str) -> Option<Format> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Format::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Format::Docx)
            }
            "text/plain" => Some(Format::Txt),
            "image/jpeg" | "image/jpg" => Some(Format::Jpg),
            "image/png" => Some(Format::Png),
            "image/webp" => Some(Format::Webp),
            "audio/mpeg" | "audio/mp3" => Some(Format::Mp3),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Format::Wav),
            "audio/ogg" | "audio/vorbis" | "audio/opus" => Some(Format::Ogg),
            "video/mp4" => Some(Format::Mp4),
            _ => None,
        }
    }

    /// Sources belonging to a family, in matrix order.
    pub fn sources_in(family: FormatFamily) -> Vec<Format> {
        MATRIX
            .iter()
            .map(|entry| entry.source)
            .filter(|f| f.family() == family)
            .collect()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A source format and the targets it may become.
#[derive(Debug, Clone, Copy)]
pub struct ConversionEntry {
    pub source: Format,
    pub targets: &'static [Format],
}

/// The conversion matrix, in menu order.
pub const MATRIX: &[ConversionEntry] = &[
    ConversionEntry { source: Format::Pdf, targets: &[Format::Docx, Format::Txt] },
    ConversionEntry { source: Format::Docx, targets: &[Format::Pdf, Format::Txt] },
    ConversionEntry { source: Format::Txt, targets: &[Format::Docx] },
    ConversionEntry { source: Format::Jpg, targets: &[Format::Png, Format::Webp] },
    ConversionEntry { source: Format::Jpeg, targets: &[Format::Png, Format::Webp] },
    ConversionEntry { source: Format::Png, targets: &[Format::Jpg, Format::Webp] },
    ConversionEntry { source: Format::Webp, targets: &[Format::Jpg, Format::Png] },
    ConversionEntry { source: Format::Mp3, targets: &[Format::Wav, Format::Ogg] },
    ConversionEntry { source: Format::Wav, targets: &[Format::Mp3, Format::Ogg] },
    ConversionEntry { source: Format::Ogg, targets: &[Format::Mp3, Format::Wav] },
    ConversionEntry { source: Format::Mp4, targets: &[Format::Mp3] },
];

/// Formats `source` can be converted into. Empty if it has no entry.
pub fn allowed_targets(source: Format) -> &'static [Format] {
    MATRIX
        .iter()
        .find(|entry| entry.source == source)
        .map(|entry| entry.targets)
        .unwrap_or(&[])
}

pub fn is_supported(source: Format, target: Format) -> bool {
    allowed_targets(source).contains(&target)
}

/// Comma-separated labels, e.g. `"DOCX, TXT"`.
pub fn describe(formats: &[Format]) -> String {
    formats.iter().map(|f| f.label()).collect::<Vec<_>>().join(", ")
}
