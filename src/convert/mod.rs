//! Conversion core: the format matrix and the dispatcher that runs one
//! conversion into a temporary file.

pub mod document;
pub mod error;
pub mod format;
pub mod image;
pub mod media;

use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempPath;
use tracing::{debug, info, warn};

pub use error::ConvertError;
pub use format::{allowed_targets, is_supported, ConversionEntry, Format, FormatFamily, MATRIX};
pub use self::image::ImageOptions;
pub use media::MediaTools;

/// The routine that handles one matrix pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PdfToDocx,
    PdfToText,
    DocxToPdf,
    DocxToText,
    TextToDocx,
    Image,
    Audio,
    VideoToMp3,
}

/// Routine for a pair, or `None` if nothing can perform it.
pub fn route(from: Format, to: Format) -> Option<Route> {
    use Format::*;

    if from == to {
        return None;
    }
    match (from, to) {
        (Pdf, Docx) => Some(Route::PdfToDocx),
        (Pdf, Txt) => Some(Route::PdfToText),
        (Docx, Pdf) => Some(Route::DocxToPdf),
        (Docx, Txt) => Some(Route::DocxToText),
        (Txt, Docx) => Some(Route::TextToDocx),
        (Jpg | Jpeg | Png | Webp, Jpg | Png | Webp) => Some(Route::Image),
        (Mp3 | Wav | Ogg, Mp3 | Wav | Ogg) => Some(Route::Audio),
        (Mp4, Mp3) => Some(Route::VideoToMp3),
        _ => None,
    }
}

/// Check that every matrix pair has a routine.
pub fn verify_routes() -> Result<(), ConvertError> {
    for entry in MATRIX {
        for &target in entry.targets {
            if route(entry.source, target).is_none() {
                return Err(ConvertError::MissingRoute { from: entry.source, to: target });
            }
        }
    }
    Ok(())
}

/// Settings the dispatcher is built from.
#[derive(Debug, Clone)]
pub struct ConvertSettings {
    /// Directory holding in-flight inputs and outputs.
    pub temp_dir: PathBuf,
    pub image: ImageOptions,
    pub media: MediaTools,
}

impl ConvertSettings {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            image: ImageOptions::default(),
            media: MediaTools::default(),
        }
    }
}

/// One conversion to perform.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub source: Format,
    pub target: Format,
}

/// A converted file. The file is deleted when this is dropped.
#[derive(Debug)]
pub struct ConversionOutput {
    pub path: TempPath,
    pub format: Format,
}

impl ConversionOutput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name to deliver the result under.
    pub fn file_name(&self) -> String {
        format!("converted.{}", self.format.extension())
    }
}

/// Runs conversions. Holds only configuration; safe to share across threads.
#[derive(Debug)]
pub struct Converter {
    settings: ConvertSettings,
}

impl Converter {
    /// Create the temporary directory and check the routine table.
    pub fn new(settings: ConvertSettings) -> Result<Self, ConvertError> {
        verify_routes()?;
        std::fs::create_dir_all(&settings.temp_dir)?;
        info!("Converter ready (temp dir: {:?})", settings.temp_dir);
        Ok(Self { settings })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.settings.temp_dir
    }

    pub fn allowed_targets(&self, source: Format) -> &'static [Format] {
        allowed_targets(source)
    }

    /// Whether the audio/video routines can run on this host.
    pub fn media_tools_available(&self) -> bool {
        self.settings.media.available()
    }

    /// A fresh, uniquely named temporary path for an input of `format`.
    pub fn stage_input(&self, format: Format) -> Result<TempPath, ConvertError> {
        self.temp_path("in-", format)
    }

    fn temp_path(&self, prefix: &str, format: Format) -> Result<TempPath, ConvertError> {
        let suffix = format!(".{}", format.extension());
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(&suffix)
            .tempfile_in(&self.settings.temp_dir)?;
        Ok(file.into_temp_path())
    }

    pub fn run(&self, request: &ConversionRequest) -> Result<ConversionOutput, ConvertError> {
        self.convert(&request.input, request.source, request.target)
    }

    /// Convert `input` from `source` to `target` into a new temporary file.
    ///
    /// The input is never modified. On error no output file is left behind.
    pub fn convert(&self, input: &Path, source: Format, target: Format) -> Result<ConversionOutput, ConvertError> {
        if !is_supported(source, target) {
            return Err(ConvertError::Unsupported { from: source, to: target });
        }
        let route = route(source, target).ok_or(ConvertError::MissingRoute { from: source, to: target })?;
        std::fs::File::open(input).map_err(ConvertError::unreadable_input)?;

        let output = self.temp_path("out-", target)?;
        let started = Instant::now();
        debug!("Converting {:?} ({source} -> {target}) via {:?}", input, route);

        let result = match route {
            Route::PdfToDocx => document::pdf_to_docx(input, &output),
            Route::PdfToText => document::pdf_to_txt(input, &output),
            Route::DocxToPdf => document::docx_to_pdf(input, &output),
            Route::DocxToText => document::docx_to_txt(input, &output),
            Route::TextToDocx => document::txt_to_docx(input, &output),
            Route::Image => image::convert_image(input, &output, target, &self.settings.image),
            Route::Audio => self.settings.media.convert_audio(input, &output, target),
            Route::VideoToMp3 => self.settings.media.extract_audio(input, &output),
        };

        match result {
            Ok(()) => {
                info!(
                    "✅ Converted {source} -> {target} in {} ms",
                    started.elapsed().as_millis()
                );
                Ok(ConversionOutput { path: output, format: target })
            }
            Err(e) => {
                warn!("Conversion {source} -> {target} failed: {e}");
                // Dropping the TempPath removes any partial output.
                drop(output);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_matrix_pair_has_a_route() {
        verify_routes().expect("matrix and routes out of sync");
        for entry in MATRIX {
            for &target in entry.targets {
                assert!(is_supported(entry.source, target));
                assert!(route(entry.source, target).is_some());
            }
        }
    }

    #[test]
    fn test_route_never_identity() {
        for format in Format::ALL {
            assert_eq!(route(format, format), None);
        }
    }

    #[test]
    fn test_route_kinds() {
        assert_eq!(route(Format::Png, Format::Jpg), Some(Route::Image));
        assert_eq!(route(Format::Wav, Format::Ogg), Some(Route::Audio));
        assert_eq!(route(Format::Mp4, Format::Mp3), Some(Route::VideoToMp3));
        assert_eq!(route(Format::Mp3, Format::Pdf), None);
    }

    #[test]
    fn test_new_creates_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let temp_dir = dir.path().join("nested").join("temp");
        let converter = Converter::new(ConvertSettings::new(&temp_dir)).unwrap();
        assert!(temp_dir.is_dir());
        assert_eq!(converter.temp_dir(), temp_dir.as_path());
    }

    #[test]
    fn test_stage_input_is_unique_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(ConvertSettings::new(dir.path())).unwrap();

        let a = converter.stage_input(Format::Pdf).unwrap();
        let b = converter.stage_input(Format::Pdf).unwrap();
        assert_ne!(a.to_path_buf(), b.to_path_buf());
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("pdf"));

        let kept = a.to_path_buf();
        drop(a);
        assert!(!kept.exists());
    }

    #[test]
    fn test_unsupported_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(ConvertSettings::new(dir.path())).unwrap();

        let err = converter
            .convert(Path::new("missing.mp3"), Format::Mp3, Format::Pdf)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Unsupported { from: Format::Mp3, to: Format::Pdf }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_run_converts_request() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(ConvertSettings::new(dir.path().join("temp"))).unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "first line\n\nsecond paragraph").unwrap();

        let request = ConversionRequest { input, source: Format::Txt, target: Format::Docx };
        let output = converter.run(&request).unwrap();
        assert_eq!(output.format, Format::Docx);
        assert_eq!(output.path().extension().unwrap(), "docx");
        let path = output.path().to_path_buf();
        assert!(path.exists());

        drop(output);
        assert!(!path.exists());
        assert!(request.input.exists());
    }

    #[test]
    fn test_output_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(ConvertSettings::new(dir.path())).unwrap();
        let output = ConversionOutput {
            path: converter.temp_path("out-", Format::Webp).unwrap(),
            format: Format::Webp,
        };
        assert_eq!(output.file_name(), "converted.webp");
    }
}
