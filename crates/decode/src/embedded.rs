use crate::error::{ErrorKind, Result};
use crate::{Backend, Decoder, ExtractionResult, output_path};
use exn::ResultExt;
use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use jpgx_raw::RawFile;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::instrument;

/// Extracts the largest embedded JPEG preview from a TIFF-based RAW file.
///
/// With [`Backend::Reencode`] the preview is decoded and encoded again at the
/// requested quality; with [`Backend::Embedded`] it is written unchanged.
#[derive(Clone, Copy, Debug)]
pub struct EmbeddedDecoder {
    backend: Backend,
}

impl EmbeddedDecoder {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    fn encode<'a>(&self, jpeg: &'a [u8], quality: u8) -> Result<Cow<'a, [u8]>> {
        match self.backend {
            Backend::Embedded => Ok(Cow::Borrowed(jpeg)),
            Backend::Reencode => {
                let image =
                    image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg).or_raise(|| ErrorKind::Encode)?;
                let mut out = Vec::with_capacity(jpeg.len());
                JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                    .encode_image(&image.to_rgb8())
                    .or_raise(|| ErrorKind::Encode)?;
                Ok(Cow::Owned(out))
            },
        }
    }
}

impl Decoder for EmbeddedDecoder {
    #[instrument(skip(self, dest_dir), fields(backend = %self.backend))]
    fn extract(&self, path: &Path, dest_dir: &Path, quality: u8) -> Result<ExtractionResult> {
        let bytes = std::fs::read(path).or_raise(|| ErrorKind::Io)?;
        let raw = RawFile::parse(&bytes).or_raise(|| ErrorKind::Container)?;
        let encoded = self.encode(raw.jpeg(), quality)?;

        // Write next to the final location and rename into place, so a failed
        // decode never leaves a partial output behind.
        let jpeg_path = output_path(path, dest_dir);
        let mut tmp = NamedTempFile::new_in(dest_dir).or_raise(|| ErrorKind::Io)?;
        tmp.write_all(&encoded).or_raise(|| ErrorKind::Io)?;
        tmp.persist(&jpeg_path).or_raise(|| ErrorKind::Io)?;
        tracing::debug!(jpeg = %jpeg_path.display(), bytes = encoded.len(), "JPEG written");

        Ok(ExtractionResult { jpeg_path, orientation: raw.orientation() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use jpgx_raw::fixture::{TiffBuilder, fake_jpeg};
    use std::f64::consts::PI;

    fn real_jpeg() -> Vec<u8> {
        let image = ImageBuffer::from_fn(16, 8, |x, y| Rgb([(x * 16) as u8, (y * 32) as u8, 128]));
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 95).encode_image(&image).unwrap();
        out
    }

    fn write_raw(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn embedded_copies_preview_verbatim() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let preview = fake_jpeg(0xC0, 64);
        let container = TiffBuilder::new().orientation(3).sub_ifd_jpeg(preview.clone()).build();
        let raw = write_raw(src.path(), "DSC_0001.NEF", &container);

        let result = EmbeddedDecoder::new(Backend::Embedded).extract(&raw, dest.path(), 80).unwrap();
        assert_eq!(result.jpeg_path, dest.path().join("DSC_0001_extracted.jpg"));
        assert_eq!(result.orientation, PI);
        assert_eq!(std::fs::read(&result.jpeg_path).unwrap(), preview);
    }

    #[test]
    fn reencode_produces_decodable_jpeg() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let raw = write_raw(src.path(), "IMG_0001.CR2", &TiffBuilder::new().strip_jpeg(real_jpeg()).build());

        let result = EmbeddedDecoder::new(Backend::Reencode).extract(&raw, dest.path(), 40).unwrap();
        assert_eq!(result.orientation, 0.0);
        let written = image::open(&result.jpeg_path).unwrap();
        assert_eq!((written.width(), written.height()), (16, 8));
    }

    #[test]
    fn rerun_overwrites_same_output() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let raw = write_raw(src.path(), "a.NEF", &TiffBuilder::new().thumbnail_jpeg(fake_jpeg(0xC0, 8)).build());
        let decoder = EmbeddedDecoder::new(Backend::Embedded);
        let first = decoder.extract(&raw, dest.path(), 80).unwrap();
        let second = decoder.extract(&raw, dest.path(), 80).unwrap();
        assert_eq!(first.jpeg_path, second.jpeg_path);
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 1);
    }

    #[test]
    fn invalid_container_leaves_no_output() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let raw = write_raw(src.path(), "broken.CR2", b"definitely not a RAW file");
        let err = EmbeddedDecoder::new(Backend::Reencode).extract(&raw, dest.path(), 80).unwrap_err();
        assert_eq!(*err, ErrorKind::Container);
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_source_is_io() {
        let dest = tempfile::tempdir().unwrap();
        let err = EmbeddedDecoder::new(Backend::Embedded)
            .extract(Path::new("/nonexistent/jpgx/a.NEF"), dest.path(), 80)
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
    }
}
