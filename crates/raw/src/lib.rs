//! Camera RAW container parsing.
//!
//! Both supported formats ([`RawType`]) are TIFF containers that carry one
//! or more JPEG previews next to the sensor data. This crate finds the
//! largest displayable preview and the orientation recorded in IFD0; it does
//! not decode sensor data.

pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
mod jpeg;
mod kind;
mod tiff;

use crate::error::{ErrorKind, Result};
pub use crate::kind::RawType;
use crate::tiff::{
    TAG_COMPRESSION, TAG_JPEG_LENGTH, TAG_JPEG_OFFSET, TAG_ORIENTATION, TAG_STRIP_BYTE_COUNTS, TAG_STRIP_OFFSETS,
    Tiff,
};
use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::Range;
use tracing::instrument;

/// Old-style and new-style JPEG compression values.
const JPEG_COMPRESSION: [u32; 2] = [6, 7];

/// Converts an EXIF orientation value into a clockwise rotation in radians.
///
/// Mirrored orientations (2, 4, 5, 7) and unknown values map to zero; only
/// pure rotations are corrected.
#[must_use]
pub fn orientation_radians(orientation: u16) -> f64 {
    match orientation {
        3 => PI,
        6 => FRAC_PI_2,
        8 => 3.0 * FRAC_PI_2,
        _ => 0.0,
    }
}

/// A parsed RAW container, borrowing the file contents.
pub struct RawFile<'a> {
    data: &'a [u8],
    jpeg: Range<usize>,
    orientation: Option<u16>,
}

impl<'a> RawFile<'a> {
    /// Parses the container and selects the largest displayable JPEG preview.
    #[instrument(skip(data), fields(size = data.len()))]
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let tiff = Tiff::new(data)?;
        let ifds = tiff.walk()?;
        let orientation =
            ifds.first().and_then(|ifd| tiff.value(ifd, TAG_ORIENTATION)).and_then(|v| u16::try_from(v).ok());

        let mut candidates = Vec::new();
        for ifd in &ifds {
            if let (Some(offset), Some(length)) = (tiff.value(ifd, TAG_JPEG_OFFSET), tiff.value(ifd, TAG_JPEG_LENGTH)) {
                candidates.push((offset, length));
            }
            let compression = tiff.value(ifd, TAG_COMPRESSION);
            if compression.is_some_and(|c| JPEG_COMPRESSION.contains(&c))
                && let (Some(strips), Some(counts)) = (ifd.get(TAG_STRIP_OFFSETS), ifd.get(TAG_STRIP_BYTE_COUNTS))
                && let (Ok(strips), Ok(counts)) = (tiff.values(strips), tiff.values(counts))
                && let ([offset], [length]) = (strips.as_slice(), counts.as_slice())
            {
                candidates.push((*offset, *length));
            }
        }

        let jpeg = candidates
            .into_iter()
            .filter_map(|(offset, length)| {
                let start = offset as usize;
                let range = start..start.checked_add(length as usize)?;
                let bytes = tiff.data().get(range.clone())?;
                (!bytes.is_empty() && jpeg::is_displayable(bytes)).then_some(range)
            })
            .max_by_key(|range| range.len())
            .ok_or(ErrorKind::NoEmbeddedJpeg)?;
        tracing::trace!(offset = jpeg.start, length = jpeg.len(), orientation, "Embedded JPEG located");
        Ok(Self { data, jpeg, orientation })
    }

    /// The embedded JPEG stream, exactly as stored in the container.
    #[must_use]
    pub fn jpeg(&self) -> &'a [u8] {
        &self.data[self.jpeg.clone()]
    }

    /// Clockwise rotation, in radians, needed to display the preview upright.
    #[must_use]
    pub fn orientation(&self) -> f64 {
        self.orientation.map(orientation_radians).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{TiffBuilder, fake_jpeg};
    use rstest::rstest;

    #[rstest]
    #[case(1, 0.0)]
    #[case(2, 0.0)]
    #[case(3, PI)]
    #[case(6, FRAC_PI_2)]
    #[case(8, 3.0 * FRAC_PI_2)]
    #[case(42, 0.0)]
    fn test_orientation_radians(#[case] tag: u16, #[case] expected: f64) {
        assert_eq!(orientation_radians(tag), expected);
    }

    #[test]
    fn picks_largest_displayable_preview() {
        let full = fake_jpeg(0xC0, 256);
        let data = TiffBuilder::new()
            .orientation(6)
            .strip_jpeg(fake_jpeg(0xC0, 32))
            .thumbnail_jpeg(fake_jpeg(0xC0, 8))
            .sub_ifd_jpeg(full.clone())
            .build();
        let raw = RawFile::parse(&data).unwrap();
        assert_eq!(raw.jpeg(), full.as_slice());
        assert_eq!(raw.orientation(), FRAC_PI_2);
    }

    #[test]
    fn ignores_lossless_sensor_data() {
        // CR2 style: the raw sensor data is the biggest "JPEG", but lossless.
        let preview = fake_jpeg(0xC0, 16);
        let data = TiffBuilder::new().strip_jpeg(fake_jpeg(0xC3, 1024)).thumbnail_jpeg(preview.clone()).build();
        let raw = RawFile::parse(&data).unwrap();
        assert_eq!(raw.jpeg(), preview.as_slice());
        assert_eq!(raw.orientation(), 0.0);
    }

    #[test]
    fn ignores_uncompressed_strips() {
        let data = TiffBuilder::new().big_endian().strip_with_compression(1, fake_jpeg(0xC0, 64)).build();
        assert_eq!(*RawFile::parse(&data).err().unwrap(), ErrorKind::NoEmbeddedJpeg);
    }

    #[test]
    fn not_a_raw_file() {
        assert_eq!(*RawFile::parse(b"plain text, not a container").err().unwrap(), ErrorKind::NotTiff);
    }
}
