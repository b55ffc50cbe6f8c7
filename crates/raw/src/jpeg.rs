//! Just enough JPEG marker parsing to tell a viewable preview apart from
//! lossless-compressed sensor data (which shares the same container tags).

const SOI: [u8; 2] = [0xFF, 0xD8];
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;

/// Returns the start-of-frame marker of the first frame, if any.
pub(crate) fn frame_marker(data: &[u8]) -> Option<u8> {
    if !data.starts_with(&SOI) {
        return None;
    }
    let mut pos = 2;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        // Any number of 0xFF fill bytes may precede a marker.
        while *data.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos + 1)?;
        match marker {
            // DHT, JPG and DAC share the SOFn range but aren't frames.
            0xC4 | 0xC8 | 0xCC => {},
            0xC0..=0xCF => return Some(marker),
            SOS | EOI => return None,
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            },
            _ => {},
        }
        let length = u16::from_be_bytes([*data.get(pos + 2)?, *data.get(pos + 3)?]) as usize;
        pos += 2 + length;
    }
}

/// Baseline, extended or progressive Huffman frames are what every viewer
/// and encoder understands.
pub(crate) fn is_displayable(data: &[u8]) -> bool {
    matches!(frame_marker(data), Some(0xC0..=0xC2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::fake_jpeg;
    use rstest::rstest;

    #[rstest]
    #[case(0xC0, true)]
    #[case(0xC1, true)]
    #[case(0xC2, true)]
    #[case(0xC3, false)]
    fn test_displayable(#[case] sof: u8, #[case] expected: bool) {
        assert_eq!(is_displayable(&fake_jpeg(sof, 32)), expected);
    }

    #[test]
    fn skips_fill_bytes_and_tables() {
        let data = [
            0xFF, 0xD8, // SOI
            0xFF, 0xFF, 0xC4, 0x00, 0x03, 0x00, // DHT behind a fill byte
            0xFF, 0xC2, 0x00, 0x02, // SOF2
        ];
        assert_eq!(frame_marker(&data), Some(0xC2));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(frame_marker(b"not a jpeg"), None);
        assert_eq!(frame_marker(&[0xFF, 0xD8]), None);
        assert_eq!(frame_marker(&[0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02]), None);
        assert_eq!(frame_marker(&[0xFF, 0xD8, 0x00, 0x00]), None);
    }
}
