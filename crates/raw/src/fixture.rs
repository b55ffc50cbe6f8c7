//! Synthetic RAW containers for tests in this and dependent crates.

/// A minimal marker stream: SOI, APP0, the requested SOF, SOS, `payload` filler bytes, EOI.
pub fn fake_jpeg(sof: u8, payload: usize) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
    jpeg.extend([0xFF, sof, 0x00, 0x08, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01]);
    jpeg.extend([0xFF, 0xDA, 0x00, 0x02]);
    jpeg.extend(std::iter::repeat_n(0x55, payload));
    jpeg.extend([0xFF, 0xD9]);
    jpeg
}

/// Builds a TIFF container laid out the way camera RAW files usually are:
/// an optional strip preview in IFD0, an optional thumbnail in IFD1 and an
/// optional full-size preview in a SubIFD.
#[derive(Default)]
pub struct TiffBuilder {
    big_endian: bool,
    orientation: Option<u16>,
    strip: Option<(u16, Vec<u8>)>,
    thumbnail: Option<Vec<u8>>,
    sub: Option<Vec<u8>>,
}

struct Writer {
    big_endian: bool,
    out: Vec<u8>,
}
impl Writer {
    fn u16(&mut self, v: u16) {
        self.out.extend(if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() });
    }

    fn u32(&mut self, v: u32) {
        self.out.extend(if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() });
    }

    fn short(&mut self, tag: u16, v: u16) {
        self.u16(tag);
        self.u16(3);
        self.u32(1);
        self.u16(v);
        self.u16(0);
    }

    fn long(&mut self, tag: u16, v: u32) {
        self.u16(tag);
        self.u16(4);
        self.u32(1);
        self.u32(v);
    }
}

fn ifd_size(entries: usize) -> u32 {
    (2 + 12 * entries + 4) as u32
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn orientation(mut self, value: u16) -> Self {
        self.orientation = Some(value);
        self
    }

    /// Stores the JPEG as IFD0's single strip, flagged as JPEG-compressed (6).
    pub fn strip_jpeg(self, jpeg: Vec<u8>) -> Self {
        self.strip_with_compression(6, jpeg)
    }

    pub fn strip_with_compression(mut self, compression: u16, data: Vec<u8>) -> Self {
        self.strip = Some((compression, data));
        self
    }

    pub fn thumbnail_jpeg(mut self, jpeg: Vec<u8>) -> Self {
        self.thumbnail = Some(jpeg);
        self
    }

    pub fn sub_ifd_jpeg(mut self, jpeg: Vec<u8>) -> Self {
        self.sub = Some(jpeg);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let ifd0_entries = usize::from(self.orientation.is_some())
            + if self.strip.is_some() { 3 } else { 0 }
            + usize::from(self.sub.is_some());
        let ifd0 = 8;
        let ifd1 = ifd0 + ifd_size(ifd0_entries);
        let sub = ifd1 + if self.thumbnail.is_some() { ifd_size(2) } else { 0 };
        let mut data = sub + if self.sub.is_some() { ifd_size(2) } else { 0 };
        let mut place = |blob: &Option<Vec<u8>>| {
            blob.as_ref().map(|b| {
                let at = data;
                data += b.len() as u32;
                at
            })
        };
        let strip_at = place(&self.strip.as_ref().map(|(_, b)| b.clone()));
        let thumbnail_at = place(&self.thumbnail);
        let sub_at = place(&self.sub);

        let mut w = Writer { big_endian: self.big_endian, out: Vec::new() };
        w.out.extend(if self.big_endian { b"MM" } else { b"II" });
        w.u16(42);
        w.u32(ifd0);

        w.u16(ifd0_entries as u16);
        if let Some((compression, _)) = &self.strip {
            w.short(0x0103, *compression);
            w.long(0x0111, strip_at.unwrap_or_default());
        }
        if let Some(orientation) = self.orientation {
            w.short(0x0112, orientation);
        }
        if let Some((_, blob)) = &self.strip {
            w.long(0x0117, blob.len() as u32);
        }
        if self.sub.is_some() {
            w.long(0x014A, sub);
        }
        w.u32(if self.thumbnail.is_some() { ifd1 } else { 0 });

        for (blob, at) in [(&self.thumbnail, thumbnail_at), (&self.sub, sub_at)] {
            if let Some(blob) = blob {
                w.u16(2);
                w.long(0x0201, at.unwrap_or_default());
                w.long(0x0202, blob.len() as u32);
                w.u32(0);
            }
        }

        for blob in [self.strip.map(|(_, b)| b), self.thumbnail, self.sub].into_iter().flatten() {
            w.out.extend(blob);
        }
        w.out
    }
}
