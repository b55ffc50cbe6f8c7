//! Minimal TIFF IFD walker.
//!
//! NEF and CR2 are both TIFF containers. Only the handful of tags needed to
//! find orientation and the embedded previews are interpreted; everything
//! else is skipped.

use crate::error::{ErrorKind, Result};
use std::collections::{HashSet, VecDeque};

pub(crate) const TAG_COMPRESSION: u16 = 0x0103;
pub(crate) const TAG_STRIP_OFFSETS: u16 = 0x0111;
pub(crate) const TAG_ORIENTATION: u16 = 0x0112;
pub(crate) const TAG_STRIP_BYTE_COUNTS: u16 = 0x0117;
pub(crate) const TAG_SUB_IFDS: u16 = 0x014A;
pub(crate) const TAG_JPEG_OFFSET: u16 = 0x0201;
pub(crate) const TAG_JPEG_LENGTH: u16 = 0x0202;

const TIFF_MAGIC: u16 = 42;
const ENTRY_SIZE: usize = 12;
/// Upper bound on directories visited, for files with pathological SubIFD trees.
const MAX_IFDS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}
impl ByteOrder {
    fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(bytes),
            Self::Big => u16::from_be_bytes(bytes),
        }
    }

    fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(bytes),
            Self::Big => u32::from_be_bytes(bytes),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Entry {
    pub(crate) tag: u16,
    kind: u16,
    count: u32,
    /// The value/offset field exactly as it appears in the file.
    raw: [u8; 4],
}

#[derive(Debug)]
pub(crate) struct Ifd {
    entries: Vec<Entry>,
    next: u32,
}
impl Ifd {
    pub(crate) fn get(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

pub(crate) struct Tiff<'a> {
    data: &'a [u8],
    order: ByteOrder,
    first: u32,
}

impl<'a> Tiff<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Result<Self> {
        let order = match data.get(..2) {
            Some(b"II") => ByteOrder::Little,
            Some(b"MM") => ByteOrder::Big,
            _ => exn::bail!(ErrorKind::NotTiff),
        };
        let mut tiff = Self { data, order, first: 0 };
        if tiff.read_u16(2)? != TIFF_MAGIC {
            exn::bail!(ErrorKind::NotTiff);
        }
        tiff.first = tiff.read_u32(4)?;
        Ok(tiff)
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let end = offset.checked_add(N).ok_or(ErrorKind::Truncated)?;
        let slice = self.data.get(offset..end).ok_or(ErrorKind::Truncated)?;
        let mut out = [0; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_u16(&self, offset: usize) -> Result<u16> {
        Ok(self.order.u16(self.bytes(offset)?))
    }

    fn read_u32(&self, offset: usize) -> Result<u32> {
        Ok(self.order.u32(self.bytes(offset)?))
    }

    pub(crate) fn ifd(&self, offset: u32) -> Result<Ifd> {
        let offset = offset as usize;
        let count = self.read_u16(offset)? as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = offset + 2 + i * ENTRY_SIZE;
            entries.push(Entry {
                tag: self.read_u16(at)?,
                kind: self.read_u16(at + 2)?,
                count: self.read_u32(at + 4)?,
                raw: self.bytes(at + 8)?,
            });
        }
        let next = self.read_u32(offset + 2 + count * ENTRY_SIZE)?;
        Ok(Ifd { entries, next })
    }

    /// Walks IFD0, the rest of the main chain and every SubIFD, breadth-first.
    ///
    /// IFD0 is always first in the result. Directories other than IFD0 that
    /// fail to parse are skipped rather than failing the whole file.
    pub(crate) fn walk(&self) -> Result<Vec<Ifd>> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([self.first]);
        while let Some(offset) = queue.pop_front() {
            if offset == 0 || !visited.insert(offset) {
                continue;
            }
            if found.len() >= MAX_IFDS {
                tracing::debug!(limit = MAX_IFDS, "IFD limit reached; ignoring remaining directories");
                break;
            }
            let ifd = match self.ifd(offset) {
                Ok(ifd) => ifd,
                Err(e) if found.is_empty() => return Err(e),
                Err(_) => {
                    tracing::debug!(offset, "Skipping unreadable IFD");
                    continue;
                },
            };
            queue.push_back(ifd.next);
            if let Some(subs) = ifd.get(TAG_SUB_IFDS) {
                queue.extend(self.values(subs).unwrap_or_default());
            }
            found.push(ifd);
        }
        Ok(found)
    }

    /// All values of an integer entry (BYTE, SHORT, LONG or IFD), widened to `u32`.
    pub(crate) fn values(&self, entry: &Entry) -> Result<Vec<u32>> {
        let size = match entry.kind {
            1 => 1,
            3 => 2,
            4 | 13 => 4,
            _ => return Ok(Vec::new()),
        };
        let count = entry.count as usize;
        let total = count.checked_mul(size).ok_or(ErrorKind::Truncated)?;
        let bytes = if total <= 4 {
            &entry.raw[..total]
        } else {
            let start = self.order.u32(entry.raw) as usize;
            let end = start.checked_add(total).ok_or(ErrorKind::Truncated)?;
            self.data.get(start..end).ok_or(ErrorKind::Truncated)?
        };
        Ok(bytes
            .chunks_exact(size)
            .map(|chunk| match size {
                1 => u32::from(chunk[0]),
                2 => u32::from(self.order.u16([chunk[0], chunk[1]])),
                _ => self.order.u32([chunk[0], chunk[1], chunk[2], chunk[3]]),
            })
            .collect())
    }

    pub(crate) fn value(&self, ifd: &Ifd, tag: u16) -> Option<u32> {
        let entry = ifd.get(tag)?;
        self.values(entry).ok()?.first().copied()
    }

    pub(crate) fn data(&self) -> &'a [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{TiffBuilder, fake_jpeg};

    #[test]
    fn rejects_non_tiff() {
        assert_eq!(*Tiff::new(b"\xFF\xD8\xFF\xE0").err().unwrap(), ErrorKind::NotTiff);
        assert_eq!(*Tiff::new(b"II\x2B\x00\x08\x00\x00\x00").err().unwrap(), ErrorKind::NotTiff);
        assert_eq!(*Tiff::new(b"").err().unwrap(), ErrorKind::NotTiff);
    }

    #[test]
    fn truncated_header() {
        assert_eq!(*Tiff::new(b"II\x2A\x00\x08").err().unwrap(), ErrorKind::Truncated);
    }

    #[test]
    fn walks_chain_and_sub_ifds() {
        let data = TiffBuilder::new()
            .orientation(6)
            .thumbnail_jpeg(fake_jpeg(0xC0, 8))
            .sub_ifd_jpeg(fake_jpeg(0xC0, 16))
            .build();
        let tiff = Tiff::new(&data).unwrap();
        let ifds = tiff.walk().unwrap();
        assert_eq!(ifds.len(), 3);
        assert_eq!(tiff.value(&ifds[0], TAG_ORIENTATION), Some(6));
    }

    #[test]
    fn big_endian_values() {
        let data = TiffBuilder::new().big_endian().orientation(8).build();
        let tiff = Tiff::new(&data).unwrap();
        let ifds = tiff.walk().unwrap();
        assert_eq!(tiff.value(&ifds[0], TAG_ORIENTATION), Some(8));
    }

    #[test]
    fn self_referencing_chain_terminates() {
        // IFD0 at offset 8 with zero entries whose "next" points back at itself.
        let data = b"II\x2A\x00\x08\x00\x00\x00\x00\x00\x08\x00\x00\x00";
        let tiff = Tiff::new(data).unwrap();
        assert_eq!(tiff.walk().unwrap().len(), 1);
    }

    #[test]
    fn unreadable_ifd0_is_an_error() {
        let data = b"II\x2A\x00\xFF\x00\x00\x00";
        let tiff = Tiff::new(data).unwrap();
        assert_eq!(*tiff.walk().unwrap_err(), ErrorKind::Truncated);
    }
}
