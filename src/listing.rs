use rvdsm::{DecodeError, Decoder, Disassembly};

#[derive(Debug)]
pub struct Item {
    pub pc: u64,
    pub word: u32,
    /// 2 or 4.
    pub len: usize,
    pub disassembly: Result<Disassembly, DecodeError>,
}

/// Decodes a contiguous code image starting at `base`.
///
/// Fetches two bytes at a time and widens to four when the low bits ask for it.
/// A trailing partial instruction ends the listing.
pub struct Listing<'a> {
    decoder: Decoder,
    pc: u64,
    bytes: &'a [u8],
}

impl<'a> Listing<'a> {
    pub fn new(decoder: Decoder, base: u64, bytes: &'a [u8]) -> Self {
        Self {
            decoder,
            pc: base,
            bytes,
        }
    }

    /// The bytes not consumed yet.
    pub fn remainder(&self) -> &'a [u8] {
        self.bytes
    }
}

impl Iterator for Listing<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let (low, _) = self.bytes.split_first_chunk::<2>()?;
        let low = u16::from_le_bytes(*low);
        let len = rvdsm::instruction_len(low);
        let word = match len {
            2 => low as u32,
            _ => u32::from_le_bytes(*self.bytes.first_chunk::<4>()?),
        };

        let pc = self.pc;
        self.bytes = &self.bytes[len..];
        self.pc = self.pc.wrapping_add(len as u64);

        Some(Item {
            pc,
            word,
            len,
            disassembly: self.decoder.decode(word as u64, pc),
        })
    }
}
