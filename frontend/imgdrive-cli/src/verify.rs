//! CD-ROM EDC checks on raw data sectors


use crc::Crc;
use imgfile::BYTES_PER_SECTOR;
use std::ops::Range;

const CD_ROM_CRC: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_CD_ROM_EDC);

const MODE_BYTE: usize = 15;
const SUBMODE_BYTE: usize = 18;
const SUBMODE_FORM_2: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorKind {
    Mode1,
    Mode2Form1,
    Mode2Form2,
    Other(u8),
}

impl SectorKind {
    #[must_use]
    pub fn of(sector: &[u8; BYTES_PER_SECTOR]) -> Self {
        match sector[MODE_BYTE] {
            1 => Self::Mode1,
            2 if sector[SUBMODE_BYTE] & SUBMODE_FORM_2 != 0 => Self::Mode2Form2,
            2 => Self::Mode2Form1,
            mode => Self::Other(mode),
        }
    }

    /// Bytes covered by the EDC, and where the EDC is stored.
    fn edc_ranges(self) -> Option<(Range<usize>, Range<usize>)> {
        match self {
            Self::Mode1 => Some((0..2064, 2064..2068)),
            Self::Mode2Form1 => Some((16..2072, 2072..2076)),
            Self::Mode2Form2 => Some((16..2348, 2348..2352)),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdcCheck {
    Valid,
    /// Form 2 sectors may leave the EDC zeroed.
    Absent,
    Unchecked,
    Mismatch { expected: u32, actual: u32 },
}

#[must_use]
pub fn check_edc(sector: &[u8; BYTES_PER_SECTOR]) -> EdcCheck {
    let kind = SectorKind::of(sector);
    let Some((digest_range, edc_range)) = kind.edc_ranges() else {
        return EdcCheck::Unchecked;
    };

    let mut edc_bytes = [0; 4];
    edc_bytes.copy_from_slice(&sector[edc_range]);
    let expected = u32::from_le_bytes(edc_bytes);
    if expected == 0 && kind == SectorKind::Mode2Form2 {
        return EdcCheck::Absent;
    }

    let actual = CD_ROM_CRC.checksum(&sector[digest_range]);
    if actual == expected { EdcCheck::Valid } else { EdcCheck::Mismatch { expected, actual } }
}

/// Running totals over every sector checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifySummary {
    pub valid: u32,
    pub absent: u32,
    pub unchecked: u32,
    pub mismatched: u32,
}

impl VerifySummary {
    pub fn record(&mut self, sector: u32, check: EdcCheck) {
        match check {
            EdcCheck::Valid => self.valid += 1,
            EdcCheck::Absent => self.absent += 1,
            EdcCheck::Unchecked => self.unchecked += 1,
            EdcCheck::Mismatch { expected, actual } => {
                log::warn!(
                    "EDC mismatch in sector {sector}: stored {expected:08X}, computed {actual:08X}"
                );
                self.mismatched += 1;
            }
        }
    }
}
