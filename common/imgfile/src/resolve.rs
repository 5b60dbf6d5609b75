//! Sector address resolution and sub-field selection
//!
//! A host read request names a logical sector and a flags byte saying which sector class it
//! expects and which parts of the raw 2352-byte sector it wants. Resolution maps the sector to its
//! region, checks the requested class against what the region actually stores, and works out how
//! many units to trim from the front and back of every raw sector.


use crate::header;
use crate::header::DiscImageHeader;
use crate::{SeekError, SeekResult};

// Trims below are in addressable units
const SYNC_FIELD_UNITS: u8 = 8;
const XA_SUB_HEADER_UNITS: u8 = 4;
// Mode 1 / mode 2 form 1: 4 EDC bytes + 8 zero bytes + 276 ECC bytes
const FORM_1_TRAILER_UNITS: u8 = 144;
// XA form 1 without the 8-byte sub-header counted at the front
const XA_FORM_1_TRAILER_UNITS: u8 = 140;
const XA_FORM_1_ECC_UNITS: u8 = 138;
const EDC_UNITS: u8 = 2;

/// Host request flags.
///
/// Bits 1-3 select the expected sector class; the high nibble controls sub-field trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFlags(pub u8);

impl RequestFlags {
    pub const RAW_PASSTHROUGH: u8 = 0x10;
    pub const FIELDS_ENABLED: u8 = 0x20;
    pub const NO_SUB_HEADER: u8 = 0x40;
    pub const INCLUDE_SYNC: u8 = 0x80;

    /// What the CDDA path asks for: audio-only sectors, untrimmed.
    pub const AUDIO: Self = Self::new(SectorClass::Audio, Self::RAW_PASSTHROUGH);

    #[must_use]
    pub const fn new(class: SectorClass, sub_flags: u8) -> Self {
        Self(((class as u8) << 1) | (sub_flags & 0xF0))
    }

    #[inline]
    #[must_use]
    pub fn selector(self) -> u8 {
        (self.0 >> 1) & 0x07
    }

    #[inline]
    #[must_use]
    pub fn raw_passthrough(self) -> bool {
        self.0 & Self::RAW_PASSTHROUGH != 0
    }

    #[inline]
    #[must_use]
    pub fn fields_enabled(self) -> bool {
        self.0 & Self::FIELDS_ENABLED != 0
    }

    #[inline]
    #[must_use]
    pub fn no_sub_header(self) -> bool {
        self.0 & Self::NO_SUB_HEADER != 0
    }

    #[inline]
    #[must_use]
    pub fn include_sync(self) -> bool {
        self.0 & Self::INCLUDE_SYNC != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorClass {
    Any = 0,
    Audio = 1,
    Mode1 = 2,
    Mode2Formless = 3,
    Mode2Form1 = 4,
    Mode2Form2 = 5,
    Raw = 6,
}

impl SectorClass {
    #[must_use]
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Self::Any),
            1 => Some(Self::Audio),
            2 => Some(Self::Mode1),
            3 => Some(Self::Mode2Formless),
            4 => Some(Self::Mode2Form1),
            5 => Some(Self::Mode2Form2),
            6 => Some(Self::Raw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    None,
    Audio,
    Data,
    DataNonXa,
    DataXa,
}

impl Requirement {
    fn is_met(self, location: SectorLocation, header: &DiscImageHeader) -> bool {
        match self {
            Self::None => true,
            Self::Audio => !location.is_data(),
            Self::Data => location.is_data(),
            Self::DataNonXa => location.is_data() && !header.is_xa(),
            Self::DataXa => location.is_data() && header.is_xa(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubHeaderSkip {
    Never,
    Xa,
    FromDiskType,
}

#[derive(Debug, Clone, Copy)]
struct ClassRule {
    requirement: Requirement,
    skip_after: u8,
    sub_header: SubHeaderSkip,
}

const fn rule(requirement: Requirement, skip_after: u8, sub_header: SubHeaderSkip) -> ClassRule {
    ClassRule { requirement, skip_after, sub_header }
}

impl SectorClass {
    fn rule(self) -> ClassRule {
        use Requirement as R;
        use SubHeaderSkip as S;

        match self {
            // Trailer length depends on the disk type, see `trim`
            Self::Any => rule(R::Data, 0, S::FromDiskType),
            Self::Audio => rule(R::Audio, 0, S::Never),
            Self::Mode1 => rule(R::DataNonXa, FORM_1_TRAILER_UNITS, S::Never),
            Self::Mode2Formless => rule(R::DataNonXa, 0, S::Never),
            Self::Mode2Form1 => rule(R::DataXa, XA_FORM_1_ECC_UNITS + EDC_UNITS, S::Xa),
            Self::Mode2Form2 => rule(R::DataXa, EDC_UNITS, S::Xa),
            Self::Raw => rule(R::None, 0, S::Never),
        }
    }
}

/// Where a sector lives in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLocation {
    pub raw_mode: u8,
    /// Image block containing the first byte of the raw sector.
    pub block: u32,
    /// Unit offset of the raw sector within `block`.
    pub start_offset_in_unit: u8,
}

impl SectorLocation {
    #[inline]
    #[must_use]
    pub fn is_data(self) -> bool {
        header::is_data_mode(self.raw_mode)
    }
}

/// Per-sector trimming recipe, in addressable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorFormatParams {
    pub skip_before: u8,
    pub skip_after: u8,
    pub sector_size: u16,
}

impl SectorFormatParams {
    #[must_use]
    pub fn new(skip_before: u8, skip_after: u8) -> Self {
        let sector_size =
            crate::UNITS_PER_SECTOR - u16::from(skip_before) - u16::from(skip_after);
        Self { skip_before, skip_after, sector_size }
    }

    #[must_use]
    pub fn sector_size_bytes(self) -> usize {
        usize::from(self.sector_size) * crate::BYTES_PER_UNIT
    }
}

/// Sub-channel Q details the CDDA path reports alongside audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubcodeQ {
    /// Control nibble (region raw mode) + ADR nibble (always 1, "current position").
    pub control_adr: u8,
    pub lead_in: bool,
}

impl SubcodeQ {
    #[must_use]
    pub fn from_raw_mode(raw_mode: u8) -> Self {
        Self { control_adr: (raw_mode << 4) | 0x01, lead_in: header::is_lead_in_mode(raw_mode) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAccess {
    Data { location: SectorLocation, format: SectorFormatParams },
    Audio { location: SectorLocation, subcode_q: SubcodeQ },
}

/// Find the region holding `sector` and map the sector to an image block.
///
/// # Errors
///
/// Returns [`SeekError::OutOfRange`] if the sector precedes the first region or if its block
/// number does not fit the image address space.
pub fn locate(header: &DiscImageHeader, sector: u32) -> SeekResult<SectorLocation> {
    let region = header
        .regions
        .iter()
        .take_while(|region| region.start_sector <= sector)
        .last()
        .ok_or(SeekError::OutOfRange { sector })?;

    let units = u64::from(sector - region.start_sector) * u64::from(crate::UNITS_PER_SECTOR);
    let block = (units >> 8) + u64::from(region.file_offset);
    let block = u32::try_from(block).map_err(|_| SeekError::OutOfRange { sector })?;

    Ok(SectorLocation { raw_mode: region.raw_mode, block, start_offset_in_unit: units as u8 })
}

/// Work out the trim for `flags` against a sector stored as `location`.
///
/// # Errors
///
/// Returns [`SeekError::BadMode`] if the selector is unmapped or the region / disk type cannot
/// provide the selected class, and [`SeekError::NoFieldsSelected`] if the flags request neither
/// raw sectors nor any sub-fields.
pub fn trim(
    header: &DiscImageHeader,
    sector: u32,
    location: SectorLocation,
    flags: RequestFlags,
) -> SeekResult<SectorFormatParams> {
    let class = SectorClass::from_selector(flags.selector())
        .ok_or(SeekError::BadMode { sector, flags: flags.0 })?;

    let mut skip_before = 0;
    let mut skip_after = 0;

    if class == SectorClass::Any && flags.raw_passthrough() {
        // "Any" with raw passthrough accepts audio regions too
    } else {
        let rule = class.rule();
        if !rule.requirement.is_met(location, header) {
            return Err(SeekError::BadMode { sector, flags: flags.0 });
        }

        skip_after = rule.skip_after;
        let sub_header = match rule.sub_header {
            SubHeaderSkip::Never => false,
            SubHeaderSkip::Xa => true,
            SubHeaderSkip::FromDiskType => {
                // Guess mode 2 form 1 on XA discs and mode 1 everywhere else
                if header.is_xa() {
                    skip_after = XA_FORM_1_TRAILER_UNITS;
                    true
                } else {
                    skip_after = FORM_1_TRAILER_UNITS;
                    false
                }
            }
        };
        if sub_header && !flags.no_sub_header() {
            skip_before = XA_SUB_HEADER_UNITS;
        }
    }

    if flags.raw_passthrough() {
        skip_before = 0;
        skip_after = 0;
    } else if !flags.fields_enabled() {
        return Err(SeekError::NoFieldsSelected { flags: flags.0 });
    } else if !flags.include_sync() {
        skip_before += SYNC_FIELD_UNITS;
    }

    Ok(SectorFormatParams::new(skip_before, skip_after))
}

/// Resolve a host request to an image location plus, for data, a trimming recipe.
///
/// # Errors
///
/// See [`locate`] and [`trim`].
pub fn resolve(
    header: &DiscImageHeader,
    sector: u32,
    flags: RequestFlags,
    want_data: bool,
) -> SeekResult<ResolvedAccess> {
    let location = locate(header, sector)?;
    let format = trim(header, sector, location, flags)?;

    if want_data {
        Ok(ResolvedAccess::Data { location, format })
    } else {
        let subcode_q = SubcodeQ::from_raw_mode(location.raw_mode);
        Ok(ResolvedAccess::Audio { location, subcode_q })
    }
}
