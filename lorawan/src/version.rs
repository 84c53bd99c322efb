use core::fmt;

/// Packed `major.minor.patch.revision` version identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch version
    pub patch: u8,
    /// Revision
    pub revision: u8,
}

impl Version {
    /// Create a version identifier
    pub const fn new(major: u8, minor: u8, patch: u8, revision: u8) -> Self {
        Self {
            major,
            minor,
            patch,
            revision,
        }
    }

    /// Pack into a `u32`, major in the most significant byte
    pub const fn packed(&self) -> u32 {
        (self.major as u32) << 24 | (self.minor as u32) << 16 | (self.patch as u32) << 8 | self.revision as u32
    }

    /// Unpack from a `u32`
    pub const fn from_packed(packed: u32) -> Self {
        Self::new(
            (packed >> 24) as u8,
            (packed >> 16) as u8,
            (packed >> 8) as u8,
            packed as u8,
        )
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.patch, self.revision)
    }
}

/// Version of the protocol stack
pub const STACK_VERSION: Version = Version::new(1, 0, 4, 0);

/// Version of the region module
pub const REGION_VERSION: Version = Version::new(2, 1, 0, 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack() {
        assert_eq!(STACK_VERSION.packed(), 0x0100_0400);
        assert_eq!(REGION_VERSION.packed(), 0x0201_0004);
        assert_eq!(Version::from_packed(0x0201_0004), REGION_VERSION);
    }
}
