//! Client version handling.
//!
//! Several format decisions depend on which client era the data directory
//! belongs to: whether verdata patching is mandatory, which DEF overlays
//! exist, whether UOP archives may be used, and the width of tile-data flag
//! fields. Versions are packed one byte per component so they order
//! correctly as plain integers.

use std::fmt;
use std::str::FromStr;

/// A packed client version (`major.minor.revision.patch`, one byte each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientVersion(pub u32);

impl ClientVersion {
    /// 3.0.0: DEF overlay files (body/corpse/bodyconv/equipconv) appear.
    pub const V_300: ClientVersion = ClientVersion::new(3, 0, 0, 0);
    /// 5.0.0a: last era where verdata patching is mandatory.
    pub const V_500A: ClientVersion = ClientVersion::new(5, 0, 0, 1);
    /// 6.1.4.4: last pre-UOP animation client.
    pub const V_60144: ClientVersion = ClientVersion::new(6, 1, 4, 4);
    /// 7.0.0.0: first client that may ship UOP archives.
    pub const V_7000: ClientVersion = ClientVersion::new(7, 0, 0, 0);
    /// 7.0.9.0: tile-data flags widen from 32 to 64 bits.
    pub const V_7090: ClientVersion = ClientVersion::new(7, 0, 9, 0);

    pub const fn new(major: u8, minor: u8, revision: u8, patch: u8) -> Self {
        Self(
            ((major as u32) << 24)
                | ((minor as u32) << 16)
                | ((revision as u32) << 8)
                | patch as u32,
        )
    }

    pub const fn major(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn minor(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn revision(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn patch(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major(),
            self.minor(),
            self.revision(),
            self.patch()
        )
    }
}

impl FromStr for ClientVersion {
    type Err = String;

    /// Parse a dotted version string.
    ///
    /// Accepts 2 to 4 numeric components; a trailing letter on the last
    /// component is folded into the patch byte (`"5.0.0a"` sorts after
    /// `"5.0.0"`), matching how old client installers numbered releases.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = [0u8; 4];
        let mut count = 0;

        for piece in s.trim().split('.') {
            if count >= 4 {
                return Err(format!("too many version components: {s:?}"));
            }

            let (digits, letter) = match piece.find(|c: char| c.is_ascii_alphabetic()) {
                Some(at) => piece.split_at(at),
                None => (piece, ""),
            };

            parts[count] = digits
                .parse::<u8>()
                .map_err(|_| format!("bad version component {piece:?} in {s:?}"))?;
            count += 1;

            if !letter.is_empty() {
                if letter.len() > 1 || count >= 4 {
                    return Err(format!("bad version component {piece:?} in {s:?}"));
                }
                let c = letter.as_bytes()[0].to_ascii_lowercase();
                parts[count] = c - b'a' + 1;
                count += 1;
            }
        }

        if count < 2 {
            return Err(format!("bad version string: {s:?}"));
        }

        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}
