//! Platform identity normalization.
//!
//! Users link a Steam account whose identifier may be stored in any of the
//! historical encodings:
//!
//! | Form | Example |
//! |------|---------|
//! | Steam2 | `STEAM_1:1:22202` |
//! | Steam3 | `[U:1:44405]` or `U:1:44405` |
//! | Profile URL | `https://steamcommunity.com/profiles/76561197960310133` |
//! | SteamID64 | `76561197960310133` |
//!
//! All converge on [`SteamId`], from which each backend picks the rendering
//! its schema stores.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

/// Account type bits for an individual user account.
const TYPE_INDIVIDUAL: u64 = 1;
/// Default instance for desktop user accounts.
const INSTANCE_DESKTOP: u64 = 1;
/// The public universe.
const UNIVERSE_PUBLIC: u8 = 1;

const PROFILE_MARKER: &str = "/profiles/";

/// Errors from strict identity parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,
    #[error("unrecognized identity format: {0}")]
    Unrecognized(String),
    #[error("account id out of range in {0}")]
    OutOfRange(String),
    #[error("not an individual account: {0}")]
    NotIndividual(String),
}

/// A parsed individual Steam account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SteamId {
    account_id: u32,
    universe: u8,
}

impl SteamId {
    /// Build from a 32-bit account id in the public universe.
    pub fn from_account_id(account_id: u32) -> Self {
        Self {
            account_id,
            universe: UNIVERSE_PUBLIC,
        }
    }

    /// Parse any supported encoding.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(IdentityError::Empty);
        }

        if let Some(rest) = input.strip_prefix("STEAM_") {
            return Self::parse_steam2(input, rest);
        }

        let bare = input
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(input);
        if let Some(rest) = bare.strip_prefix("U:") {
            return Self::parse_steam3(input, rest);
        }

        let numeric = match input.find(PROFILE_MARKER) {
            Some(pos) => input[pos + PROFILE_MARKER.len()..].trim_end_matches('/'),
            None => input,
        };
        if !numeric.is_empty() && numeric.bytes().all(|b| b.is_ascii_digit()) {
            let value = numeric
                .parse::<u64>()
                .map_err(|_| IdentityError::OutOfRange(input.to_string()))?;
            return Self::from_steam64(input, value);
        }

        Err(IdentityError::Unrecognized(input.to_string()))
    }

    /// `STEAM_X:Y:Z` where account id = Z * 2 + Y.
    fn parse_steam2(input: &str, rest: &str) -> Result<Self, IdentityError> {
        let unrecognized = || IdentityError::Unrecognized(input.to_string());
        let mut parts = rest.split(':');
        let (Some(x), Some(y), Some(z), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(unrecognized());
        };

        let universe: u8 = x.parse().map_err(|_| unrecognized())?;
        let low: u64 = match y {
            "0" => 0,
            "1" => 1,
            _ => return Err(unrecognized()),
        };
        let high: u64 = z.parse().map_err(|_| unrecognized())?;

        let account_id = high
            .checked_mul(2)
            .and_then(|v| v.checked_add(low))
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| IdentityError::OutOfRange(input.to_string()))?;

        Ok(Self {
            account_id,
            // Old Source games render the public universe as 0.
            universe: if universe == 0 { UNIVERSE_PUBLIC } else { universe },
        })
    }

    /// `U:universe:account[:instance]`.
    fn parse_steam3(input: &str, rest: &str) -> Result<Self, IdentityError> {
        let unrecognized = || IdentityError::Unrecognized(input.to_string());
        let mut parts = rest.split(':');
        let universe: u8 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(unrecognized)?;
        let account_id: u32 = parts
            .next()
            .ok_or_else(unrecognized)?
            .parse()
            .map_err(|_| IdentityError::OutOfRange(input.to_string()))?;
        if let Some(instance) = parts.next()
            && instance.parse::<u32>().is_err()
        {
            return Err(unrecognized());
        }
        if parts.next().is_some() || universe == 0 {
            return Err(unrecognized());
        }

        Ok(Self {
            account_id,
            universe,
        })
    }

    fn from_steam64(input: &str, value: u64) -> Result<Self, IdentityError> {
        let universe = (value >> 56) as u8;
        let kind = (value >> 52) & 0xF;
        if universe == 0 || universe > 4 {
            return Err(IdentityError::OutOfRange(input.to_string()));
        }
        if kind != TYPE_INDIVIDUAL {
            return Err(IdentityError::NotIndividual(input.to_string()));
        }
        Ok(Self {
            account_id: (value & 0xFFFF_FFFF) as u32,
            universe,
        })
    }

    /// The 32-bit account id.
    pub fn account_id(&self) -> u32 {
        self.account_id
    }

    /// Render as `STEAM_X:Y:Z`.
    pub fn steam2(&self) -> String {
        format!(
            "STEAM_{}:{}:{}",
            self.universe,
            self.account_id & 1,
            self.account_id >> 1
        )
    }

    /// Render as `[U:X:W]`.
    pub fn steam3(&self) -> String {
        format!("[U:{}:{}]", self.universe, self.account_id)
    }

    /// The 64-bit form.
    pub fn steam64(&self) -> u64 {
        (u64::from(self.universe) << 56)
            | (TYPE_INDIVIDUAL << 52)
            | (INSTANCE_DESKTOP << 32)
            | u64::from(self.account_id)
    }
}

impl FromStr for SteamId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.steam64())
    }
}

/// Every rendering a backend may key on, computed once per delivery.
///
/// When the raw value cannot be parsed, all renderings fall back to the raw
/// string and `reliable` is false. Such values are written as text and must
/// not be parsed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    /// The value as linked on the user's profile.
    pub raw: String,
    /// Numeric account id (`44405`).
    pub account_id: String,
    /// Steam2 rendering (`STEAM_1:1:22202`).
    pub steam2: String,
    /// 64-bit rendering (`76561197960310133`).
    pub steam64: String,
    /// False when normalization failed and the fields hold `raw`.
    pub reliable: bool,
}

impl NormalizedIdentity {
    /// Normalize `raw`, logging and falling back to it unchanged on failure.
    pub fn resolve(raw: &str) -> Self {
        match SteamId::parse(raw) {
            Ok(id) => Self::from(id).with_raw(raw),
            Err(e) => {
                warn!(identity = %raw, error = %e, "Failed to normalize Steam ID, using raw value");
                Self {
                    raw: raw.to_string(),
                    account_id: raw.to_string(),
                    steam2: raw.to_string(),
                    steam64: raw.to_string(),
                    reliable: false,
                }
            }
        }
    }

    fn with_raw(mut self, raw: &str) -> Self {
        self.raw = raw.to_string();
        self
    }
}

impl From<SteamId> for NormalizedIdentity {
    fn from(id: SteamId) -> Self {
        Self {
            raw: id.steam64().to_string(),
            account_id: id.account_id().to_string(),
            steam2: id.steam2(),
            steam64: id.steam64().to_string(),
            reliable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEAM64: u64 = 76561197960310133;

    #[test]
    fn test_all_forms_converge() {
        let forms = [
            "STEAM_1:1:22202",
            "STEAM_0:1:22202",
            "[U:1:44405]",
            "U:1:44405",
            "[U:1:44405:1]",
            "76561197960310133",
            "https://steamcommunity.com/profiles/76561197960310133/",
        ];
        for form in forms {
            let id = SteamId::parse(form).unwrap_or_else(|e| panic!("{form}: {e}"));
            assert_eq!(id.account_id(), 44405, "{form}");
            assert_eq!(id.steam64(), STEAM64, "{form}");
        }
    }

    #[test]
    fn test_renderings() {
        let id = SteamId::from_account_id(44405);
        assert_eq!(id.steam2(), "STEAM_1:1:22202");
        assert_eq!(id.steam3(), "[U:1:44405]");
        assert_eq!(id.to_string(), STEAM64.to_string());
        assert_eq!("STEAM_1:0:0".parse::<SteamId>().unwrap().steam2(), "STEAM_1:0:0");
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(SteamId::parse("  "), Err(IdentityError::Empty));
        assert!(matches!(
            SteamId::parse("STEAM_1:2:5"),
            Err(IdentityError::Unrecognized(_))
        ));
        assert!(matches!(
            SteamId::parse("STEAM_1:1"),
            Err(IdentityError::Unrecognized(_))
        ));
        assert!(matches!(
            SteamId::parse("STEAM_1:1:4294967295"),
            Err(IdentityError::OutOfRange(_))
        ));
        assert!(matches!(
            SteamId::parse("STEAM_1:1:18446744073709551615"),
            Err(IdentityError::OutOfRange(_))
        ));
        assert!(matches!(
            SteamId::parse("STEAM_1:0:9223372036854775808"),
            Err(IdentityError::OutOfRange(_))
        ));
        assert!(matches!(
            SteamId::parse("12345"),
            Err(IdentityError::OutOfRange(_))
        ));
        assert!(matches!(
            SteamId::parse("not-a-steam-id"),
            Err(IdentityError::Unrecognized(_))
        ));
        // Clan (type 7) id.
        assert!(matches!(
            SteamId::parse("103582791429521412"),
            Err(IdentityError::NotIndividual(_))
        ));
    }

    #[test]
    fn test_resolve_success_keeps_raw() {
        let normalized = NormalizedIdentity::resolve("STEAM_0:1:22202");
        assert!(normalized.reliable);
        assert_eq!(normalized.raw, "STEAM_0:1:22202");
        assert_eq!(normalized.account_id, "44405");
        assert_eq!(normalized.steam2, "STEAM_1:1:22202");
        assert_eq!(normalized.steam64, STEAM64.to_string());
    }

    #[test]
    fn test_resolve_overflowing_steam2_falls_back() {
        for raw in ["STEAM_1:1:18446744073709551615", "STEAM_1:0:9223372036854775808"] {
            let normalized = NormalizedIdentity::resolve(raw);
            assert!(!normalized.reliable, "{raw}");
            assert_eq!(normalized.account_id, raw);
        }
    }

    #[test]
    fn test_resolve_falls_back_to_raw() {
        let normalized = NormalizedIdentity::resolve("garbage");
        assert!(!normalized.reliable);
        assert_eq!(normalized.account_id, "garbage");
        assert_eq!(normalized.steam2, "garbage");
        assert_eq!(normalized.steam64, "garbage");
    }
}
