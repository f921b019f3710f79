use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use laser_grid_core::PlacementRecord;

const SHARE_DOMAIN: &str = "laser";
const SHARE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded placement payload.
pub(crate) const SHARE_HEADER: &str = "laser:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Player placements for a level packed into a single copyable line.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ShareCode {
    /// Number of columns of the level the placements were made on.
    pub(crate) columns: u32,
    /// Number of rows of the level the placements were made on.
    pub(crate) rows: u32,
    /// Placements in the order they were made.
    pub(crate) placements: Vec<PlacementRecord>,
}

impl ShareCode {
    /// Encodes the placements as `laser:v1:<columns>x<rows>:<base64 json>`.
    pub(crate) fn encode(&self) -> Result<String, ShareCodeError> {
        let json = serde_json::to_vec(&self.placements).map_err(ShareCodeError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{SHARE_HEADER}:{}x{}:{encoded}", self.columns, self.rows))
    }

    /// Decodes a share code produced by [`ShareCode::encode`].
    pub(crate) fn decode(value: &str) -> Result<Self, ShareCodeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ShareCodeError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(ShareCodeError::MissingPrefix)?;
        let version = parts.next().ok_or(ShareCodeError::MissingVersion)?;
        let dimensions = parts.next().ok_or(ShareCodeError::MissingDimensions)?;
        let payload = parts.next().ok_or(ShareCodeError::MissingPayload)?;

        if domain != SHARE_DOMAIN {
            return Err(ShareCodeError::InvalidPrefix(domain.to_owned()));
        }
        if version != SHARE_VERSION {
            return Err(ShareCodeError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(ShareCodeError::InvalidEncoding)?;
        let placements: Vec<PlacementRecord> =
            serde_json::from_slice(&bytes).map_err(ShareCodeError::InvalidPayload)?;

        Ok(Self {
            columns,
            rows,
            placements,
        })
    }

    /// Fails unless the code was made on a level of the given size.
    pub(crate) fn check_dimensions(&self, columns: u32, rows: u32) -> Result<(), ShareCodeError> {
        if (self.columns, self.rows) == (columns, rows) {
            Ok(())
        } else {
            Err(ShareCodeError::DimensionMismatch {
                code: (self.columns, self.rows),
                level: (columns, rows),
            })
        }
    }
}

/// Errors that can occur while handling share codes.
#[derive(Debug)]
pub(crate) enum ShareCodeError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing.
    MissingPrefix,
    /// The version segment was missing.
    MissingVersion,
    /// The grid dimensions were missing.
    MissingDimensions,
    /// The payload segment was missing.
    MissingPayload,
    /// The code used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The code used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    InvalidDimensions(String),
    /// The code was made for a level of a different size.
    DimensionMismatch {
        /// Dimensions recorded in the code.
        code: (u32, u32),
        /// Dimensions of the level it was applied to.
        level: (u32, u32),
    },
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The placement payload could not be read or written.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for ShareCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "share code was empty"),
            Self::MissingPrefix => write!(f, "share code is missing the prefix"),
            Self::MissingVersion => write!(f, "share code is missing the version"),
            Self::MissingDimensions => write!(f, "share code is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "share code is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "share code prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "share code version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::DimensionMismatch { code, level } => write!(
                f,
                "share code was made on a {}x{} grid but the level is {}x{}",
                code.0, code.1, level.0, level.1
            ),
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode share code payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse share code placements: {error}")
            }
        }
    }
}

impl Error for ShareCodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), ShareCodeError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| ShareCodeError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| ShareCodeError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| ShareCodeError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(ShareCodeError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placements_survive_a_share_code() {
        let code = ShareCode {
            columns: 6,
            rows: 6,
            placements: vec![
                PlacementRecord {
                    orientation: Some("\\".to_owned()),
                    ..PlacementRecord::add("mirror", 3, 1)
                },
                PlacementRecord::remove("obstacle", 5, 5),
            ],
        };

        let encoded = code.encode().expect("placements serialize");
        assert!(encoded.starts_with(&format!("{SHARE_HEADER}:6x6:")));

        let decoded = ShareCode::decode(&encoded).expect("share code decodes");
        assert_eq!(decoded, code);
    }

    #[test]
    fn foreign_prefixes_and_sizes_are_rejected() {
        assert!(matches!(
            ShareCode::decode("prism:v1:6x6:W10"),
            Err(ShareCodeError::InvalidPrefix(prefix)) if prefix == "prism"
        ));
        assert!(matches!(
            ShareCode::decode("laser:v1:0x6:W10"),
            Err(ShareCodeError::InvalidDimensions(_))
        ));

        let code = ShareCode {
            columns: 4,
            rows: 4,
            placements: Vec::new(),
        };
        assert!(code.check_dimensions(4, 4).is_ok());
        assert!(matches!(
            code.check_dimensions(6, 6),
            Err(ShareCodeError::DimensionMismatch { .. })
        ));
    }
}
