//! URL-fragment permalink codec.
//!
//! Wire format: `#map=<zoom>/<x>/<y>/<rotation>`. Numbers use the shortest
//! float representation that parses back to the same value, so an unrounded
//! hash round-trips exactly.

use foundation::{Coordinate, ProjectionUnits, ViewportState};

pub const PERMALINK_PREFIX: &str = "map=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermalinkError {
    /// The fragment does not start with `map=` (after an optional `#`).
    MissingPrefix,
    /// Expected exactly four `/`-separated fields.
    WrongFieldCount(usize),
    InvalidNumber { field: &'static str, raw: String },
    NonFinite { field: &'static str },
}

impl std::fmt::Display for PermalinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermalinkError::MissingPrefix => write!(f, "permalink hash lacks '{PERMALINK_PREFIX}' prefix"),
            PermalinkError::WrongFieldCount(n) => {
                write!(f, "permalink hash has {n} fields, expected 4")
            }
            PermalinkError::InvalidNumber { field, raw } => {
                write!(f, "permalink {field} is not a number: {raw:?}")
            }
            PermalinkError::NonFinite { field } => write!(f, "permalink {field} is not finite"),
        }
    }
}

impl std::error::Error for PermalinkError {}

/// Encoder/decoder bound to the active projection's units.
///
/// Rounding is only ever applied to non-angular centers; for degree-based
/// projections the `round` flag is ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PermalinkCodec {
    units: ProjectionUnits,
}

impl PermalinkCodec {
    pub fn new(units: ProjectionUnits) -> Self {
        Self { units }
    }

    /// Whether `encode(.., round)` will actually round.
    pub fn rounds(&self, round: bool) -> bool {
        round && !self.units.is_angular()
    }

    pub fn encode(&self, state: &ViewportState, round: bool) -> String {
        let (mut x, mut y) = (state.center.x, state.center.y);
        if self.rounds(round) {
            // `+ 0.0` folds a rounded `-0` into `0`.
            x = x.round() + 0.0;
            y = y.round() + 0.0;
        }
        format!(
            "#{PERMALINK_PREFIX}{}/{}/{}/{}",
            state.zoom, x, y, state.rotation
        )
    }

    /// Decode a URL fragment.
    ///
    /// `Ok(None)` means there is no state to restore (empty fragment, a bare
    /// `#`, or `#map=` with nothing after it). Any other content that does
    /// not parse is an error; callers leave the viewport untouched then.
    pub fn decode(&self, hash: &str) -> Result<Option<ViewportState>, PermalinkError> {
        decode_permalink(hash)
    }
}

/// Unit-independent decode; see [`PermalinkCodec::decode`].
pub fn decode_permalink(hash: &str) -> Result<Option<ViewportState>, PermalinkError> {
    let body = hash.trim();
    let body = body.strip_prefix('#').unwrap_or(body);
    if body.is_empty() {
        return Ok(None);
    }
    let Some(body) = body.strip_prefix(PERMALINK_PREFIX) else {
        return Err(PermalinkError::MissingPrefix);
    };
    if body.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = body.split('/').collect();
    if parts.len() != 4 {
        return Err(PermalinkError::WrongFieldCount(parts.len()));
    }

    let zoom = parse_field("zoom", parts[0])?;
    let x = parse_field("x", parts[1])?;
    let y = parse_field("y", parts[2])?;
    let rotation = parse_field("rotation", parts[3])?;

    Ok(Some(ViewportState::new(Coordinate::new(x, y), zoom, rotation)))
}

fn parse_field(field: &'static str, raw: &str) -> Result<f64, PermalinkError> {
    let v: f64 = raw.parse().map_err(|_| PermalinkError::InvalidNumber {
        field,
        raw: raw.to_string(),
    })?;
    if !v.is_finite() {
        return Err(PermalinkError::NonFinite { field });
    }
    Ok(v)
}
