//! Common value types used throughout MedSynEval RS

use serde::{Deserialize, Serialize};

/// Ground-truth classification of an image, fixed at load time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Real,
    Synthetic,
}

impl ImageKind {
    pub const ALL: [ImageKind; 2] = [ImageKind::Real, ImageKind::Synthetic];

    pub fn from_is_real(is_real: bool) -> Self {
        if is_real {
            Self::Real
        } else {
            Self::Synthetic
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real)
    }

    /// Name of the source subfolder holding images of this kind
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Synthetic => "synth",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Real => "Real",
            Self::Synthetic => "Synthetic",
        }
    }
}

/// Confidence rating on a 1-5 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "i64", into = "i64")]
pub struct Confidence(u8);

impl Confidence {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// All ratings in ascending order
    pub fn all() -> impl Iterator<Item = Confidence> {
        (Self::MIN..=Self::MAX).map(Confidence)
    }
}

impl TryFrom<i64> for Confidence {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Confidence::new(value).ok_or_else(|| {
            format!(
                "confidence must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )
        })
    }
}

impl From<Confidence> for i64 {
    fn from(value: Confidence) -> Self {
        value.0 as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_kind() {
        assert_eq!(ImageKind::from_is_real(true), ImageKind::Real);
        assert_eq!(ImageKind::from_is_real(false), ImageKind::Synthetic);
        assert_eq!(ImageKind::Synthetic.folder_name(), "synth");
        assert!(!ImageKind::Synthetic.is_real());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(Confidence::new(0).is_none());
        assert!(Confidence::new(6).is_none());
        assert_eq!(Confidence::new(5).map(|c| c.value()), Some(5));
        assert_eq!(Confidence::all().count(), 5);
    }

    #[test]
    fn test_confidence_serde() {
        let parsed: Confidence = serde_json::from_str("3").unwrap();
        assert_eq!(parsed.value(), 3);
        assert!(serde_json::from_str::<Confidence>("9").is_err());
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "3");
    }
}
