use super::format::SaveFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("Compression error")]
    Compression,

    #[error("Non-finite progress value in {field}")]
    NonFinite { field: String },

    #[error("Extra field collides with a save field: {key}")]
    ReservedField { key: String },

    /// `cause` is kept for logs only
    #[error("Failed to decompress old save file.")]
    LegacyDecode { cause: String },

    #[error("Failed to decompress new save file. It might be corrupted or an old format.")]
    CurrentDecode { cause: String },
}

impl SaveError {
    /// Decode path that produced this error, if any
    pub fn format(&self) -> Option<SaveFormat> {
        match self {
            SaveError::LegacyDecode { .. } => Some(SaveFormat::Legacy),
            SaveError::CurrentDecode { .. } => Some(SaveFormat::Current),
            _ => None,
        }
    }

    pub fn is_encode_failure(&self) -> bool {
        matches!(
            self,
            SaveError::Serialization(_)
                | SaveError::Compression
                | SaveError::NonFinite { .. }
                | SaveError::ReservedField { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_name_their_path() {
        let legacy = SaveError::LegacyDecode { cause: "bad base64".to_string() };
        let current = SaveError::CurrentDecode { cause: "bad deflate".to_string() };

        assert_eq!(legacy.format(), Some(SaveFormat::Legacy));
        assert_eq!(current.format(), Some(SaveFormat::Current));
        assert!(legacy.to_string().contains("old save"));
        assert!(current.to_string().contains("new save"));
        assert!(!current.to_string().contains("bad deflate"));
    }

    #[test]
    fn test_encode_failure_classification() {
        assert!(SaveError::Compression.is_encode_failure());
        assert!(SaveError::ReservedField { key: "demons".to_string() }.is_encode_failure());
        assert!(SaveError::NonFinite { field: "percent".to_string() }.is_encode_failure());
        assert!(!SaveError::LegacyDecode { cause: String::new() }.is_encode_failure());
    }
}
