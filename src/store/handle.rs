use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque 128-bit key of a stored result, rendered as a hyphenated UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultHandle(Uuid);

impl ResultHandle {
    /// Fresh random (v4) handle.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ResultHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ResultHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Where new handles come from. Swappable so collisions can be exercised.
pub trait HandleSource: Send + Sync {
    fn next_handle(&self) -> ResultHandle;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomHandles;

impl HandleSource for RandomHandles {
    fn next_handle(&self) -> ResultHandle {
        ResultHandle::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let handle = ResultHandle::generate();
        let text = handle.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<ResultHandle>().unwrap(), handle);
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!("not-a-handle".parse::<ResultHandle>().is_err());
    }

    #[test]
    fn serialises_as_a_bare_string() {
        let handle = ResultHandle::generate();
        assert_eq!(
            serde_json::to_value(handle).unwrap(),
            serde_json::Value::String(handle.to_string())
        );
    }

    #[test]
    fn random_handles_differ() {
        assert_ne!(RandomHandles.next_handle(), RandomHandles.next_handle());
    }
}
