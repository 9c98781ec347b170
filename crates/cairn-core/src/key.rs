// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Keys identify assets inside a content manager.

use crate::error::ContentError;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// An opaque, application-supplied identifier for an asset.
///
/// Keys are compared by value: two equal keys always address the same cache slot.
/// Textual keys reject empty or whitespace-only values through [`is_valid_key`].
///
/// [`is_valid_key`]: ContentKey::is_valid_key
pub trait ContentKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Returns `false` if this key must be rejected before any lookup.
    fn is_valid_key(&self) -> bool {
        true
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

impl ContentKey for String {
    fn is_valid_key(&self) -> bool {
        !is_blank(self)
    }
}

impl ContentKey for &'static str {
    fn is_valid_key(&self) -> bool {
        !is_blank(self)
    }
}

impl ContentKey for Box<str> {
    fn is_valid_key(&self) -> bool {
        !is_blank(self)
    }
}

impl ContentKey for Arc<str> {
    fn is_valid_key(&self) -> bool {
        !is_blank(self)
    }
}

impl ContentKey for PathBuf {
    fn is_valid_key(&self) -> bool {
        !is_blank(&self.as_os_str().to_string_lossy())
    }
}

/// `None` plays the role of a null key and is never valid.
impl<K: ContentKey> ContentKey for Option<K> {
    fn is_valid_key(&self) -> bool {
        self.as_ref().is_some_and(ContentKey::is_valid_key)
    }
}

impl ContentKey for u32 {}
impl ContentKey for u64 {}
impl ContentKey for usize {}
impl ContentKey for Uuid {}

/// Rejects keys that may not reach the cache or the loader registry.
pub fn validate_key<K: ContentKey>(key: &K) -> Result<(), ContentError> {
    if key.is_valid_key() {
        Ok(())
    } else {
        Err(ContentError::InvalidKey {
            key: format!("{key:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_strings_are_rejected() {
        assert!(validate_key(&String::new()).is_err());
        assert!(validate_key(&"   ".to_string()).is_err());
        assert!(validate_key(&"\t\n").is_err());
        assert!(validate_key(&Arc::<str>::from(" ")).is_err());
        assert!(validate_key(&PathBuf::from("  ")).is_err());
    }

    #[test]
    fn test_textual_keys_accept_content() {
        assert!(validate_key(&"meshes/cube.obj".to_string()).is_ok());
        assert!(validate_key(&" padded ").is_ok());
        assert!(validate_key(&PathBuf::from("textures/grass.png")).is_ok());
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let none: Option<String> = None;
        assert!(matches!(
            validate_key(&none),
            Err(ContentError::InvalidKey { .. })
        ));
        assert!(validate_key(&Some(" ".to_string())).is_err());
        assert!(validate_key(&Some("a".to_string())).is_ok());
    }

    #[test]
    fn test_numeric_and_uuid_keys_are_always_valid() {
        assert!(validate_key(&0u64).is_ok());
        assert!(validate_key(&Uuid::nil()).is_ok());
        assert!(validate_key(&Uuid::new_v4()).is_ok());
    }
}
