//! Chunk object names: `<prefix>_<objectKey>_<index>_<isLast>`

/// The coordinates of one chunk object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkName {
    pub object_key: String,
    /// 1-based
    pub index: u64,
    pub is_last: bool,
}

impl ChunkName {
    pub fn new(object_key: &str, index: u64, is_last: bool) -> Self {
        Self {
            object_key: object_key.to_string(),
            index,
            is_last,
        }
    }

    pub fn object_name(&self, prefix: &str) -> String {
        format!(
            "{prefix}_{}_{}_{}",
            self.object_key,
            self.index,
            u8::from(self.is_last)
        )
    }

    /// Inverse of [`ChunkName::object_name`]; `None` for foreign objects.
    pub fn parse(name: &str, prefix: &str) -> Option<Self> {
        let rest = name.strip_prefix(prefix)?.strip_prefix('_')?;
        let mut parts = rest.split('_');
        let object_key = parts.next().filter(|k| !k.is_empty())?;
        let index: u64 = parts.next()?.parse().ok().filter(|i| *i >= 1)?;
        let is_last = match parts.next()? {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(object_key, index, is_last))
    }
}

/// Prefix shared by every object this tool writes.
pub fn family_prefix(prefix: &str) -> String {
    format!("{prefix}_")
}

/// Prefix shared by every chunk of one transfer. The trailing separator keeps
/// key `ab` from matching a longer key `abc`.
pub fn transfer_prefix(prefix: &str, object_key: &str) -> String {
    format!("{prefix}_{object_key}_")
}
