use serde::{Deserialize, Serialize};

/// One extracted, addressable unit of translatable text.
///
/// `target` stays empty at extraction time; it is reserved for a later
/// translation pass that fills it in before a (future) merge step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub key: String,
    pub source: String,
    pub target: String,
}

impl Segment {
    /// `seq` is 1-based and only advances when a paragraph actually
    /// produces a segment, so ids stay dense.
    pub fn new(seq: usize, source: String) -> Self {
        Self {
            id: format!("seg-{seq:04}"),
            key: format!("paragraph-{seq}"),
            source,
            target: String::new(),
        }
    }
}
