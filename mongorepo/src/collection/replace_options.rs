/// Options of a replace call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    upsert: bool,
}

impl ReplaceOptions {
    pub fn new(upsert: bool) -> Self {
        Self { upsert }
    }

    /// Insert the replacement when no document matches.
    pub fn is_upsert(&self) -> bool {
        self.upsert
    }
}

pub fn upsert() -> ReplaceOptions {
    ReplaceOptions::new(true)
}
