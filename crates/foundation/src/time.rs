/// Wall-clock interval in milliseconds.
///
/// Used for the pointer-rest interval and the layer configuration deadline,
/// both of which are handed to a platform timer rather than measured here.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Millis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Millis;

    #[test]
    fn displays_with_unit() {
        assert_eq!(Millis(250).to_string(), "250ms");
    }
}
