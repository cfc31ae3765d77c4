pub struct Debounce<const ERRSTEP: u16, const LIMIT: u16, const STICKY: bool> {
    count: u16,
}

impl<const ERRSTEP: u16, const LIMIT: u16, const STICKY: bool> Debounce<ERRSTEP, LIMIT, STICKY> {
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    pub fn is_ok(&self) -> bool {
        self.count < LIMIT
    }

    pub fn error(&mut self) {
        self.count = self.count.saturating_add(ERRSTEP);
    }

    pub fn ok(&mut self) {
        if !STICKY || self.is_ok() {
            self.count = self.count.saturating_sub(1);
        }
    }

    /// Feed one observation. Returns `true` on the transition into the failed state.
    pub fn check(&mut self, failed: bool) -> bool {
        let was_ok = self.is_ok();
        if failed {
            self.error();
        } else {
            self.ok();
        }
        was_ok && !self.is_ok()
    }

    pub fn count(&self) -> u16 {
        self.count
    }
}

impl<const ERRSTEP: u16, const LIMIT: u16, const STICKY: bool> Default
    for Debounce<ERRSTEP, LIMIT, STICKY>
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sticky() {
        let mut d = Debounce::<1, 3, true>::new();
        assert!(!d.check(true));
        assert!(!d.check(true));
        assert!(d.check(true));
        assert!(!d.is_ok());
        assert!(!d.check(false));
        assert!(!d.is_ok());
        assert_eq!(d.count(), 3);
    }

    #[test]
    fn test_recovering() {
        let mut d = Debounce::<2, 4, false>::new();
        d.error();
        d.ok();
        assert_eq!(d.count(), 1);
        assert!(!d.check(true));
        assert!(d.check(true));
        d.ok();
        assert!(!d.is_ok());
        d.ok();
        assert!(d.is_ok());
    }
}

// vim: ts=4 sw=4 expandtab
