use crate::entity::Package;

/// Whether a candidate must be re-fetched.
///
/// Only a stored row with a known mtime that is not older than the source's
/// mtime is considered fresh.
pub fn needs_refresh(force: bool, stored: Option<&Package>, disk_mtime: Option<i64>) -> bool {
    if force {
        return true;
    }
    let Some(stored_mtime) = stored.and_then(Package::known_mtime) else {
        return true;
    };
    match disk_mtime {
        Some(disk) => stored_mtime < disk,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staleness_rules() {
        let stored = Package::new("Demo::Foo").with_mtime(100);

        assert!(!needs_refresh(false, Some(&stored), Some(100)));
        assert!(!needs_refresh(false, Some(&stored), Some(50)));
        assert!(needs_refresh(false, Some(&stored), Some(101)));
        assert!(needs_refresh(false, Some(&stored), None));
        assert!(needs_refresh(true, Some(&stored), Some(100)));
        assert!(needs_refresh(false, None, Some(100)));
    }

    #[test]
    fn test_unknown_stored_mtime_refreshes() {
        let never = Package::new("Demo::Foo");
        let zero = Package::new("Demo::Foo").with_mtime(0);
        assert!(needs_refresh(false, Some(&never), Some(100)));
        assert!(needs_refresh(false, Some(&zero), Some(100)));
    }
}
