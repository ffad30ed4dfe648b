//! Unwrap helper that reports the caller's location.

/// Unwrap an `Option`, panicking with `msg` if it is `None`.
///
/// ```rust
/// use gt7_test_helpers::must_some;
///
/// let value = must_some(Some(42), "value present");
/// assert_eq!(value, 42);
/// ```
#[track_caller]
pub fn must_some<T>(option: Option<T>, msg: &str) -> T {
    match option {
        Some(v) => v,
        None => panic!("must_some: {msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_some_passes_value_through() {
        assert_eq!(must_some(Some(3u8), "three"), 3);
    }

    #[test]
    #[should_panic(expected = "must_some: missing")]
    fn must_some_panics_on_none() {
        must_some(None::<u8>, "missing");
    }
}
