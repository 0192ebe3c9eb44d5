//! Retry as a scoped function, replacing
//! `original_source/Retrier.py`'s contextmanager-based `retry_context`: a
//! free function that retries `f` up to `attempts` times with the given
//! delay between attempts, returning the last error if none succeed.

use std::time::Duration;

pub fn retry<T, E, F>(attempts: u32, delay: Duration, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    let mut last_err = None;
    for attempt in 0..attempts.max(1) {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if attempt + 1 < attempts {
                    std::thread::sleep(delay);
                }
            }
        }
    }
    Err(last_err.expect("attempts >= 1 guarantees at least one iteration ran"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn returns_first_success() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry(3, Duration::from_millis(0), || {
            calls.set(calls.get() + 1);
            Ok(42)
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_until_attempts_exhausted() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry(3, Duration::from_millis(0), || {
            calls.set(calls.get() + 1);
            Err("still failing")
        });
        assert_eq!(result, Err("still failing"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn succeeds_on_a_later_attempt() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry(5, Duration::from_millis(0), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("not yet")
            } else {
                Ok(7)
            }
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }
}
