use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds, truncated to the 32 bits RTMP
/// timestamps carry.
pub fn current_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timestamp_increasing() {
        let ts1 = current_timestamp();
        thread::sleep(Duration::from_millis(10));
        let ts2 = current_timestamp();
        assert!(ts2 > ts1);
    }
}
