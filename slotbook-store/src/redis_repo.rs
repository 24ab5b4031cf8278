use redis::RedisResult;

/// Fixed-window request counters shared by every API instance.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Returns `Ok(false)` once `key` has been hit more than `limit` times in the window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = rate_limit_pipeline(key, window_seconds).query_async(&mut conn).await?;

        Ok(count <= limit)
    }
}

/// INCR plus `EXPIRE .. NX`: the TTL is set by the first hit of a window only,
/// so later hits never push the window's end back.
fn rate_limit_pipeline(key: &str, window_seconds: i64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .incr(key, 1)
        .cmd("EXPIRE")
        .arg(key)
        .arg(window_seconds)
        .arg("NX")
        .ignore();
    pipe
}

pub fn rate_limit_key(ip: &str) -> String {
    format!("ratelimit:{}", ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed_commands(pipe: &redis::Pipeline) -> String {
        String::from_utf8_lossy(&pipe.get_packed_pipeline()).into_owned()
    }

    #[test]
    fn test_window_ttl_is_only_set_once() {
        let packed = packed_commands(&rate_limit_pipeline("ratelimit:10.0.0.1", 60));

        let expire_at = packed.find("EXPIRE").unwrap();
        let expire_args = &packed[expire_at..];
        assert!(expire_args.contains("ratelimit:10.0.0.1"));
        assert!(expire_args.contains("\r\n60\r\n"));
        assert!(expire_args.contains("\r\nNX\r\n"));
        assert!(packed.find("INCR").unwrap() < expire_at);
    }

    #[test]
    fn test_key_is_per_client() {
        assert_eq!(rate_limit_key("10.0.0.1"), "ratelimit:10.0.0.1");
        assert_ne!(rate_limit_key("10.0.0.1"), rate_limit_key("10.0.0.2"));
    }
}
