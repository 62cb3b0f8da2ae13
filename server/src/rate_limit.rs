use std::{
    env,
    net::IpAddr,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use rocket::{
    State,
    http::Status,
    request::{self, FromRequest, Request},
};
use tracing::{debug, info, instrument, warn};

const REFILL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct TokenBucket {
    tokens: u32,
    capacity: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_interval,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    // Refills to full capacity once per interval rather than trickling.
    fn refill(&mut self) {
        if self.last_refill.elapsed() >= self.refill_interval {
            self.tokens = self.capacity;
            self.last_refill = Instant::now();
        }
    }
}

/// Per-IP token buckets for board creation.
pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    capacity: u32,
}

pub fn create_rate_limiter() -> RateLimiter {
    let capacity: u32 = env::var("RATE_LIMIT_BOARDS_PER_MINUTE")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(10);

    info!(
        "Limiting board creation to {} per minute per client",
        capacity
    );

    RateLimiter {
        buckets: DashMap::new(),
        capacity,
    }
}

pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // Proxy headers first, then the socket address.
        let forwarded = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|list| list.split(',').next())
            .and_then(|ip| ip.trim().parse().ok());

        let ip = forwarded
            .or_else(|| {
                req.headers()
                    .get_one("X-Real-IP")
                    .and_then(|ip| ip.parse().ok())
            })
            .or_else(|| req.client_ip())
            .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]));

        request::Outcome::Success(ClientIp(ip))
    }
}

#[instrument(level = "trace", skip(rate_limiter), fields(client_ip = %client_ip.0))]
pub fn check_rate_limit(
    rate_limiter: &State<RateLimiter>,
    client_ip: &ClientIp,
) -> Result<(), Status> {
    let mut bucket = rate_limiter
        .buckets
        .entry(client_ip.0)
        .or_insert_with(|| TokenBucket::new(rate_limiter.capacity, REFILL_INTERVAL));

    if bucket.try_consume() {
        debug!("Rate limit check passed for {}", client_ip.0);
        Ok(())
    } else {
        warn!("Rate limit exceeded for {}", client_ip.0);
        Err(Status::TooManyRequests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_run_dry_at_capacity() {
        let mut bucket = TokenBucket::new(2, Duration::from_secs(60));

        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());
    }

    #[test]
    fn buckets_refill_after_the_interval() {
        let mut bucket = TokenBucket::new(1, Duration::ZERO);

        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
    }
}
