//! Sliding-window limits for logins, registrations and user-generated content.
//!
//! Timestamps live in a process-wide [`DashMap`], so limits are per instance.
//! Budgets come from the `rate_limit` config section and are read on every check.

use crate::app_config::{self, RateLimitConfig};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

pub static RATE_LIMITER: Lazy<RateLimiter> = Lazy::new(RateLimiter::new);

/// Longest window any action uses. Sweeping forgets anything older.
pub const MAX_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Keyed by address and lowercased username
    Login,
    /// Keyed by address
    Register,
    /// Social posts and politician statements, keyed by user
    Post,
    Message,
    FriendRequest,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::Register => "register",
            Action::Post => "post",
            Action::Message => "message",
            Action::FriendRequest => "friend_request",
        }
    }

    /// Allowed hits and the window they are counted over.
    fn budget(self, config: &RateLimitConfig) -> (usize, Duration) {
        let (max, secs) = match self {
            Action::Login => (config.login_max_attempts, config.login_window_seconds as u64),
            Action::Register => (config.registration_per_hour, 3600),
            Action::Post => (config.posts_per_minute, 60),
            Action::Message => (config.messages_per_minute, 60),
            Action::FriendRequest => (config.friend_requests_per_hour, 3600),
        };
        (max as usize, Duration::from_secs(secs))
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitError {
    pub retry_after_seconds: u64,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Too many requests. Try again in {} seconds",
            self.retry_after_seconds
        )
    }
}

impl std::error::Error for RateLimitError {}

#[derive(Default)]
pub struct RateLimiter {
    hits: DashMap<(Action, String), Vec<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hit unless `max` hits already fall inside `window`.
    pub fn hit(
        &self,
        action: Action,
        key: &str,
        max: usize,
        window: Duration,
    ) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let mut stamps = self.hits.entry((action, key.to_string())).or_default();
        stamps.retain(|t| now.duration_since(*t) < window);

        if max == 0 || stamps.len() >= max {
            let wait = stamps
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return Err(RateLimitError {
                retry_after_seconds: wait.as_secs() + 1,
            });
        }

        stamps.push(now);
        Ok(())
    }

    /// Hits for `key` inside `window`.
    pub fn count(&self, action: Action, key: &str, window: Duration) -> usize {
        let now = Instant::now();
        self.hits
            .get(&(action, key.to_string()))
            .map(|stamps| {
                stamps
                    .iter()
                    .filter(|t| now.duration_since(**t) < window)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn reset(&self, action: Action, key: &str) {
        self.hits.remove(&(action, key.to_string()));
    }

    pub fn clear_all(&self) {
        self.hits.clear();
    }

    /// Drops stamps older than `max_age`, then keys left empty.
    pub fn sweep(&self, max_age: Duration) {
        let now = Instant::now();
        self.hits.retain(|_, stamps| {
            stamps.retain(|t| now.duration_since(*t) < max_age);
            !stamps.is_empty()
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.hits.len()
    }
}

/// Checks `action` for `key` against the configured budget.
pub fn check(action: Action, key: &str) -> Result<(), RateLimitError> {
    let (max, window) = action.budget(&app_config::rate_limit());
    RATE_LIMITER.hit(action, key, max, window).map_err(|e| {
        log::debug!("Rate limit reached for {} by {}", action.as_str(), key);
        e
    })
}

fn login_key(ip: &str, username: &str) -> String {
    format!("{}:{}", ip, username.to_lowercase())
}

pub fn check_login_rate_limit(ip: &str, username: &str) -> Result<(), RateLimitError> {
    check(Action::Login, &login_key(ip, username))
}

/// Successful logins forget earlier failures.
pub fn clear_login_attempts(ip: &str, username: &str) {
    RATE_LIMITER.reset(Action::Login, &login_key(ip, username));
}

pub fn check_registration_rate_limit(ip: &str) -> Result<(), RateLimitError> {
    check(Action::Register, ip)
}

pub fn check_post_rate_limit(user_id: i32) -> Result<(), RateLimitError> {
    check(Action::Post, &user_id.to_string())
}

pub fn check_message_rate_limit(user_id: i32) -> Result<(), RateLimitError> {
    check(Action::Message, &user_id.to_string())
}

pub fn check_friend_request_rate_limit(user_id: i32) -> Result<(), RateLimitError> {
    check(Action::FriendRequest, &user_id.to_string())
}

/// Called periodically by the server binary.
pub fn sweep_global() {
    RATE_LIMITER.sweep(MAX_WINDOW);
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    #[test]
    fn test_blocks_after_budget() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            limiter.hit(Action::Post, "7", 3, WINDOW).unwrap();
        }

        let err = limiter.hit(Action::Post, "7", 3, WINDOW).unwrap_err();
        assert!(err.retry_after_seconds >= 1 && err.retry_after_seconds <= 11);
        assert_eq!(limiter.count(Action::Post, "7", WINDOW), 3);
    }

    #[test]
    fn test_keys_and_actions_are_independent() {
        let limiter = RateLimiter::new();
        limiter.hit(Action::Message, "1", 1, WINDOW).unwrap();

        assert!(limiter.hit(Action::Message, "1", 1, WINDOW).is_err());
        assert!(limiter.hit(Action::Message, "2", 1, WINDOW).is_ok());
        assert!(limiter.hit(Action::Post, "1", 1, WINDOW).is_ok());
    }

    #[test]
    fn test_zero_budget_always_blocks() {
        let limiter = RateLimiter::new();
        assert!(limiter.hit(Action::Register, "ip", 0, WINDOW).is_err());
    }

    #[test]
    fn test_reset_forgets_failures() {
        let limiter = RateLimiter::new();
        limiter.hit(Action::Login, "ip:alice", 5, WINDOW).unwrap();
        limiter.hit(Action::Login, "ip:alice", 5, WINDOW).unwrap();

        limiter.reset(Action::Login, "ip:alice");
        assert_eq!(limiter.count(Action::Login, "ip:alice", WINDOW), 0);
    }

    #[test]
    fn test_sweep() {
        let limiter = RateLimiter::new();
        limiter.hit(Action::Post, "1", 10, WINDOW).unwrap();
        limiter.hit(Action::Post, "2", 10, WINDOW).unwrap();

        limiter.sweep(MAX_WINDOW);
        assert_eq!(limiter.tracked_keys(), 2);

        std::thread::sleep(Duration::from_millis(20));
        limiter.sweep(Duration::from_millis(10));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_budget_follows_config() {
        let config = RateLimitConfig::default();
        let (max, window) = Action::Login.budget(&config);
        assert_eq!(max, config.login_max_attempts as usize);
        assert_eq!(window, Duration::from_secs(config.login_window_seconds as u64));
        assert_eq!(Action::Post.budget(&config).1, Duration::from_secs(60));
        assert_eq!(Action::FriendRequest.as_str(), "friend_request");
    }
}
