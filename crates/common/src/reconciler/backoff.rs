use std::time::Duration;

/// Delay before re-running a policy whose last pass failed
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffConfig {
    Fixed {
        delay: Duration,
    },
    Exponential {
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    },
    Linear {
        initial_delay: Duration,
        increment: Duration,
        max_delay: Duration,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::Exponential {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Delay for a given attempt number (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Self::Fixed { delay } => *delay,
            Self::Exponential {
                initial_delay,
                max_delay,
                multiplier,
            } => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                let secs = initial_delay.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max_delay.as_secs_f64() {
                    return *max_delay;
                }
                Duration::from_secs_f64(secs)
            }
            Self::Linear {
                initial_delay,
                increment,
                max_delay,
            } => {
                let delay = increment
                    .checked_mul(attempt - 1)
                    .and_then(|inc| initial_delay.checked_add(inc))
                    .unwrap_or(*max_delay);
                delay.min(*max_delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_caps_at_max() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(8));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(60));
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_linear_and_fixed() {
        let linear = BackoffConfig::Linear {
            initial_delay: Duration::from_millis(100),
            increment: Duration::from_millis(50),
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(linear.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(linear.delay_for_attempt(3), Duration::from_millis(200));
        assert_eq!(linear.delay_for_attempt(100), Duration::from_millis(300));

        let fixed = BackoffConfig::Fixed {
            delay: Duration::from_millis(5),
        };
        assert_eq!(fixed.delay_for_attempt(7), Duration::from_millis(5));
    }
}
