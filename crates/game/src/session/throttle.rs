use glam::Vec2;

use crate::config::InputConfig;

/// Decides which local input directions are worth sending.
///
/// Non-zero input goes out when it turned noticeably or the last send is
/// older than the resend interval. Dropping into the dead zone sends a
/// single zero vector, then stays quiet until input resumes.
#[derive(Debug, Clone)]
pub struct MoveInputThrottle {
    config: InputConfig,
    last_sent: Option<Vec2>,
    last_sent_at: f64,
    stopped: bool,
}

impl MoveInputThrottle {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            last_sent: None,
            last_sent_at: 0.0,
            stopped: true,
        }
    }

    pub fn update(&mut self, now: f64, input: Vec2) -> Option<Vec2> {
        if input.length_squared() < self.config.dead_zone_sq {
            if self.stopped {
                return None;
            }
            self.stopped = true;
            return Some(self.record(now, Vec2::ZERO));
        }

        let direction = input.clamp_length_max(1.0);
        let turned = self
            .last_sent
            .is_none_or(|last| last.distance_squared(direction) > self.config.direction_change_sq);
        let stale = now - self.last_sent_at > f64::from(self.config.resend_interval_secs);

        if self.stopped || turned || stale {
            self.stopped = false;
            return Some(self.record(now, direction));
        }
        None
    }

    fn record(&mut self, now: f64, direction: Vec2) -> Vec2 {
        self.last_sent = Some(direction);
        self.last_sent_at = now;
        direction
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
