// Loop Manager - validated loop boundaries
//
// Invariant: end_frame > start_frame whenever the loop is enabled.

use serde::Serialize;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopManager {
    enabled: bool,
    start_frame: usize,
    end_frame: usize,
}

impl LoopManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn end_frame(&self) -> usize {
        self.end_frame
    }

    /// Store new loop boundaries and enable looping.
    ///
    /// `start_frame` is clamped to `>= 0` and `end_frame` to
    /// `<= total_duration_frames`. Returns `false`, leaving everything
    /// unchanged, when the clamped range is empty or inverted.
    pub fn set_loop_points(
        &mut self,
        start_frame: i64,
        end_frame: i64,
        total_duration_frames: usize,
    ) -> bool {
        let start = start_frame.max(0);
        let end = end_frame.min(total_duration_frames as i64);

        if end <= start {
            log::warn!(
                "[Loop] Rejected loop points {}..{} (total {} frames): end must be greater than start",
                start,
                end,
                total_duration_frames
            );
            return false;
        }

        self.start_frame = start as usize;
        self.end_frame = end as usize;
        self.enabled = true;
        log::info!(
            "[Loop] Looping enabled from frame {} to {}",
            self.start_frame,
            self.end_frame
        );
        true
    }

    /// Flip looping on or off, returning the new state.
    ///
    /// Disabling always succeeds. Enabling re-checks the stored boundaries.
    pub fn toggle(&mut self) -> Result<bool, SessionError> {
        if self.enabled {
            self.enabled = false;
            log::info!("[Loop] Looping disabled");
            return Ok(false);
        }

        if self.end_frame <= self.start_frame {
            return Err(SessionError::InvalidLoopPoints {
                start: self.start_frame,
                end: self.end_frame,
            });
        }
        self.enabled = true;
        log::info!("[Loop] Looping enabled");
        Ok(true)
    }

    /// Frame to jump back to if `current_frame` has reached the loop end.
    pub fn wrap_target(&self, current_frame: usize) -> Option<usize> {
        if self.enabled && current_frame >= self.end_frame {
            Some(self.start_frame)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_loop_points_enables() {
        let mut looper = LoopManager::new();
        assert!(looper.set_loop_points(1000, 5000, 10_000));
        assert!(looper.is_enabled());
        assert_eq!((looper.start_frame(), looper.end_frame()), (1000, 5000));
    }

    #[test]
    fn test_set_loop_points_clamps() {
        let mut looper = LoopManager::new();
        assert!(looper.set_loop_points(-500, 50_000, 8000));
        assert_eq!((looper.start_frame(), looper.end_frame()), (0, 8000));
    }

    #[test]
    fn test_set_loop_points_rejects_without_state_change() {
        let mut looper = LoopManager::new();
        assert!(looper.set_loop_points(100, 200, 1000));

        assert!(!looper.set_loop_points(300, 300, 1000), "Zero-length loop");
        assert!(!looper.set_loop_points(500, 400, 1000), "Inverted loop");
        assert!(
            !looper.set_loop_points(2000, 3000, 1000),
            "End clamped below start"
        );
        assert_eq!((looper.start_frame(), looper.end_frame()), (100, 200));
        assert!(looper.is_enabled());
    }

    #[test]
    fn test_toggle_requires_valid_points() {
        let mut looper = LoopManager::new();
        assert_eq!(
            looper.toggle(),
            Err(SessionError::InvalidLoopPoints { start: 0, end: 0 })
        );
        assert!(!looper.is_enabled());

        looper.set_loop_points(0, 10, 100);
        assert_eq!(looper.toggle(), Ok(false));
        assert_eq!(looper.toggle(), Ok(true));
    }

    #[test]
    fn test_wrap_target() {
        let mut looper = LoopManager::new();
        assert_eq!(looper.wrap_target(10_000), None, "Disabled loop never wraps");

        looper.set_loop_points(1000, 5000, 10_000);
        assert_eq!(looper.wrap_target(4999), None);
        assert_eq!(looper.wrap_target(5000), Some(1000));
        assert_eq!(looper.wrap_target(5120), Some(1000));
    }
}
