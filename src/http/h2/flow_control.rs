//! HTTP/2 flow control windows (RFC 7540 Section 5.2)
//!
//! One window type serves both directions at both levels: the connection
//! engine keeps a send and a receive window per connection and per stream.
//! Window sizes are signed; a SETTINGS_INITIAL_WINDOW_SIZE change may push
//! a stream window transiently negative.

use super::error::{Error, Result};

/// Maximum window size (2^31 - 1)
pub const MAX_WINDOW_SIZE: i64 = 0x7FFF_FFFF;

/// A flow-control window
#[derive(Debug, Clone)]
pub struct FlowWindow {
    initial: u32,
    size: i64,
}

impl FlowWindow {
    /// Create a window with the given initial size
    pub fn new(initial: u32) -> Self {
        FlowWindow {
            initial,
            size: initial as i64,
        }
    }

    /// Current window size
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Initial window size
    pub fn initial(&self) -> u32 {
        self.initial
    }

    /// Check whether the window has send capacity
    pub fn has_capacity(&self) -> bool {
        self.size > 0
    }

    /// Consume up to `amount` octets of send capacity
    ///
    /// Returns the amount actually available (zero when exhausted).
    pub fn consume(&mut self, amount: usize) -> usize {
        if self.size <= 0 {
            return 0;
        }
        let granted = (amount as i64).min(self.size) as usize;
        self.size -= granted as i64;
        granted
    }

    /// Debit the window for received data
    ///
    /// Returns the new size; a negative result is the caller's
    /// FLOW_CONTROL_ERROR to act on.
    pub fn debit(&mut self, amount: usize) -> i64 {
        self.size -= amount as i64;
        self.size
    }

    /// Grow the window by a WINDOW_UPDATE increment
    pub fn increase(&mut self, increment: u32) -> Result<i64> {
        let new_size = self.size + increment as i64;
        if new_size > MAX_WINDOW_SIZE {
            return Err(Error::FlowControl(format!(
                "window size {} exceeds 2^31-1",
                new_size
            )));
        }
        self.size = new_size;
        Ok(self.size)
    }

    /// Shift the window after a SETTINGS_INITIAL_WINDOW_SIZE change
    ///
    /// The current size moves by the delta (new - old); the result may be
    /// negative but must not exceed 2^31-1.
    pub fn update_initial(&mut self, new_initial: u32) -> Result<()> {
        let delta = new_initial as i64 - self.initial as i64;
        let new_size = self.size + delta;
        if new_size > MAX_WINDOW_SIZE {
            return Err(Error::FlowControl(format!(
                "window size {} exceeds 2^31-1 after SETTINGS change",
                new_size
            )));
        }
        self.initial = new_initial;
        self.size = new_size;
        Ok(())
    }

    /// Replenishment increment for a receive window
    ///
    /// Once more than half the initial window has been consumed, returns
    /// the increment that restores it to the initial size and applies it.
    pub fn replenish(&mut self) -> Option<u32> {
        let initial = self.initial as i64;
        if self.size >= initial / 2 || self.size < 0 {
            return None;
        }
        let increment = (initial - self.size) as u32;
        self.size = initial;
        Some(increment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_caps_at_available() {
        let mut window = FlowWindow::new(100);
        assert_eq!(window.consume(50), 50);
        assert_eq!(window.size(), 50);

        assert_eq!(window.consume(60), 50);
        assert_eq!(window.size(), 0);

        assert_eq!(window.consume(10), 0);
    }

    #[test]
    fn test_debit_goes_negative() {
        let mut window = FlowWindow::new(10);
        assert_eq!(window.debit(25), -15);
        assert!(!window.has_capacity());
    }

    #[test]
    fn test_increase_overflow() {
        let mut window = FlowWindow::new(0x7FFF_FFFF);
        assert!(window.increase(1).is_err());

        let mut window = FlowWindow::new(100);
        window.increase(500).unwrap();
        assert_eq!(window.size(), 600);
    }

    #[test]
    fn test_update_initial_shifts_current() {
        let mut window = FlowWindow::new(100);
        window.consume(50);

        window.update_initial(200).unwrap();
        assert_eq!(window.initial(), 200);
        assert_eq!(window.size(), 150);

        // Shrinking below what is consumed goes negative
        window.update_initial(10).unwrap();
        assert_eq!(window.size(), -40);
    }

    #[test]
    fn test_update_initial_overflow() {
        let mut window = FlowWindow::new(0x7FFF_FFFF);
        assert!(window.update_initial(0x7FFF_FFFF).is_ok());

        let mut window = FlowWindow::new(100);
        window.increase(0x7FFF_FFFF - 100).unwrap();
        assert!(window.update_initial(200).is_err());
    }

    #[test]
    fn test_replenish_threshold() {
        let mut window = FlowWindow::new(100);
        window.debit(40);
        assert_eq!(window.replenish(), None);

        window.debit(20);
        assert_eq!(window.replenish(), Some(60));
        assert_eq!(window.size(), 100);
    }
}
