//! Scoped instrument sessions.

use tracing::warn;

use crate::error::HalResult;
use crate::instrument::Shutdown;

/// Exclusively-owned, scoped instrument connection.
///
/// The instrument is released into a safe state (outputs muted, bias
/// lines zeroed) on every exit path: [`close`](Session::close) reports
/// shutdown errors, and `Drop` covers early returns and panics, logging
/// instead of failing.
#[derive(Debug)]
pub struct Session<T: Shutdown> {
    instrument: Option<T>,
}

impl<T: Shutdown> Session<T> {
    /// Take ownership of a connected instrument.
    pub fn new(instrument: T) -> Self {
        Self {
            instrument: Some(instrument),
        }
    }

    /// Access the instrument.
    pub fn instrument(&self) -> &T {
        self.instrument
            .as_ref()
            .unwrap_or_else(|| unreachable!("session accessed after close"))
    }

    /// Mutable access to the instrument.
    pub fn instrument_mut(&mut self) -> &mut T {
        self.instrument
            .as_mut()
            .unwrap_or_else(|| unreachable!("session accessed after close"))
    }

    /// Shut the instrument down and report the outcome.
    pub fn close(mut self) -> HalResult<()> {
        match self.instrument.take() {
            Some(mut instrument) => instrument.shutdown(),
            None => Ok(()),
        }
    }
}

impl<T: Shutdown> Drop for Session<T> {
    fn drop(&mut self) {
        if let Some(mut instrument) = self.instrument.take() {
            if let Err(err) = instrument.shutdown() {
                warn!("instrument shutdown failed during session teardown: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Probe {
        shutdowns: Rc<Cell<usize>>,
    }

    impl Shutdown for Probe {
        fn shutdown(&mut self) -> HalResult<()> {
            self.shutdowns.set(self.shutdowns.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_drop_shuts_down_once() {
        let shutdowns = Rc::new(Cell::new(0));
        {
            let _session = Session::new(Probe {
                shutdowns: Rc::clone(&shutdowns),
            });
        }
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn test_close_shuts_down_once() {
        let shutdowns = Rc::new(Cell::new(0));
        let session = Session::new(Probe {
            shutdowns: Rc::clone(&shutdowns),
        });
        session.close().unwrap();
        assert_eq!(shutdowns.get(), 1);
    }
}
