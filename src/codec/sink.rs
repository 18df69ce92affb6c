//! Output sinks
//!
//! - [`ProtocolSink`]: destination for decoded messages
//! - [`ChildOutput`]: capture buffer handed to nested phases
//! - [`FnSink`]: adapter for plain closures

use crate::error::Result;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Destination for decoded messages
pub trait ProtocolSink<T> {
    /// Accept one message
    fn write(&mut self, message: T);

    /// Push buffered messages downstream
    ///
    /// Only the top-level pipeline calls this.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T> ProtocolSink<T> for Vec<T> {
    fn write(&mut self, message: T) {
        self.push(message);
    }
}

impl<T> ProtocolSink<T> for UnboundedSender<T> {
    fn write(&mut self, message: T) {
        if self.send(message).is_err() {
            debug!("Sink receiver dropped, message discarded");
        }
    }
}

/// Sink calling a closure for every message
///
/// ```ignore
/// let mut count = 0;
/// let mut sink = FnSink(|_msg: Bytes| count += 1);
/// ```
pub struct FnSink<F>(pub F);

impl<T, F: FnMut(T)> ProtocolSink<T> for FnSink<F> {
    fn write(&mut self, message: T) {
        (self.0)(message)
    }
}

/// Capture buffer standing in for the real sink while nested phases run
///
/// Appends to the owning decoder's captured-products list in arrival order.
/// Nothing reaches the real sink until the aggregation step decides so,
/// which is why `flush` does nothing.
pub struct ChildOutput<'a, T> {
    products: &'a mut Vec<T>,
}

impl<'a, T> ChildOutput<'a, T> {
    pub fn new(products: &'a mut Vec<T>) -> Self {
        Self { products }
    }
}

impl<T> ProtocolSink<T> for ChildOutput<'_, T> {
    fn write(&mut self, message: T) {
        self.products.push(message);
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
