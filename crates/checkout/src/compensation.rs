//! Compensation log recorded while reserving inventory.

use common::ProductId;
use domain::CartLine;

/// Everything needed to undo one reserved cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedLine {
    pub product_id: ProductId,
    /// Stock units taken from the product.
    pub units: u32,
    /// The cart line as it was before it was drained.
    pub cart_line: CartLine,
    /// Whether the cart line was actually removed.
    pub drained: bool,
}

/// Ordered record of completed reservation steps.
///
/// Entries are undone newest first.
#[derive(Debug, Clone, Default)]
pub struct CompensationLog {
    entries: Vec<ReservedLine>,
}

impl CompensationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a stock decrement. The cart line is not yet drained.
    pub fn record_decrement(&mut self, cart_line: CartLine, units: u32) {
        self.entries.push(ReservedLine {
            product_id: cart_line.product_id,
            units,
            cart_line,
            drained: false,
        });
    }

    /// Marks the newest entry's cart line as drained.
    pub fn mark_drained(&mut self) {
        if let Some(last) = self.entries.last_mut() {
            last.drained = true;
        }
    }

    /// Returns entries in the order they must be undone.
    pub fn undo_order(&self) -> impl Iterator<Item = &ReservedLine> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
