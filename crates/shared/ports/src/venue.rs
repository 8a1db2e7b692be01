use async_trait::async_trait;
use tokio::sync::mpsc;
use treasury_core::{BookUpdate, OrderId, OrderRequest, OrderUpdate, Price, Quantity, VenueId};

use crate::VenueResult;

/// Port every exchange integration implements
///
/// Request signing, payload shapes and websocket framing live behind this
/// trait. Streams are plain receivers: the adapter drops the sender when the
/// underlying connection goes away, which ends the stream.
///
/// REST calls are expected to time out internally.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    fn venue(&self) -> &VenueId;

    /// Whether `edit_order` can amend a resting order in place.
    /// When false, callers cancel and re-place instead.
    fn supports_amend(&self) -> bool;

    async fn subscribe_order_book(&self, symbol: &str) -> VenueResult<mpsc::Receiver<BookUpdate>>;

    async fn subscribe_order_status(&self, symbol: &str)
    -> VenueResult<mpsc::Receiver<OrderUpdate>>;

    async fn place_order(&self, request: &OrderRequest) -> VenueResult<OrderId>;

    /// Amend a resting order. `quantity` is the new open quantity.
    async fn edit_order(
        &self,
        order_id: &OrderId,
        quantity: Quantity,
        price: Price,
        reduce_only: bool,
    ) -> VenueResult<()>;

    async fn cancel_all(&self, symbol: &str) -> VenueResult<()>;
}
