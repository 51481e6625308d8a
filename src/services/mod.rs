pub mod cart;
pub mod checkout;
pub mod inventory;
pub mod order_status;
pub mod orders;
pub mod payments;

pub use cart::CartService;
pub use checkout::CheckoutService;
pub use inventory::InventoryService;
pub use order_status::OrderStatusService;
pub use orders::OrderService;
pub use payments::{PaymentGateway, SimulatedGateway};
