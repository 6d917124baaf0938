pub mod connection;
pub mod orders;
pub mod products;
pub(crate) mod schema;
pub(crate) mod test_utils;
pub mod users;

pub use connection::{DbPool, init_db};
pub use orders::{
    execute_checkout, get_order, list_items_for_order, list_orders_for_user,
};
pub use products::{
    decrement_stock, get_product, get_product_by_name, insert_product, list_products,
};
pub use users::{
    get_user_by_username, insert_user, load_checkout_profile, resolve_user_id, save_address,
    save_payment,
};
