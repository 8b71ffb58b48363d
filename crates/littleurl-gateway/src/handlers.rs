mod health;
mod url;

pub use health::health_handler;
pub use url::{
    create_url_handler, delete_blank_key_handler, delete_url_handler, get_blank_key_handler,
    get_url_handler, list_urls_handler, undelete_blank_key_handler, undelete_url_handler,
};
