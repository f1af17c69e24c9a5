pub mod channel_feed;
pub mod parsers;
pub mod rest_client;

pub use channel_feed::{ChannelFeed, DEFAULT_FEED_CAPACITY};
pub use parsers::{DiffRecordParser, ModifyParser, RemoveParser, TradeParser, parse_order_book};
pub use rest_client::{RestClient, RestError};
