mod hex;
mod time;

pub use hex::{
    address_from_topic, lower_hex, pad_address_topic, parse_hex_u64, value_to_decimal,
};
pub use time::{datetime_to_millis, millis_to_datetime, now_millis};
