use alloy_primitives::U256;

pub fn lower_hex(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Canonical decimal rendering for on-chain quantities. `0x`-prefixed hex
/// becomes its big-int decimal representation, an already-decimal string
/// passes through unchanged and anything else passes through verbatim so a
/// bad upstream value stays visible in the store.
pub fn value_to_decimal(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(digits) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if digits.is_empty() {
            return "0".to_string();
        }
        return match U256::from_str_radix(digits, 16) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => value.to_string(),
        };
    }

    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.to_string();
    }

    value.to_string()
}

/// Parses a `0x`-prefixed JSON-RPC quantity.
pub fn parse_hex_u64(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

/// Extracts the address out of an indexed event topic. A full 32-byte topic
/// yields its low 20 bytes, an already 20-byte value passes through and
/// anything else is returned lower-cased as-is.
pub fn address_from_topic(topic: &str) -> String {
    let lowered = lower_hex(topic);
    if lowered.len() == 66 && lowered.starts_with("0x") {
        return format!("0x{}", &lowered[26..]);
    }
    lowered
}

/// Left-pads an address into the 32-byte topic form used by `eth_getLogs`
/// topic filters.
pub fn pad_address_topic(address: &str) -> String {
    let lowered = lower_hex(address);
    let digits = lowered.strip_prefix("0x").unwrap_or(&lowered);
    format!("0x{:0>64}", digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_values_become_decimal() {
        assert_eq!(value_to_decimal("0x0"), "0");
        assert_eq!(value_to_decimal("0xde0b6b3a7640000"), "1000000000000000000");
        assert_eq!(value_to_decimal("0xff"), "255");
        assert_eq!(value_to_decimal("0x"), "0");
    }

    #[test]
    fn decimal_values_pass_through() {
        assert_eq!(value_to_decimal("123456789"), "123456789");
        assert_eq!(value_to_decimal("0"), "0");
    }

    #[test]
    fn garbage_passes_through_verbatim() {
        assert_eq!(value_to_decimal("not-a-number"), "not-a-number");
        assert_eq!(value_to_decimal("0xzz"), "0xzz");
    }

    #[test]
    fn hex_round_trips_through_decimal() {
        for n in [0u128, 1, 42, u64::MAX as u128, u128::MAX] {
            let hex = format!("0x{:x}", n);
            assert_eq!(value_to_decimal(&hex), n.to_string());
        }
    }

    #[test]
    fn topic_address_extraction() {
        let topic = "0x000000000000000000000000A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        assert_eq!(address_from_topic(topic), "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(
            address_from_topic("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
        assert_eq!(address_from_topic("0xdead"), "0xdead");
    }

    #[test]
    fn address_pads_to_topic_width() {
        let padded = pad_address_topic("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(padded.len(), 66);
        assert_eq!(
            padded,
            "0x000000000000000000000000a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_hex_u64("0x10"), Some(16));
        assert_eq!(parse_hex_u64("0x0"), Some(0));
        assert_eq!(parse_hex_u64("16"), None);
        assert_eq!(parse_hex_u64("0xzz"), None);
    }
}
