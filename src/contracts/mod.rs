use serde::{Deserialize, Serialize};

use crate::oracle::PriceOracle;

/// Mock on-chain addresses for the two oracle contracts.
pub const PRICE_CONTRACT_ADDRESS: &str = "0x0000000000000000000000000000000000000001";
pub const FEED_CONTRACT_ADDRESS: &str = "0x0000000000000000000000000000000000000002";

/// Function selectors (first 4 bytes of the signature hash).
const SELECTOR_GET_CURRENT_PRICE: &str = "0x893d20e8"; // getCurrentPrice(address)
const SELECTOR_GET_PRICE_AT_EPOCH: &str = "0x4b750334"; // getPrice(address,uint256)

/// A contract function call as carried by `eth_call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractCall {
    pub to: String,
    pub data: String,
}

/// Outcome of a simulated contract call. Errors are part of the payload,
/// never an HTTP-level failure.
#[derive(Debug, Clone, Serialize)]
pub struct ContractResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContractResponse {
    fn ok(result: String) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    fn err(message: &str) -> Self {
        Self {
            result: None,
            error: Some(message.to_string()),
        }
    }
}

/// Dispatch a simulated contract call to the mock contract it targets.
pub fn handle_call(oracle: &PriceOracle, call: &ContractCall) -> ContractResponse {
    match call.to.to_lowercase().as_str() {
        PRICE_CONTRACT_ADDRESS => handle_price_call(oracle, call),
        FEED_CONTRACT_ADDRESS => handle_feed_call(call),
        _ => ContractResponse::err("unknown contract address"),
    }
}

fn handle_price_call(oracle: &PriceOracle, call: &ContractCall) -> ContractResponse {
    // 0x + 4 selector bytes. `get` also rejects data where byte 10 is not
    // a char boundary; call data is caller-supplied, not trusted hex.
    let Some(selector) = call.data.get(..10) else {
        return ContractResponse::err("invalid call data");
    };

    match selector {
        SELECTOR_GET_CURRENT_PRICE => handle_get_current_price(oracle, &call.data),
        SELECTOR_GET_PRICE_AT_EPOCH => {
            ContractResponse::err("getPrice(asset, epoch) not implemented")
        }
        _ => ContractResponse::err("unknown function selector"),
    }
}

fn handle_feed_call(call: &ContractCall) -> ContractResponse {
    if call.data.get(..10).is_none() {
        return ContractResponse::err("invalid call data");
    }
    ContractResponse::err("unknown feed contract function")
}

/// getCurrentPrice(address asset) returns (uint256 price, uint256 timestamp),
/// price scaled to 8 decimals.
fn handle_get_current_price(oracle: &PriceOracle, data: &str) -> ContractResponse {
    // 0x + 4 selector bytes + 32-byte address word.
    if data.len() < 74 {
        return ContractResponse::err("invalid call data");
    }
    let Some(address_word) = data.get(data.len() - 40..) else {
        return ContractResponse::err("invalid call data");
    };

    let asset = address_to_asset(address_word);
    let record = match oracle.price(&asset) {
        Ok(Some(record)) => record,
        Ok(None) => return ContractResponse::err("price not found"),
        Err(err) => return ContractResponse::err(&err.to_string()),
    };

    let scaled = (record.value * 1e8) as u128;
    ContractResponse::ok(format!("0x{:064x}{:064x}", scaled, record.timestamp))
}

/// Map the trailing address word of the call data to an asset symbol.
fn address_to_asset(address_hex: &str) -> String {
    let normalized = address_hex
        .trim_start_matches("0x")
        .to_lowercase()
        .trim_start_matches('0')
        .to_string();

    match normalized.as_str() {
        "1" => "BTC".to_string(),
        "2" => "ETH".to_string(),
        "3" => "XRP".to_string(),
        _ => match normalized.len().checked_sub(4).and_then(|i| normalized.get(i..)) {
            Some(suffix) => suffix.to_uppercase(),
            None => "UNKNOWN".to_string(),
        },
    }
}

/// ABI-style encoding of a string argument: 32-byte length word followed by
/// the bytes, hex encoded.
pub fn encode_string(s: &str) -> String {
    format!("0x{:064x}{}", s.len(), hex::encode(s.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::{
        ContractCall, ContractResponse, PRICE_CONTRACT_ADDRESS, address_to_asset, encode_string,
        handle_call,
    };
    use crate::oracle::PriceOracle;
    use crate::state::Storage;
    use std::sync::Arc;

    fn call(to: &str, data: &str) -> ContractCall {
        ContractCall {
            to: to.to_string(),
            data: data.to_string(),
        }
    }

    fn current_price_data(address_word: &str) -> String {
        format!("0x893d20e8{:0>64}", address_word)
    }

    #[test]
    fn get_current_price_encodes_two_words() {
        let oracle = PriceOracle::new(Arc::new(Storage::new()), None);
        let record = oracle.set_price("BTC", 50_000.0);

        let resp = handle_call(&oracle, &call(PRICE_CONTRACT_ADDRESS, &current_price_data("1")));
        let result = resp.result.expect("call succeeds");

        assert_eq!(result.len(), 2 + 64 + 64);
        let price_word = u128::from_str_radix(&result[2..66], 16).unwrap();
        let ts_word = i64::from_str_radix(&result[66..], 16).unwrap();
        assert_eq!(price_word, 50_000u128 * 100_000_000);
        assert_eq!(ts_word, record.timestamp);
    }

    #[test]
    fn missing_price_is_a_payload_error() {
        let oracle = PriceOracle::new(Arc::new(Storage::new()), None);
        let resp = handle_call(&oracle, &call(PRICE_CONTRACT_ADDRESS, &current_price_data("1")));
        assert_eq!(resp.error.as_deref(), Some("price not found"));
    }

    #[test]
    fn unknown_selector_and_address_are_payload_errors() {
        let oracle = PriceOracle::new(Arc::new(Storage::new()), None);

        let resp = handle_call(&oracle, &call(PRICE_CONTRACT_ADDRESS, "0xdeadbeef"));
        assert_eq!(resp.error.as_deref(), Some("unknown function selector"));

        let resp = handle_call(&oracle, &call("0xffff", "0x893d20e8"));
        assert_eq!(resp.error.as_deref(), Some("unknown contract address"));

        let resp: ContractResponse = handle_call(&oracle, &call(PRICE_CONTRACT_ADDRESS, "0x"));
        assert_eq!(resp.error.as_deref(), Some("invalid call data"));
    }

    #[test]
    fn multibyte_call_data_is_rejected_not_a_panic() {
        let oracle = PriceOracle::new(Arc::new(Storage::new()), None);
        oracle.set_price("BTC", 50_000.0);

        // A multi-byte character straddling the selector boundary.
        let resp = handle_call(
            &oracle,
            &call(PRICE_CONTRACT_ADDRESS, "0x893d20e\u{e9}xxxxxxxxxx"),
        );
        assert_eq!(resp.error.as_deref(), Some("invalid call data"));

        // Same at the trailing address-word boundary: the 40-byte suffix
        // starts on the second byte of a two-byte character.
        let data = format!("0x893d20e8{}\u{e9}{}", "0".repeat(23), "0".repeat(39));
        assert_eq!(data.len(), 74);
        let resp = handle_call(&oracle, &call(PRICE_CONTRACT_ADDRESS, &data));
        assert_eq!(resp.error.as_deref(), Some("invalid call data"));

        // And inside the asset-suffix fallback, where the last-4-bytes cut
        // would land mid-character.
        assert_eq!(address_to_asset("0000\u{e9}abc"), "UNKNOWN");
    }

    #[test]
    fn address_suffixes_map_to_assets() {
        assert_eq!(address_to_asset("0000000000000000000000000000000000000001"), "BTC");
        assert_eq!(address_to_asset("0000000000000000000000000000000000000002"), "ETH");
        assert_eq!(address_to_asset("0000000000000000000000000000000000000003"), "XRP");
        assert_eq!(address_to_asset("00000000000000000000000000000000deadbeef"), "BEEF");
    }

    #[test]
    fn string_encoding_carries_length_word() {
        let encoded = encode_string("BTC");
        assert!(encoded.starts_with("0x"));
        assert_eq!(&encoded[2..66], &format!("{:064x}", 3));
        assert_eq!(&encoded[66..], hex::encode("BTC"));
    }
}
