//! registry.rs - Supported networks and the quoted token catalogue
//!
//! Both sets are fixed at compile time; lookups never allocate.

use crate::models::{ChainId, NetworkDescriptor, TokenDescriptor};

pub const ETHEREUM: NetworkDescriptor = NetworkDescriptor {
    chain_id: ChainId(0x1),
    name: "Ethereum",
    native_symbol: "ETH",
    native_quote: "ETH/USD",
    rpc_endpoints: &["https://mainnet.infura.io/v3/your-project-id"],
    block_explorer_urls: &["https://etherscan.io"],
};

pub const SEPOLIA: NetworkDescriptor = NetworkDescriptor {
    chain_id: ChainId(0xaa36a7),
    name: "Sepolia",
    native_symbol: "ETH",
    native_quote: "ETH/USD",
    rpc_endpoints: &["https://sepolia.infura.io/v3/your-project-id"],
    block_explorer_urls: &["https://sepolia.etherscan.io"],
};

pub const COSTON2: NetworkDescriptor = NetworkDescriptor {
    chain_id: ChainId(0x72),
    name: "Flare Testnet Coston2",
    native_symbol: "C2FLR",
    native_quote: "FLR/USD",
    rpc_endpoints: &["https://coston2-api.flare.network/ext/bc/C/rpc"],
    block_explorer_urls: &["https://coston2-explorer.flare.network"],
};

static NETWORKS: [NetworkDescriptor; 3] = [ETHEREUM, SEPOLIA, COSTON2];

static TOKENS: [TokenDescriptor; 4] = [
    TokenDescriptor {
        symbol: "FLR/USD",
        display_name: "Flare",
        icon: "💧",
        gradient: "from-blue-500 to-cyan-400",
        icon_class: "text-blue-500",
    },
    TokenDescriptor {
        symbol: "XRP/USD",
        display_name: "XRP",
        icon: "🌊",
        gradient: "from-cyan-500 to-teal-400",
        icon_class: "text-cyan-600",
    },
    TokenDescriptor {
        symbol: "BTC/USD",
        display_name: "Bitcoin",
        icon: "🪙",
        gradient: "from-amber-400 to-orange-500",
        icon_class: "text-amber-500",
    },
    TokenDescriptor {
        symbol: "ETH/USD",
        display_name: "Ethereum",
        icon: "💎",
        gradient: "from-purple-500 to-indigo-500",
        icon_class: "text-purple-600",
    },
];

/// Index into the token catalogue selected when nothing else is configured
const DEFAULT_TOKEN_INDEX: usize = 1;

/// Find the descriptor for a chain
pub fn lookup(chain_id: ChainId) -> Option<&'static NetworkDescriptor> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Find the descriptor for a hex chain id; malformed ids are simply not found
pub fn lookup_hex(raw: &str) -> Option<&'static NetworkDescriptor> {
    ChainId::from_hex(raw).and_then(lookup)
}

/// Network shown when detection is impossible or inconclusive
pub fn fallback_network() -> &'static NetworkDescriptor {
    &NETWORKS[2]
}

pub fn supported_networks() -> &'static [NetworkDescriptor] {
    &NETWORKS
}

pub fn supported_tokens() -> &'static [TokenDescriptor] {
    &TOKENS
}

pub fn token(symbol: &str) -> Option<&'static TokenDescriptor> {
    TOKENS.iter().find(|t| t.symbol == symbol)
}

pub fn default_token() -> &'static TokenDescriptor {
    &TOKENS[DEFAULT_TOKEN_INDEX]
}

/// Human readable network name, or "Network <id>" for unknown chains
pub fn network_display_name(chain_id: &str) -> String {
    match lookup_hex(chain_id) {
        Some(network) => network.name.to_string(),
        None => format!("Network {}", chain_id),
    }
}

/// Explorer link for a transaction; unknown networks use the mainnet explorer
pub fn explorer_tx_url(chain_id: &str, transaction_id: &str) -> String {
    let network = lookup_hex(chain_id).unwrap_or(&NETWORKS[0]);
    let base = network
        .block_explorer_urls
        .first()
        .copied()
        .unwrap_or("https://etherscan.io");
    format!("{}/tx/{}", base.trim_end_matches('/'), transaction_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_supported() {
        for network in supported_networks() {
            let found = lookup(network.chain_id).unwrap();
            assert_eq!(found, network);
            assert_eq!(lookup_hex(&network.chain_id.to_string()), Some(network));
        }
        assert_eq!(lookup_hex("0xaa36a7").unwrap().name, "Sepolia");
    }

    #[test]
    fn test_lookup_unsupported_or_malformed() {
        assert!(lookup(ChainId(56)).is_none());
        assert!(lookup_hex("0x38").is_none());
        assert!(lookup_hex("ethereum").is_none());
        assert!(lookup_hex("").is_none());
    }

    #[test]
    fn test_fallback_is_coston2() {
        let fallback = fallback_network();
        assert_eq!(fallback.name, "Flare Testnet Coston2");
        assert_eq!(fallback.native_symbol, "C2FLR");
        assert_eq!(fallback.chain_id, ChainId(114));
    }

    #[test]
    fn test_token_catalogue() {
        assert_eq!(supported_tokens().len(), 4);
        assert_eq!(default_token().symbol, "XRP/USD");
        assert_eq!(token("BTC/USD").unwrap().display_name, "Bitcoin");
        assert!(token("DOGE/USD").is_none());
    }

    #[test]
    fn test_native_quotes_are_in_catalogue() {
        for network in supported_networks() {
            assert!(token(network.native_quote).is_some(), "{}", network.name);
        }
    }

    #[test]
    fn test_network_display_name() {
        assert_eq!(network_display_name("0x1"), "Ethereum");
        assert_eq!(network_display_name("0x38"), "Network 0x38");
    }

    #[test]
    fn test_explorer_tx_url() {
        assert_eq!(
            explorer_tx_url("0xaa36a7", "0xabc"),
            "https://sepolia.etherscan.io/tx/0xabc"
        );
        assert_eq!(explorer_tx_url("0x999", "0xabc"), "https://etherscan.io/tx/0xabc");
    }
}
