use alloy::primitives::Address;
use std::collections::BTreeMap;

use crate::chain::ChainClient;
use crate::error::ChainError;
use crate::tracker::types::Token;

/// The two on-chain list contracts a bridge registers its tokens in.
#[derive(Debug, Clone, Copy)]
pub struct TokenLists {
    pub standard: Address,
    pub proxy: Address,
    pub page_size: u8,
}

/// Bridgeable tokens of one bridge, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: BTreeMap<Address, Token>,
}

impl TokenRegistry {
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| (t.address, t)).collect(),
        }
    }

    /// Read both lists and every listed token's metadata.
    ///
    /// Any failing call aborts the whole resolution: a tracker must never run
    /// against a partial token set.
    pub async fn resolve(client: &dyn ChainClient, lists: &TokenLists) -> Result<Self, ChainError> {
        let mut addresses = list_items(client, lists.standard, lists.page_size).await?;
        addresses.extend(list_items(client, lists.proxy, lists.page_size).await?);

        let mut tokens = BTreeMap::new();
        for address in addresses {
            if address == Address::ZERO || tokens.contains_key(&address) {
                continue;
            }

            let symbol = client.token_symbol(address).await?;
            let decimals = client.token_decimals(address).await?;

            tracing::debug!(
                network = client.network(),
                %address,
                %symbol,
                decimals,
                "Registered token"
            );

            tokens.insert(
                address,
                Token {
                    address,
                    symbol,
                    decimals,
                },
            );
        }

        Ok(Self { tokens })
    }

    pub fn get(&self, address: &Address) -> Option<&Token> {
        self.tokens.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.tokens.values().map(|t| t.symbol.as_str()).collect()
    }
}

/// Page through a list contract's `getActiveItems` until it runs dry.
async fn list_items(
    client: &dyn ChainClient,
    list: Address,
    page_size: u8,
) -> Result<Vec<Address>, ChainError> {
    let mut items = Vec::new();
    let mut offset = 0u64;

    loop {
        let page = client.active_tokens(list, offset, page_size).await?;
        let fetched = page.items.len() as u64;
        items.extend(page.items);
        offset += fetched;

        if fetched < u64::from(page_size) || offset >= page.total {
            break;
        }
    }

    Ok(items)
}
