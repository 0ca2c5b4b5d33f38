use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::Address;

use crate::assets::{CallContext, NativeTransport, TokenLedger};
use crate::config::PoolConfig;
use crate::error::TransferError;
use crate::exchange::Exchange;
use crate::math::Amount;
use crate::native::NativeBank;
use crate::token::Token;
use crate::utils::constants::WEI_PER_UNIT;

#[allow(dead_code)]
pub fn address(n: u8) -> Address {
    Address::with_last_byte(n)
}

#[allow(dead_code)]
pub const fn ether(n: u128) -> Amount {
    n * WEI_PER_UNIT
}

#[allow(dead_code, clippy::unwrap_used)]
pub fn to_wei(value: &str) -> Amount {
    crate::utils::units::to_wei(value).unwrap()
}

/// Native transport that refuses everything
#[allow(dead_code)]
pub struct RejectingTransport;

impl NativeTransport for RejectingTransport {
    fn send(&self, _from: Address, _to: Address, _amount: Amount) -> Result<(), TransferError> {
        Err(TransferError::Rejected("transport offline".to_string()))
    }
}

/// Native bank that can be told to refuse payouts from one account
#[derive(Default)]
#[allow(dead_code)]
pub struct ToggleTransport {
    bank: NativeBank,
    refused: RwLock<Option<Address>>,
}

#[allow(dead_code)]
impl ToggleTransport {
    pub fn fund(&self, account: Address, amount: Amount) {
        self.bank.mint(account, amount);
    }

    pub fn refuse_payouts_from(&self, account: Address) {
        *self.refused.write().unwrap_or_else(PoisonError::into_inner) = Some(account);
    }
}

impl NativeTransport for ToggleTransport {
    fn send(&self, from: Address, to: Address, amount: Amount) -> Result<(), TransferError> {
        if *self.refused.read().unwrap_or_else(PoisonError::into_inner) == Some(from) {
            return Err(TransferError::Rejected("recipient refused payment".to_string()));
        }
        self.bank.send(from, to, amount)
    }
}

/// Token wrapper that can freeze one account's outgoing transfers, and can
/// make recipients spend whatever the pool pays them at once
#[allow(dead_code)]
pub struct GuardedToken {
    pub inner: Token,
    pool: Address,
    frozen: RwLock<Option<Address>>,
    sink: RwLock<Option<Address>>,
}

#[allow(dead_code)]
impl GuardedToken {
    pub fn new(inner: Token, pool: Address) -> Self {
        Self {
            inner,
            pool,
            frozen: RwLock::default(),
            sink: RwLock::default(),
        }
    }

    pub fn freeze(&self, account: Address) {
        *self.frozen.write().unwrap_or_else(PoisonError::into_inner) = Some(account);
    }

    /// Every payout from the pool is forwarded to `sink` as soon as it lands
    pub fn forward_payouts_to(&self, sink: Address) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn check(&self, sender: Address) -> Result<(), TransferError> {
        if *self.frozen.read().unwrap_or_else(PoisonError::into_inner) == Some(sender) {
            return Err(TransferError::Rejected("account frozen".to_string()));
        }
        Ok(())
    }
}

impl TokenLedger for GuardedToken {
    fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.check(owner)?;
        self.inner.transfer_from(spender, owner, recipient, amount)
    }

    fn transfer(
        &self,
        sender: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.check(sender)?;
        self.inner.transfer(sender, recipient, amount)?;
        let sink = *self.sink.read().unwrap_or_else(PoisonError::into_inner);
        match sink {
            Some(sink) if sender == self.pool => self.inner.transfer(recipient, sink, amount),
            _ => Ok(()),
        }
    }
}

/// An exchange wired to in-memory ledgers, with a deployer holding the whole
/// token supply and a user holding nothing
#[allow(dead_code)]
pub struct Fixture {
    pub exchange: Exchange<Token, NativeBank>,
    pub token: Arc<Token>,
    pub bank: Arc<NativeBank>,
    pub owner: Address,
    pub user: Address,
}

#[allow(dead_code, clippy::unwrap_used)]
impl Fixture {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let owner = address(1);
        let user = address(2);
        let token = Arc::new(Token::new("Token", "TKN", ether(1_000_000), owner));
        let bank = Arc::new(NativeBank::new());
        bank.mint(owner, ether(1_000));
        let exchange = Exchange::new(address(100), Arc::clone(&token), Arc::clone(&bank), config);
        Self {
            exchange,
            token,
            bank,
            owner,
            user,
        }
    }

    pub fn with_liquidity(native: Amount, token: Amount) -> Self {
        let fixture = Self::new();
        fixture.seed(native, token);
        fixture
    }

    /// Owner deposits `native` and `token` into the pool
    pub fn seed(&self, native: Amount, token: Amount) {
        self.approve(self.owner, token);
        self.exchange
            .add_liquidity(CallContext::with_value(self.owner, native), token)
            .unwrap();
    }

    /// `holder` lets the pool pull `amount` tokens
    pub fn approve(&self, holder: Address, amount: Amount) {
        self.token.approve(holder, self.exchange.address(), amount);
    }
}
