//! Pair registry. Deploys one [`UniswapV2Pair`] per unordered token pair.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, B256, U256};
use gauntlet_ledger::abi::{encode_address, encode_uint, split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::revert::{require, CallResult, Revert};
use gauntlet_ledger::state::{address_key, mapping_slot, slot};
use gauntlet_ledger::vm::Ledger;
use tracing::debug;

use super::pair::{self, UniswapV2Pair};

/// `createPair(address,address)`
pub const CREATE_PAIR: Selector = Selector::new([0xc9, 0xc6, 0x53, 0x96]);
/// `getPair(address,address)`
pub const GET_PAIR: Selector = Selector::new([0xe6, 0xa4, 0x39, 0x05]);
/// `allPairs(uint256)`
pub const ALL_PAIRS: Selector = Selector::new([0x1e, 0x3d, 0xd1, 0x8b]);
/// `allPairsLength()`
pub const ALL_PAIRS_LENGTH: Selector = Selector::new([0x57, 0x4f, 0x2b, 0xa3]);

const GET_PAIR_SLOT: u64 = 2;
const ALL_PAIRS_SLOT: u64 = 3;

fn pair_slot(token_a: Address, token_b: Address) -> B256 {
    let inner = mapping_slot(address_key(token_a), slot(GET_PAIR_SLOT));
    mapping_slot(address_key(token_b), inner)
}

/// Element `index` of the `allPairs` dynamic array.
fn all_pairs_element(index: U256) -> B256 {
    let base = U256::from_be_bytes(keccak256(slot(ALL_PAIRS_SLOT)).0);
    B256::from(base.wrapping_add(index).to_be_bytes::<32>())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UniswapV2Factory;

impl UniswapV2Factory {
    fn create_pair(vm: &mut Ledger, this: Address, token_a: Address, token_b: Address) -> CallResult<Address> {
        require(token_a != token_b, "UniswapV2: IDENTICAL_ADDRESSES")?;
        let (token0, token1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        require(token0 != Address::ZERO, "UniswapV2: ZERO_ADDRESS")?;
        require(
            vm.sload_address(this, pair_slot(token0, token1)) == Address::ZERO,
            "UniswapV2: PAIR_EXISTS",
        )?;

        let pair = vm.create(this, Arc::new(UniswapV2Pair), U256::ZERO)?;
        vm.call(this, pair, U256::ZERO, &pair::calls::initialize(token0, token1))?;
        vm.sstore_address(this, pair_slot(token0, token1), pair);
        vm.sstore_address(this, pair_slot(token1, token0), pair);

        let length = vm.sload(this, slot(ALL_PAIRS_SLOT));
        vm.sstore_address(this, all_pairs_element(length), pair);
        vm.sstore(this, slot(ALL_PAIRS_SLOT), length.saturating_add(U256::from(1u8)));
        debug!(%token0, %token1, %pair, "pair created");
        Ok(pair)
    }
}

impl Contract for UniswapV2Factory {
    fn name(&self) -> &'static str {
        "UniswapV2Factory"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        frame.non_payable(self.name())?;
        let this = frame.address;
        match selector {
            CREATE_PAIR => {
                let pair = Self::create_pair(vm, this, args.address(0)?, args.address(1)?)?;
                Ok(encode_address(pair))
            }
            GET_PAIR => {
                let key = pair_slot(args.address(0)?, args.address(1)?);
                Ok(encode_address(vm.sload_address(this, key)))
            }
            ALL_PAIRS => {
                let index = args.uint(0)?;
                require(index < vm.sload(this, slot(ALL_PAIRS_SLOT)), "index out of bounds")?;
                Ok(encode_address(vm.sload_address(this, all_pairs_element(index))))
            }
            ALL_PAIRS_LENGTH => Ok(encode_uint(vm.sload(this, slot(ALL_PAIRS_SLOT)))),
            _ => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
        }
    }
}

pub mod calls {
    use alloy_primitives::{Address, U256};
    use gauntlet_ledger::abi::AbiEncoder;

    #[must_use]
    pub fn create_pair(token_a: Address, token_b: Address) -> Vec<u8> {
        AbiEncoder::call(super::CREATE_PAIR)
            .address(token_a)
            .address(token_b)
            .finish()
    }

    #[must_use]
    pub fn get_pair(token_a: Address, token_b: Address) -> Vec<u8> {
        AbiEncoder::call(super::GET_PAIR)
            .address(token_a)
            .address(token_b)
            .finish()
    }

    #[must_use]
    pub fn all_pairs(index: U256) -> Vec<u8> {
        AbiEncoder::call(super::ALL_PAIRS).uint(index).finish()
    }

    #[must_use]
    pub fn all_pairs_length() -> Vec<u8> {
        AbiEncoder::call(super::ALL_PAIRS_LENGTH).finish()
    }
}
