//! Pair lookup and pricing helpers shared by the router and the v2 lending
//! pool.

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{decode_address, AbiDecoder};
use gauntlet_ledger::math;
use gauntlet_ledger::revert::{require, CallResult};
use gauntlet_ledger::vm::Ledger;

use super::{factory, pair};

/// Order two token addresses the way pairs store them.
///
/// # Errors
///
/// Reverts on identical or zero addresses.
pub fn sort_tokens(token_a: Address, token_b: Address) -> CallResult<(Address, Address)> {
    require(token_a != token_b, "UniswapV2Library: IDENTICAL_ADDRESSES")?;
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    require(token0 != Address::ZERO, "UniswapV2Library: ZERO_ADDRESS")?;
    Ok((token0, token1))
}

/// The registered pair for two tokens (zero if none).
///
/// # Errors
///
/// Returns the factory's revert or a decoding failure.
pub fn pair_for(vm: &Ledger, factory: Address, token_a: Address, token_b: Address) -> CallResult<Address> {
    decode_address(&vm.view(factory, &factory::calls::get_pair(token_a, token_b))?)
}

/// Reserves of the `token_a`/`token_b` pair, in argument order.
///
/// # Errors
///
/// Reverts if the tokens are invalid or the pair does not exist.
pub fn get_reserves(
    vm: &Ledger,
    factory: Address,
    token_a: Address,
    token_b: Address,
) -> CallResult<(U256, U256)> {
    let (token0, _) = sort_tokens(token_a, token_b)?;
    let pair = pair_for(vm, factory, token_a, token_b)?;
    let out = vm.view(pair, &pair::GET_RESERVES.as_bytes())?;
    let reserves = AbiDecoder::new(&out);
    let (reserve0, reserve1) = (reserves.uint(0)?, reserves.uint(1)?);
    Ok(if token_a == token0 {
        (reserve0, reserve1)
    } else {
        (reserve1, reserve0)
    })
}

/// Equivalent amount of the other asset at the current reserve ratio.
///
/// # Errors
///
/// Reverts on a zero amount or empty reserves.
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> CallResult<U256> {
    require(!amount_a.is_zero(), "UniswapV2Library: INSUFFICIENT_AMOUNT")?;
    require(
        !reserve_a.is_zero() && !reserve_b.is_zero(),
        "UniswapV2Library: INSUFFICIENT_LIQUIDITY",
    )?;
    math::div(math::mul(amount_a, reserve_b)?, reserve_a)
}

/// Maximum output for `amount_in`, after the 0.3 % fee.
///
/// # Errors
///
/// Reverts on a zero input or empty reserves.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> CallResult<U256> {
    require(!amount_in.is_zero(), "UniswapV2Library: INSUFFICIENT_INPUT_AMOUNT")?;
    require(
        !reserve_in.is_zero() && !reserve_out.is_zero(),
        "UniswapV2Library: INSUFFICIENT_LIQUIDITY",
    )?;
    let amount_in_with_fee = math::mul(amount_in, U256::from(997u16))?;
    let numerator = math::mul(amount_in_with_fee, reserve_out)?;
    let denominator = math::add(math::mul(reserve_in, U256::from(1000u16))?, amount_in_with_fee)?;
    math::div(numerator, denominator)
}

/// Chained [`get_amount_out`] along `path`.
///
/// # Errors
///
/// Reverts on a path shorter than two tokens or any failing hop.
pub fn get_amounts_out(
    vm: &Ledger,
    factory: Address,
    amount_in: U256,
    path: &[Address],
) -> CallResult<Vec<U256>> {
    require(path.len() >= 2, "UniswapV2Library: INVALID_PATH")?;
    let mut amounts = Vec::with_capacity(path.len());
    amounts.push(amount_in);
    for hop in path.windows(2) {
        let (reserve_in, reserve_out) = get_reserves(vm, factory, hop[0], hop[1])?;
        let last = amounts[amounts.len() - 1];
        amounts.push(get_amount_out(last, reserve_in, reserve_out)?);
    }
    Ok(amounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_ledger::address;
    use gauntlet_ledger::revert::Revert;

    const A: Address = address!("000000000000000000000000000000000000000a");
    const B: Address = address!("000000000000000000000000000000000000000b");

    #[test]
    fn sort_orders_and_rejects_bad_pairs() {
        assert_eq!(sort_tokens(B, A).unwrap(), (A, B));
        assert_eq!(
            sort_tokens(A, A).unwrap_err(),
            Revert::message("UniswapV2Library: IDENTICAL_ADDRESSES")
        );
        assert_eq!(
            sort_tokens(Address::ZERO, A).unwrap_err(),
            Revert::message("UniswapV2Library: ZERO_ADDRESS")
        );
    }

    #[test]
    fn quote_is_proportional() {
        let q = quote(U256::from(10u8), U256::from(100u8), U256::from(300u16)).unwrap();
        assert_eq!(q, U256::from(30u8));
        assert!(quote(U256::ZERO, U256::from(1u8), U256::from(1u8)).is_err());
    }

    #[test]
    fn amount_out_charges_fee() {
        // 1000 in against 1000/1000: 997_000 * 1000 / (1_000_000 + 997_000)
        let out = get_amount_out(U256::from(1000u16), U256::from(1000u16), U256::from(1000u16)).unwrap();
        assert_eq!(out, U256::from(499u16));
        assert_eq!(
            get_amount_out(U256::from(1u8), U256::ZERO, U256::from(1u8)).unwrap_err(),
            Revert::message("UniswapV2Library: INSUFFICIENT_LIQUIDITY")
        );
    }
}
