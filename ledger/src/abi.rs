//! Solidity ABI encoding for calldata and return data.
//!
//! Three tools, from strict to loose:
//!
//! - [`AbiEncoder`] produces standard head/tail encoding (static words in the
//!   head, dynamic values referenced by offset and laid out in the tail).
//! - [`AbiDecoder`] reads arguments back with bounds checks; every malformed
//!   input becomes [`Revert::InvalidCalldata`], never a panic.
//! - [`RawCalldata`] appends 32-byte words one at a time, for layouts the
//!   standard encoder would never produce.
//!
//! [`calldata_load`] mirrors the EVM `CALLDATALOAD` opcode: it reads 32 bytes
//! at an absolute offset and zero-pads past the end of the input.

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::revert::{CallResult, Revert};

/// Size of one ABI word.
pub const WORD: usize = 32;

/// A 4-byte function (or error) selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Wrap raw selector bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// `keccak256(signature)[..4]`.
    #[must_use]
    pub fn of(signature: &str) -> Self {
        let hash = keccak256(signature.as_bytes());
        Self([hash[0], hash[1], hash[2], hash[3]])
    }

    /// The first four bytes of `input`, if present.
    #[must_use]
    pub fn from_input(input: &[u8]) -> Option<Self> {
        let head: [u8; 4] = input.get(..4)?.try_into().ok()?;
        Some(Self(head))
    }

    /// The selector bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// The selector as a `bytes4` ABI word (left-aligned, zero-padded).
    #[must_use]
    pub fn to_word(self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        word[..4].copy_from_slice(&self.0);
        word
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Split calldata into selector and argument decoder.
///
/// Returns `None` for inputs shorter than four bytes (plain value transfers
/// and fallback calls).
#[must_use]
pub fn split_call(input: &[u8]) -> Option<(Selector, AbiDecoder<'_>)> {
    let selector = Selector::from_input(input)?;
    Some((selector, AbiDecoder::new(&input[4..])))
}

/// `CALLDATALOAD(offset)`: 32 bytes from `input`, zero-padded past the end.
#[must_use]
pub fn calldata_load(input: &[u8], offset: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    if offset < input.len() {
        let end = input.len().min(offset.saturating_add(WORD));
        word[..end - offset].copy_from_slice(&input[offset..end]);
    }
    word
}

/// A `uint256` as a big-endian word.
#[must_use]
pub fn uint_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes::<WORD>()
}

/// An `address` as a left-padded word.
#[must_use]
pub fn address_word(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// Right-pad `data` with zeros to a multiple of [`WORD`].
fn pad_right(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
    let rem = data.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + (WORD - rem), 0);
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Token {
    Static([u8; WORD]),
    Dynamic(Vec<u8>),
}

/// Standard head/tail ABI encoder.
///
/// ```text
/// AbiEncoder::call(TRANSFER).address(to).uint(amount).finish()
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbiEncoder {
    selector: Option<Selector>,
    tokens: Vec<Token>,
}

impl AbiEncoder {
    /// Encoder for bare arguments (return data).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder for a function call with the given selector.
    #[must_use]
    pub fn call(selector: Selector) -> Self {
        Self {
            selector: Some(selector),
            tokens: Vec::new(),
        }
    }

    #[must_use]
    pub fn address(mut self, value: Address) -> Self {
        self.tokens.push(Token::Static(address_word(value)));
        self
    }

    #[must_use]
    pub fn uint(mut self, value: U256) -> Self {
        self.tokens.push(Token::Static(uint_word(value)));
        self
    }

    #[must_use]
    pub fn boolean(mut self, value: bool) -> Self {
        self.tokens.push(Token::Static(uint_word(U256::from(u8::from(value)))));
        self
    }

    #[must_use]
    pub fn bytes32(mut self, value: B256) -> Self {
        self.tokens.push(Token::Static(value.0));
        self
    }

    /// A `bytes4` argument.
    #[must_use]
    pub fn selector(mut self, value: Selector) -> Self {
        self.tokens.push(Token::Static(value.to_word()));
        self
    }

    /// A dynamic `bytes` argument: length word, then data padded to a word.
    #[must_use]
    pub fn bytes(mut self, data: &[u8]) -> Self {
        let mut tail = Vec::with_capacity(WORD + data.len() + WORD);
        tail.extend_from_slice(&uint_word(U256::from(data.len())));
        pad_right(&mut tail, data);
        self.tokens.push(Token::Dynamic(tail));
        self
    }

    /// A dynamic `address[]` argument.
    #[must_use]
    pub fn address_array(mut self, values: &[Address]) -> Self {
        let mut tail = Vec::with_capacity(WORD * (values.len() + 1));
        tail.extend_from_slice(&uint_word(U256::from(values.len())));
        for value in values {
            tail.extend_from_slice(&address_word(*value));
        }
        self.tokens.push(Token::Dynamic(tail));
        self
    }

    /// A dynamic `uint256[]` argument.
    #[must_use]
    pub fn uint_array(mut self, values: &[U256]) -> Self {
        let mut tail = Vec::with_capacity(WORD * (values.len() + 1));
        tail.extend_from_slice(&uint_word(U256::from(values.len())));
        for value in values {
            tail.extend_from_slice(&uint_word(*value));
        }
        self.tokens.push(Token::Dynamic(tail));
        self
    }

    /// A dynamic `bytes32[]` argument.
    #[must_use]
    pub fn bytes32_array(mut self, values: &[B256]) -> Self {
        let mut tail = Vec::with_capacity(WORD * (values.len() + 1));
        tail.extend_from_slice(&uint_word(U256::from(values.len())));
        for value in values {
            tail.extend_from_slice(value.as_slice());
        }
        self.tokens.push(Token::Dynamic(tail));
        self
    }

    /// Produce the encoded bytes (selector first, if any).
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        let head_len = WORD * self.tokens.len();
        let mut head = Vec::with_capacity(4 + head_len);
        let mut tail = Vec::new();
        if let Some(selector) = self.selector {
            head.extend_from_slice(&selector.0);
        }
        for token in self.tokens {
            match token {
                Token::Static(word) => head.extend_from_slice(&word),
                Token::Dynamic(bytes) => {
                    head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                    tail.extend_from_slice(&bytes);
                }
            }
        }
        head.extend_from_slice(&tail);
        head
    }
}

/// Encode a single `uint256` return value.
#[must_use]
pub fn encode_uint(value: U256) -> Vec<u8> {
    uint_word(value).to_vec()
}

/// Encode a single `bool` return value.
#[must_use]
pub fn encode_bool(value: bool) -> Vec<u8> {
    AbiEncoder::new().boolean(value).finish()
}

/// Encode a single `address` return value.
#[must_use]
pub fn encode_address(value: Address) -> Vec<u8> {
    address_word(value).to_vec()
}

/// Encode a single `bytes32` return value.
#[must_use]
pub fn encode_bytes32(value: B256) -> Vec<u8> {
    value.0.to_vec()
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Bounds-checked ABI decoder over an argument area (calldata after the
/// selector, or return data).
#[derive(Debug, Clone, Copy)]
pub struct AbiDecoder<'a> {
    data: &'a [u8],
}

impl<'a> AbiDecoder<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// The raw argument area.
    #[must_use]
    pub fn raw(&self) -> &'a [u8] {
        self.data
    }

    fn word_at(&self, offset: usize) -> CallResult<&'a [u8]> {
        let end = offset
            .checked_add(WORD)
            .ok_or_else(|| Revert::invalid_calldata("word offset overflow"))?;
        self.data.get(offset..end).ok_or_else(|| {
            Revert::invalid_calldata(format!(
                "word at {offset} past end of {} bytes",
                self.data.len()
            ))
        })
    }

    /// Head word `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] if the word is out of bounds.
    pub fn word(&self, index: usize) -> CallResult<&'a [u8]> {
        let offset = index
            .checked_mul(WORD)
            .ok_or_else(|| Revert::invalid_calldata("word index overflow"))?;
        self.word_at(offset)
    }

    /// `uint256` at head `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] if the word is out of bounds.
    pub fn uint(&self, index: usize) -> CallResult<U256> {
        Ok(U256::from_be_slice(self.word(index)?))
    }

    /// `address` at head `index`; the upper 12 bytes must be clean.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] if out of bounds or dirty.
    pub fn address(&self, index: usize) -> CallResult<Address> {
        let word = self.word(index)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(Revert::invalid_calldata(format!(
                "dirty address bits in argument {index}"
            )));
        }
        Ok(Address::from_slice(&word[12..]))
    }

    /// `bool` at head `index`; must be exactly 0 or 1.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] if out of bounds or not a bool.
    pub fn boolean(&self, index: usize) -> CallResult<bool> {
        let value = self.uint(index)?;
        if value > U256::from(1u8) {
            return Err(Revert::invalid_calldata(format!(
                "argument {index} is not a bool"
            )));
        }
        Ok(value == U256::from(1u8))
    }

    /// `bytes32` at head `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] if out of bounds.
    pub fn bytes32(&self, index: usize) -> CallResult<B256> {
        Ok(B256::from_slice(self.word(index)?))
    }

    /// `bytes4` at head `index`; the low 28 bytes must be clean.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] if out of bounds or dirty.
    pub fn selector(&self, index: usize) -> CallResult<Selector> {
        let word = self.word(index)?;
        if word[4..].iter().any(|b| *b != 0) {
            return Err(Revert::invalid_calldata(format!(
                "dirty bytes4 bits in argument {index}"
            )));
        }
        Ok(Selector([word[0], word[1], word[2], word[3]]))
    }

    fn usize_at(&self, offset: usize) -> CallResult<usize> {
        let value = U256::from_be_slice(self.word_at(offset)?);
        usize::try_from(value)
            .map_err(|_| Revert::invalid_calldata(format!("length or offset {value} too large")))
    }

    /// Resolve dynamic argument `index`: returns (element count, start of data).
    fn dynamic(&self, index: usize) -> CallResult<(usize, usize)> {
        let offset = usize::try_from(self.uint(index)?)
            .map_err(|_| Revert::invalid_calldata("dynamic offset too large"))?;
        let len = self.usize_at(offset)?;
        Ok((len, offset + WORD))
    }

    /// Dynamic `bytes` at head `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] if the offset, length or data
    /// falls outside the argument area.
    pub fn bytes(&self, index: usize) -> CallResult<&'a [u8]> {
        let (len, start) = self.dynamic(index)?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| Revert::invalid_calldata("bytes length overflow"))?;
        self.data.get(start..end).ok_or_else(|| {
            Revert::invalid_calldata(format!(
                "bytes argument {index} ({len} bytes at {start}) past end"
            ))
        })
    }

    /// Dynamic `address[]` at head `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] on bounds or dirty-bit failures.
    pub fn address_array(&self, index: usize) -> CallResult<Vec<Address>> {
        let (len, start) = self.dynamic(index)?;
        let inner = AbiDecoder::new(self.data.get(start..).unwrap_or_default());
        (0..len).map(|i| inner.address(i)).collect()
    }

    /// Dynamic `uint256[]` at head `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] on bounds failures.
    pub fn uint_array(&self, index: usize) -> CallResult<Vec<U256>> {
        let (len, start) = self.dynamic(index)?;
        let inner = AbiDecoder::new(self.data.get(start..).unwrap_or_default());
        (0..len).map(|i| inner.uint(i)).collect()
    }

    /// Dynamic `bytes32[]` at head `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InvalidCalldata`] on bounds failures.
    pub fn bytes32_array(&self, index: usize) -> CallResult<Vec<B256>> {
        let (len, start) = self.dynamic(index)?;
        let inner = AbiDecoder::new(self.data.get(start..).unwrap_or_default());
        (0..len).map(|i| inner.bytes32(i)).collect()
    }
}

/// Decode a single `uint256` return value.
///
/// # Errors
///
/// Returns [`Revert::InvalidCalldata`] if `data` is shorter than a word.
pub fn decode_uint(data: &[u8]) -> CallResult<U256> {
    AbiDecoder::new(data).uint(0)
}

/// Decode a single `bool` return value.
///
/// # Errors
///
/// Returns [`Revert::InvalidCalldata`] if `data` is not a bool word.
pub fn decode_bool(data: &[u8]) -> CallResult<bool> {
    AbiDecoder::new(data).boolean(0)
}

/// Decode a single `address` return value.
///
/// # Errors
///
/// Returns [`Revert::InvalidCalldata`] if `data` is not an address word.
pub fn decode_address(data: &[u8]) -> CallResult<Address> {
    AbiDecoder::new(data).address(0)
}

/// Decode a single `bytes32` return value.
///
/// # Errors
///
/// Returns [`Revert::InvalidCalldata`] if `data` is shorter than a word.
pub fn decode_bytes32(data: &[u8]) -> CallResult<B256> {
    AbiDecoder::new(data).bytes32(0)
}

// ---------------------------------------------------------------------------
// Raw word builder
// ---------------------------------------------------------------------------

/// Word-by-word calldata builder.
///
/// Every method appends whole, explicitly typed fields; offsets and lengths
/// are written as values the caller computes, not inferred.
#[derive(Debug, Clone)]
pub struct RawCalldata {
    bytes: Vec<u8>,
}

impl RawCalldata {
    /// Start with a 4-byte selector.
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            bytes: selector.0.to_vec(),
        }
    }

    /// Append a left-padded address word.
    #[must_use]
    pub fn address_word(mut self, value: Address) -> Self {
        self.bytes.extend_from_slice(&address_word(value));
        self
    }

    /// Append a `uint256` word (offsets and lengths included).
    #[must_use]
    pub fn uint_word(mut self, value: U256) -> Self {
        self.bytes.extend_from_slice(&uint_word(value));
        self
    }

    /// Append a selector left-aligned in its own word.
    #[must_use]
    pub fn selector_word(mut self, value: Selector) -> Self {
        self.bytes.extend_from_slice(&value.to_word());
        self
    }

    /// Append `data` right-padded to a whole number of words.
    #[must_use]
    pub fn padded_bytes(mut self, data: &[u8]) -> Self {
        pad_right(&mut self.bytes, data);
        self
    }

    /// Bytes written so far, selector included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
